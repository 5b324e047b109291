// src/gist/fetch.rs
// =============================================================================
// Talks to the GitHub gist API.
//
// Two requests matter:
// 1. GET {api_base}/gists/{id}: metadata plus the (maybe truncated) content
//    of every file
// 2. GET {raw_url}: the full content of one truncated file
//
// One reqwest Client is built per session and reused for both, so the
// connection pool and default headers are shared.
//
// Rust concepts:
// - serde::Deserialize: map the JSON body straight onto our structs
// - serde_json::Map with preserve_order: keeps the files in the order
//   GitHub returned them, which decides the default file
// =============================================================================

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::content::ContentUnit;
use crate::error::ViewerError;

const DEFAULT_FILE: &str = "index.html";
const GITHUB_JSON: &str = "application/vnd.github+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
pub struct GistFile {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub content: Option<String>,
    pub raw_url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Gist {
    pub id: String,
    pub html_url: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// In the order the API listed them
    pub files: Vec<GistFile>,
}

// Wire shape of the metadata response
#[derive(Debug, Deserialize)]
struct GistBody {
    id: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
    #[serde(default)]
    files: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

impl Gist {
    fn from_body(body: GistBody) -> Result<Self, serde_json::Error> {
        let files = body
            .files
            .into_iter()
            .map(|(name, value)| {
                let mut file: GistFile = serde_json::from_value(value)?;
                file.filename = name;
                Ok(file)
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()?;

        Ok(Self {
            id: body.id,
            html_url: body.html_url,
            description: body.description,
            created_at: body.created_at,
            updated_at: body.updated_at,
            files,
        })
    }

    pub fn file(&self, name: &str) -> Option<&GistFile> {
        self.files.iter().find(|file| file.filename == name)
    }

    // Picks the file to render
    //
    // Parameters:
    //   requested: a file name, or None / "" for the default
    //
    // Returns:
    //   The requested file, or for the default: index.html when the gist has
    //   one, else the first file. MissingFile when nothing matches.
    pub fn select_file(&self, requested: Option<&str>) -> Result<&GistFile, ViewerError> {
        match requested.filter(|name| !name.is_empty()) {
            Some(name) => self
                .file(name)
                .ok_or_else(|| ViewerError::MissingFile(name.to_string())),
            None => self
                .file(DEFAULT_FILE)
                .or_else(|| self.files.first())
                .ok_or_else(|| ViewerError::MissingFile(String::new())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GistClient {
    client: Client,
    api_base: Url,
}

impl GistClient {
    // Builds the HTTP client
    //
    // Parameters:
    //   api_base: API root, e.g. "https://api.github.com"
    //   token: optional GitHub token, sent as a bearer token
    pub fn new(api_base: &str, token: Option<&str>) -> Result<Self> {
        let mut base = api_base.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base =
            Url::parse(&base).with_context(|| format!("Invalid api_base: {}", api_base))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .context("GitHub token contains invalid characters")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client, api_base })
    }

    // Fetches gist metadata
    //
    // Errors read "Gist <id>, <reason>", where the reason is GitHub's message
    // with any parenthesized part removed, or the status code.
    pub async fn fetch_gist(&self, gist_id: &str) -> Result<Gist, ViewerError> {
        let url = self
            .api_base
            .join(&format!("gists/{}", gist_id))
            .map_err(|e| ViewerError::Network(format!("Gist {}, {}", gist_id, e)))?;
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ViewerError::Network(format!("Gist {}, {}", gist_id, e)))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ViewerError::Network(format!("Gist {}, {}", gist_id, e)))?;

        if status != StatusCode::OK {
            return Err(ViewerError::Network(format!(
                "Gist {}, {}",
                gist_id,
                failure_reason(status, &bytes)
            )));
        }

        let body: GistBody = serde_json::from_slice(&bytes)
            .map_err(|e| ViewerError::Network(format!("Gist {}, {}", gist_id, e)))?;
        Gist::from_body(body).map_err(|e| ViewerError::Network(format!("Gist {}, {}", gist_id, e)))
    }

    // Fetches the full content of a truncated file
    pub async fn fetch_raw(&self, gist_id: &str, file: &GistFile) -> Result<String, ViewerError> {
        let pull_failed = |reason: String| {
            ViewerError::Network(format!(
                "Failed to pull full content {} {}, {}",
                file.filename, gist_id, reason
            ))
        };

        log::debug!("GET {}", file.raw_url);
        let response = self
            .client
            .get(&file.raw_url)
            .send()
            .await
            .map_err(|e| pull_failed(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(pull_failed(status.as_u16().to_string()));
        }
        response.text().await.map_err(|e| pull_failed(e.to_string()))
    }

    // Builds a ready-to-render unit, fetching the raw body when the API
    // truncated the file
    pub async fn load_unit(&self, gist_id: &str, file: &GistFile) -> Result<ContentUnit, ViewerError> {
        let inline = file.content.clone().unwrap_or_default();
        if !file.truncated {
            return Ok(ContentUnit::new(inline, file.filename.clone()));
        }

        log::info!("{} is truncated, fetching raw content", file.filename);
        let unit = ContentUnit::truncated(inline, file.filename.clone());
        let full = self.fetch_raw(gist_id, file).await?;
        Ok(unit.with_full_body(full))
    }
}

fn parenthetical() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(.*\)").expect("parenthetical regex should compile"))
}

// GitHub's error message without its "(docs link)" part, or the status code
fn failure_reason(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ApiMessage>(body)
        .ok()
        .and_then(|api| api.message)
        .filter(|message| !message.is_empty())
        .map(|message| strip_parenthetical(&message))
        .unwrap_or_else(|| status.as_u16().to_string())
}

fn strip_parenthetical(message: &str) -> String {
    parenthetical().replace(message, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GIST_JSON: &str = r##"{
        "id": "aa5a315d61ae9438b18d",
        "html_url": "https://gist.github.com/aa5a315d61ae9438b18d",
        "description": "demo",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-02T00:00:00Z",
        "files": {
            "zeta.diff": {"filename": "zeta.diff", "raw_url": "https://example/raw/zeta", "size": 10, "truncated": false, "content": "@@ -1 +1 @@\n-a\n+b"},
            "alpha.md": {"filename": "alpha.md", "raw_url": "https://example/raw/alpha", "size": 2048, "truncated": true, "content": "# partial"}
        }
    }"##;

    fn gist() -> Gist {
        let body: GistBody = serde_json::from_str(GIST_JSON).unwrap();
        Gist::from_body(body).unwrap()
    }

    #[test]
    fn test_files_keep_api_order() {
        let names: Vec<_> = gist().files.iter().map(|f| f.filename.clone()).collect();
        assert_eq!(names, vec!["zeta.diff", "alpha.md"]);
    }

    #[test]
    fn test_default_file_is_first_without_index() {
        let gist = gist();
        assert_eq!(gist.select_file(None).unwrap().filename, "zeta.diff");
        assert_eq!(gist.select_file(Some("")).unwrap().filename, "zeta.diff");
        assert_eq!(gist.select_file(Some("alpha.md")).unwrap().filename, "alpha.md");
    }

    #[test]
    fn test_default_file_prefers_index_html() {
        let mut gist = gist();
        gist.files.push(GistFile {
            filename: "index.html".to_string(),
            content: Some("<p>hi</p>".to_string()),
            raw_url: "https://example/raw/index".to_string(),
            size: 9,
            truncated: false,
            language: Some("HTML".to_string()),
        });
        assert_eq!(gist.select_file(None).unwrap().filename, "index.html");
    }

    #[test]
    fn test_missing_file() {
        let err = gist().select_file(Some("nope.md")).unwrap_err();
        assert!(matches!(err, ViewerError::MissingFile(ref name) if name == "nope.md"));
        assert_eq!(err.to_string(), "File nope.md does not exist");
    }

    #[test]
    fn test_failure_reason() {
        let body = br#"{"message": "Not Found (see https://docs.github.com/rest)"}"#;
        assert_eq!(failure_reason(StatusCode::NOT_FOUND, body), "Not Found ");
        assert_eq!(failure_reason(StatusCode::BAD_GATEWAY, b"<html>"), "502");
    }

    #[tokio::test]
    async fn test_untruncated_file_needs_no_request() {
        let client = GistClient::new("http://127.0.0.1:9", None).unwrap();
        let gist = gist();
        let unit = client.load_unit(&gist.id, &gist.files[0]).await.unwrap();
        assert!(!unit.is_truncated_on_arrival());
        assert_eq!(unit.body(), "@@ -1 +1 @@\n-a\n+b");
    }

    #[test]
    fn test_bad_api_base() {
        assert!(GistClient::new("not a url", None).is_err());
    }
}
