// src/gist/address.rs
// =============================================================================
// Parses the "which gist, which file" part of a request.
//
// Accepted forms:
//   <gistId>                          -> default file
//   ?<gistId>/<fileName>              -> named file (percent-decoded)
//   https://gist.github.com/<user>/<gistId>
//   gist.github.com/<gistId>
//
// Anything after the file name (a second '/') is ignored, like the
// query-string form of the web viewer.
// =============================================================================

use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use url::Url;

const GIST_HOST: &str = "gist.github.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GistAddress {
    pub gist_id: String,
    /// None (or an empty name) means "pick the default file"
    pub file_name: Option<String>,
}

impl FromStr for GistAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_address(s)
    }
}

// Parses a gist address
//
// Parameters:
//   input: one of the forms listed at the top of this file
//
// Returns: the gist id and the optional file name
//
// Example:
//   "?aa5a315d61ae9438b18d/my%20notes.md" -> ("aa5a315d61ae9438b18d", Some("my notes.md"))
pub fn parse_address(input: &str) -> Result<GistAddress> {
    let input = input.trim();

    let without_scheme = input
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    if without_scheme.starts_with(GIST_HOST) {
        return parse_gist_url(&format!("https://{}", without_scheme));
    }

    let query = input.strip_prefix('?').unwrap_or(input);
    let mut parts = query.split('/');
    let gist_id = parts.next().unwrap_or_default();
    validate_id(gist_id, input)?;

    let file_name = parts
        .next()
        .filter(|name| !name.is_empty())
        .map(decode_component);

    Ok(GistAddress {
        gist_id: gist_id.to_string(),
        file_name,
    })
}

fn parse_gist_url(url: &str) -> Result<GistAddress> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid gist URL: {}", url))?;

    // https://gist.github.com/<user>/<id> or https://gist.github.com/<id>
    let gist_id = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|id| id.trim_end_matches(".git"))
        .ok_or_else(|| anyhow!("Gist URL has no gist id: {}", url))?;
    validate_id(gist_id, url)?;

    Ok(GistAddress {
        gist_id: gist_id.to_string(),
        file_name: None,
    })
}

fn validate_id(id: &str, input: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(anyhow!("Not a gist address: {}", input));
    }
    Ok(())
}

// Percent-decodes one path component
//
// '+' stays a plus sign, and '&' / '=' are not treated as separators.
fn decode_component(raw: &str) -> String {
    let escaped = raw
        .replace('+', "%2B")
        .replace('&', "%26")
        .replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}
