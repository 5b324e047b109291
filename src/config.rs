// src/config.rs
// =============================================================================
// User configuration, read from a TOML file.
//
// Lookup order:
// 1. --config <PATH> (must exist)
// 2. <config dir>/gist-render/config.toml (optional)
// 3. built-in defaults
//
// Every key is optional; missing keys take their default. A GITHUB_TOKEN
// environment variable overrides `github_token` from the file.
//
// Rust concepts:
// - #[serde(default = "...")]: per-field fallback when a key is absent
// - anyhow::Context: attach "what were we doing" to low-level errors
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::content::SizeThresholds;

const APP_NAME: &str = "gist-render";
const CONFIG_FILE: &str = "config.toml";
const TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// GitHub API root used for gist metadata
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Byte and line limits above which a patch counts as large
    #[serde(flatten)]
    pub thresholds: SizeThresholds,

    /// Run markdown extraction on the background worker thread
    #[serde(default = "default_background_worker")]
    pub background_worker: bool,

    /// Seconds to wait for a background extraction; 0 waits forever
    #[serde(default = "default_extract_timeout_secs")]
    pub extract_timeout_secs: u64,

    /// syntect theme used for highlighted diff lines
    #[serde(default = "default_highlight_theme")]
    pub highlight_theme: String,

    /// Default output path; "-" is stdout
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default, skip_serializing)]
    pub github_token: Option<String>,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_background_worker() -> bool {
    true
}

fn default_extract_timeout_secs() -> u64 {
    30
}

fn default_highlight_theme() -> String {
    "InspiredGitHub".to_string()
}

fn default_output() -> String {
    "gist.html".to_string()
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            thresholds: SizeThresholds::default(),
            background_worker: default_background_worker(),
            extract_timeout_secs: default_extract_timeout_secs(),
            highlight_theme: default_highlight_theme(),
            output: default_output(),
            github_token: None,
        }
    }
}

impl ViewerConfig {
    // Loads the configuration
    //
    // Parameters:
    //   explicit: path given with --config; an error if it cannot be read
    //
    // Returns:
    //   The parsed config with the token override applied
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_path().filter(|path| path.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    log::debug!("no config file found, using defaults");
                    Self::default()
                }
            },
        };

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                config.github_token = Some(token);
            }
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    // None means wait forever
    pub fn extract_timeout(&self) -> Option<Duration> {
        (self.extract_timeout_secs > 0).then(|| Duration::from_secs(self.extract_timeout_secs))
    }
}

// <config dir>/gist-render/config.toml, when the platform has a config dir
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ViewerConfig::default();
        assert_eq!(config.api_base, "https://api.github.com");
        assert_eq!(config.thresholds.large_bytes, 500_000);
        assert_eq!(config.thresholds.large_lines, 8_000);
        assert!(config.background_worker);
        assert_eq!(config.extract_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.highlight_theme, "InspiredGitHub");
        assert!(config.github_token.is_none());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config = ViewerConfig::parse(
            r#"
            large_lines = 100
            background_worker = false
            extract_timeout_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.thresholds.large_lines, 100);
        assert_eq!(config.thresholds.large_bytes, 500_000);
        assert!(!config.background_worker);
        assert_eq!(config.extract_timeout(), None);
        assert_eq!(config.output, "gist.html");
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_base = \"http://localhost:8080\"").unwrap();
        writeln!(file, "highlight_theme = \"base16-ocean.light\"").unwrap();

        let config = ViewerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api_base, "http://localhost:8080");
        assert_eq!(config.highlight_theme, "base16-ocean.light");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ViewerConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(ViewerConfig::parse("large_bytes = \"lots\"").is_err());
    }
}
