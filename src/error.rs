// src/error.rs
// =============================================================================
// Error types shared by the whole pipeline.
//
// Every failure a user can see maps to one ViewerError variant:
// - Network: the gist metadata or raw content could not be fetched
// - MissingFile: the requested file is not part of the gist
// - ExtractionFault: pulling ```diff blocks out of markdown failed
// - RenderFault: painting the content failed
//
// None of these are retried. The orchestrator surfaces them as notices on
// the page and hands them back to main, which decides the exit code.
//
// Rust concepts:
// - thiserror: derives std::error::Error and Display from attributes
// - #[from]: lets `?` convert a lower-level error automatically
// =============================================================================

use thiserror::Error;

use crate::content::ExtractError;
use crate::render::RenderError;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// Metadata or raw content fetch failed (non-200 or transport error)
    #[error("{0}")]
    Network(String),

    /// The selected file name is not in the gist's file mapping
    #[error("File {0} does not exist")]
    MissingFile(String),

    /// Background or inline extraction failed
    #[error("Markdown worker error: {0}")]
    ExtractionFault(String),

    /// The diff painter or highlighter failed
    #[error("Render error: {0}")]
    RenderFault(String),

    /// A unit was handed to the pipeline before its full body was fetched
    #[error("Content of {0} was truncated; fetch the raw file first")]
    Truncated(String),
}

impl From<ExtractError> for ViewerError {
    fn from(err: ExtractError) -> Self {
        ViewerError::ExtractionFault(err.reason)
    }
}

impl From<RenderError> for ViewerError {
    fn from(err: RenderError) -> Self {
        ViewerError::RenderFault(err.to_string())
    }
}

impl From<reqwest::Error> for ViewerError {
    fn from(err: reqwest::Error) -> Self {
        ViewerError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_the_error_area_wording() {
        let missing = ViewerError::MissingFile("notes.md".to_string());
        assert_eq!(missing.to_string(), "File notes.md does not exist");

        let fault: ViewerError = ExtractError::new("pattern blew up").into();
        assert_eq!(fault.to_string(), "Markdown worker error: pattern blew up");
    }
}
