// src/content/extract.rs
// =============================================================================
// Pulls ```diff and ~~~diff fenced blocks out of markdown.
//
// How it works:
// 1. Scan the whole text for backtick blocks tagged "diff"
// 2. Scan the whole text again for tilde blocks tagged "diff"
// 3. Join the inner text of every block with a blank line
//
// The two scans are NOT merged by position: all backtick blocks come first,
// then all tilde blocks, each in document order. Output stability depends on
// this order.
//
// Finding nothing is a success (an empty diff). The only failure is an
// internal fault, e.g. a pattern that refuses to compile.
// =============================================================================

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

// Separator placed between two extracted blocks
const BLOCK_SEPARATOR: &str = "\n\n";

// Successful extraction
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    /// All block contents joined by a blank line, empty if none were found
    pub combined_patch_text: String,
    /// How many fenced diff blocks were found
    pub block_count: usize,
}

impl Extraction {
    pub fn has_diff(&self) -> bool {
        self.block_count > 0
    }
}

// Extraction failed for an internal reason
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ExtractError {
    pub reason: String,
}

impl ExtractError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

struct FencePatterns {
    backticks: Regex,
    tildes: Regex,
}

impl FencePatterns {
    fn compile() -> Result<Self, String> {
        // fence, optional blanks, "diff", rest of the line, then the body
        // up to the first newline followed by the same fence
        let backticks = Regex::new(r"(?i)```[ \t]*diff[^\n]*\n([\s\S]*?)\n```")
            .map_err(|e| format!("backtick fence pattern: {}", e))?;
        let tildes = Regex::new(r"(?i)~~~[ \t]*diff[^\n]*\n([\s\S]*?)\n~~~")
            .map_err(|e| format!("tilde fence pattern: {}", e))?;
        Ok(Self { backticks, tildes })
    }
}

static FENCE_PATTERNS: OnceLock<Result<FencePatterns, String>> = OnceLock::new();

fn fence_patterns() -> Result<&'static FencePatterns, ExtractError> {
    FENCE_PATTERNS
        .get_or_init(FencePatterns::compile)
        .as_ref()
        .map_err(|reason| ExtractError::new(reason.clone()))
}

// Extracts every fenced diff block from markdown text
//
// Parameters:
//   markup: the markdown document
//
// Returns:
//   Ok(Extraction) with the combined patch (possibly empty)
//   Err(ExtractError) only on an internal fault
pub fn extract(markup: &str) -> Result<Extraction, ExtractError> {
    let patterns = fence_patterns()?;

    let blocks: Vec<&str> = [&patterns.backticks, &patterns.tildes]
        .into_iter()
        .flat_map(|pattern| inner_blocks(pattern, markup))
        .collect();

    Ok(Extraction {
        combined_patch_text: blocks.join(BLOCK_SEPARATOR),
        block_count: blocks.len(),
    })
}

// Non-overlapping matches of one fence style, in document order
fn inner_blocks<'a>(pattern: &Regex, markup: &'a str) -> Vec<&'a str> {
    pattern
        .captures_iter(markup)
        .filter_map(|captures| captures.get(1))
        .map(|inner| inner.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_block_in_prose() {
        let markup = "Some notes first.\n\n```diff\ndiff --git a/x b/x\n@@ -1 +1 @@\n-old\n+new\n```\n\nThanks!";
        let extraction = extract(markup).unwrap();
        assert_eq!(extraction.block_count, 1);
        assert_eq!(
            extraction.combined_patch_text,
            "diff --git a/x b/x\n@@ -1 +1 @@\n-old\n+new"
        );
        assert!(extraction.has_diff());
    }

    #[test]
    fn test_backticks_come_before_tildes() {
        // the tilde block appears first in the document
        let markup = "~~~diff\n-tilde\n+TILDE\n~~~\n\ntext\n\n```diff\n-tick\n+TICK\n```\n";
        let extraction = extract(markup).unwrap();
        assert_eq!(extraction.block_count, 2);
        assert_eq!(
            extraction.combined_patch_text,
            "-tick\n+TICK\n\n-tilde\n+TILDE"
        );
    }

    #[test]
    fn test_blocks_of_one_style_keep_document_order() {
        let markup = "```diff\n+first\n```\n```rust\nfn main() {}\n```\n```diff\n+second\n```\n";
        let extraction = extract(markup).unwrap();
        assert_eq!(extraction.block_count, 2);
        assert_eq!(extraction.combined_patch_text, "+first\n\n+second");
    }

    #[test]
    fn test_tag_is_case_insensitive_and_may_be_padded() {
        let markup = "``` DIFF  title\n+a\n```\n~~~\tDiff\n+b\n~~~\n";
        let extraction = extract(markup).unwrap();
        assert_eq!(extraction.combined_patch_text, "+a\n\n+b");
    }

    #[test]
    fn test_no_blocks_is_an_empty_success() {
        let markup = "# Title\n\n```rust\nlet x = 1;\n```\n";
        let extraction = extract(markup).unwrap();
        assert_eq!(extraction, Extraction::default());
        assert!(!extraction.has_diff());
    }

    #[test]
    fn test_unclosed_fence_is_ignored() {
        let extraction = extract("```diff\n+never closed\n").unwrap();
        assert_eq!(extraction.block_count, 0);
    }
}
