// src/content/classify.rs
// =============================================================================
// Decides what kind of content a gist file holds and how big a patch is.
//
// Kind detection:
// - The file extension is trusted for .diff, .md and .html
// - A name without a '.' counts as its own extension, so a file called
//   "diff" is a patch
// - Everything else (.txt, empty name, unknown extension) is sniffed:
//   patch markers win over markdown markers, plain text is the fallback
//
// Size detection:
// - A patch is Large when it exceeds either the byte or the line threshold
// - Large patches get a cheaper render configuration (see render::config)
//
// Both functions are pure: same input, same answer, no panics.
// =============================================================================

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// The four ways a file can be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// A unified diff, painted by the diff renderer
    Patch,
    /// Markdown; its ```diff blocks are extracted and painted
    Markup,
    /// HTML, injected verbatim
    Html,
    /// Anything else, escaped inside a <pre>
    PlainText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Large,
}

// Limits above which a patch counts as Large
//
// Either limit alone is enough. Defaults: 500,000 bytes, 8,000 lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeThresholds {
    #[serde(default = "default_large_bytes")]
    pub large_bytes: usize,
    #[serde(default = "default_large_lines")]
    pub large_lines: usize,
}

fn default_large_bytes() -> usize {
    500_000
}

fn default_large_lines() -> usize {
    8_000
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            large_bytes: default_large_bytes(),
            large_lines: default_large_lines(),
        }
    }
}

static PATCH_MARKER: OnceLock<Regex> = OnceLock::new();
static HEADING_MARKER: OnceLock<Regex> = OnceLock::new();
static LIST_MARKER: OnceLock<Regex> = OnceLock::new();

// A line starting with "diff --git" or "@@"
fn patch_marker() -> &'static Regex {
    PATCH_MARKER.get_or_init(|| {
        Regex::new(r"(?m)^(?:diff\s--git|@@)").expect("patch marker pattern is valid")
    })
}

// "# Title" at the start of the text or of a line, up to 3 spaces of indent
fn heading_marker() -> &'static Regex {
    HEADING_MARKER.get_or_init(|| {
        Regex::new(r"(?:^|\n)\s{0,3}#{1,6}\s").expect("heading pattern is valid")
    })
}

// "> quote", "- item", "* item", "+ item"
fn list_marker() -> &'static Regex {
    LIST_MARKER
        .get_or_init(|| Regex::new(r"(?:^|\n)[>\-*+]\s").expect("list pattern is valid"))
}

// Classifies content from its file name hint and body
//
// Parameters:
//   file_name_hint: the gist file name, may be empty
//   body: the file content, may be empty
//
// Returns: exactly one ContentKind
pub fn classify_kind(file_name_hint: &str, body: &str) -> ContentKind {
    match extension(file_name_hint).as_str() {
        "diff" => ContentKind::Patch,
        "md" => ContentKind::Markup,
        "html" => ContentKind::Html,
        _ => sniff(body),
    }
}

// Classifies a patch payload by size
//
// Large if bytes > large_bytes OR lines > large_lines, where lines counts
// newline-separated lines. Empty text is always Small.
pub fn classify_size(patch_text: &str, thresholds: &SizeThresholds) -> SizeClass {
    if patch_text.is_empty() {
        return SizeClass::Small;
    }

    if patch_text.len() > thresholds.large_bytes {
        return SizeClass::Large;
    }

    let lines = patch_text.bytes().filter(|b| *b == b'\n').count() + 1;
    if lines > thresholds.large_lines {
        SizeClass::Large
    } else {
        SizeClass::Small
    }
}

// Lower-cased text after the last '.', or the whole name when it has none
fn extension(file_name_hint: &str) -> String {
    file_name_hint
        .rsplit_once('.')
        .map_or(file_name_hint, |(_, ext)| ext)
        .to_ascii_lowercase()
}

fn sniff(body: &str) -> ContentKind {
    if looks_like_patch(body) {
        ContentKind::Patch
    } else if looks_like_markdown(body) {
        ContentKind::Markup
    } else {
        ContentKind::PlainText
    }
}

fn looks_like_patch(body: &str) -> bool {
    patch_marker().is_match(body)
}

fn looks_like_markdown(body: &str) -> bool {
    heading_marker().is_match(body) || list_marker().is_match(body) || body.contains("```")
}
