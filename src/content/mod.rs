// src/content/mod.rs
// =============================================================================
// This module decides what a gist file *is* and pulls diffs out of markdown.
//
// Submodules:
// - unit: ContentUnit, the immutable input to one render pass
// - classify: pure functions for content kind and patch size
// - extract: finds ```diff / ~~~diff fenced blocks in markdown
//
// Nothing in here does I/O or keeps state between calls, so the extractor can
// run unchanged on the background worker thread or inline on the main task.
// =============================================================================

mod classify;
mod extract;
mod unit;

pub use classify::{classify_kind, classify_size, ContentKind, SizeClass, SizeThresholds};
pub use extract::{extract, ExtractError, Extraction};
pub use unit::ContentUnit;
