// src/gist/mod.rs
// =============================================================================
// Everything that knows about GitHub gists.
//
// Submodules:
// - address: parse "[?]id[/file]" and gist URLs
// - fetch: GistClient (metadata + raw content) and file selection
// - listing: the gist details / file list HTML shown above the content
// =============================================================================

mod address;
mod fetch;
mod listing;

pub use address::GistAddress;
pub use fetch::{Gist, GistClient};
pub use listing::{details_html, file_list_html};
