// src/worker/mod.rs
// =============================================================================
// Background extraction.
//
// The markdown extractor can take a while on big documents, so it runs on a
// dedicated thread reached through a BackgroundChannel. See channel.rs for
// the request/reply protocol and the task correlation table.
// =============================================================================

mod channel;

pub use channel::{BackgroundChannel, ExtractReply, PendingExtraction};
