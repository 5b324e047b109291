// src/render/target.rs
// =============================================================================
// Where rendered output goes.
//
// The pipeline never builds a page itself. It talks to a RenderTarget:
// - show_notice: advisory or error messages next to the content
// - replace_content: swap the whole content surface
// - append_blocks: add painted blocks after the current content
//
// HtmlPage (page.rs) is the real implementation; tests use a recorder.
// =============================================================================

use super::escape::escape_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    /// Errors; shown as dismissible alerts in the error area
    Danger,
}

impl NoticeLevel {
    fn css_class(self) -> &'static str {
        match self {
            NoticeLevel::Info => "alert-info",
            NoticeLevel::Warning => "alert-warning",
            NoticeLevel::Danger => "alert-danger",
        }
    }
}

pub trait RenderTarget {
    fn show_notice(&mut self, level: NoticeLevel, message: &str);
    fn replace_content(&mut self, html: String);
    fn append_blocks(&mut self, blocks: Vec<String>);
}

// A notice as an HTML alert; the message is escaped
pub fn notice_html(level: NoticeLevel, message: &str) -> String {
    let close = if level == NoticeLevel::Danger {
        r##"<a href="#" class="close" data-dismiss="alert" aria-label="close">&times;</a>"##
    } else {
        ""
    };
    format!(
        r#"<div class="alert {}">{}{}</div>"#,
        level.css_class(),
        close,
        escape_html(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_html() {
        assert_eq!(
            notice_html(NoticeLevel::Info, "No diff blocks found."),
            r#"<div class="alert alert-info">No diff blocks found.</div>"#
        );
        let error = notice_html(NoticeLevel::Danger, "File <x> does not exist");
        assert!(error.contains(r#"data-dismiss="alert""#));
        assert!(error.contains("File &lt;x&gt; does not exist"));
    }
}
