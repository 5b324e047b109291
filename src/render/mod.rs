// src/render/mod.rs
// =============================================================================
// Turns classified content into HTML on a RenderTarget.
//
// Submodules:
// - config: RenderConfig and the small/large presets
// - patch: tolerant unified diff parser
// - diff: the diff painter (file list, side-by-side and line-by-line tables)
// - highlight: syntect-based syntax colouring for diff lines
// - escape: HTML escaping
// - target: the RenderTarget trait and notices
// - page: HtmlPage, the stand-alone document we write to disk
//
// Renderer is the entry point. It owns the (expensive to load) highlighter
// and exposes one method per content kind that ends up on the page.
//
// Rust concepts:
// - Trait objects vs generics: render_* take `T: RenderTarget + ?Sized` so
//   they work with a concrete page and with `&mut dyn RenderTarget`
// - async fn + yield_now: give other tasks a turn before heavy work
// =============================================================================

mod config;
mod diff;
mod escape;
mod highlight;
mod page;
mod patch;
mod target;

pub use config::{OutputFormat, RenderConfig};
pub use escape::escape_html;
pub use page::HtmlPage;
pub use target::{NoticeLevel, RenderTarget};

use thiserror::Error;

use crate::content::SizeClass;
use diff::{normalize_change_classes, paint, tag_languages};
use highlight::Highlighter;

pub const NO_DIFF_NOTICE: &str = "No diff blocks found.";
pub const LARGE_DIFF_NOTICE: &str =
    "Large diff detected. Using simplified rendering for performance.";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("syntax highlighting failed: {0}")]
    Highlight(String),
}

#[derive(Debug)]
pub struct Renderer {
    highlighter: Highlighter,
}

impl Renderer {
    // Creates a renderer using the given syntect theme name
    pub fn new(theme: &str) -> Self {
        Self {
            highlighter: Highlighter::new(theme),
        }
    }

    // A renderer whose highlighter fails on every line
    #[cfg(test)]
    pub fn with_broken_highlighter() -> Self {
        Self {
            highlighter: Highlighter::broken(),
        }
    }

    // Renders patch text onto the target
    //
    // Parameters:
    //   patch: unified diff text (may be blank)
    //   size: size class of `patch`, decides the config
    //   target: where notices and painted blocks go
    //
    // Returns:
    //   The config that was used, or None when there was nothing to paint
    pub async fn render_patch<T: RenderTarget + ?Sized>(
        &self,
        patch: &str,
        size: SizeClass,
        target: &mut T,
    ) -> Result<Option<RenderConfig>, RenderError> {
        if patch.trim().is_empty() {
            target.replace_content(target::notice_html(NoticeLevel::Info, NO_DIFF_NOTICE));
            return Ok(None);
        }

        let config = RenderConfig::for_size(size);
        if size == SizeClass::Large {
            target.show_notice(NoticeLevel::Warning, LARGE_DIFF_NOTICE);
        }

        // let the notice land before the (possibly long) paint
        tokio::task::yield_now().await;

        let mut painted = paint(patch, &config, &self.highlighter)?;
        if size == SizeClass::Small {
            tag_languages(&mut painted);
            normalize_change_classes(&mut painted);
        }

        target.replace_content(String::new());
        target.append_blocks(painted.into_blocks());
        Ok(Some(config))
    }

    // Injects HTML as-is. The gist author controls this markup.
    pub fn render_html<T: RenderTarget + ?Sized>(&self, body: &str, target: &mut T) {
        target.replace_content(body.to_string());
    }

    pub fn render_plain_text<T: RenderTarget + ?Sized>(&self, body: &str, target: &mut T) {
        target.replace_content(format!(
            r#"<pre style="white-space:pre-wrap">{}</pre>"#,
            escape_html(body)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scraper::{Html, Selector};

    const SMALL_PATCH: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,3 @@
 fn main() {
-    println!(\"hello\");
+    println!(\"hello, world\");
 }
";

    fn select(html: &str, selector: &str) -> usize {
        let fragment = Html::parse_fragment(html);
        let selector = Selector::parse(selector).unwrap();
        fragment.select(&selector).count()
    }

    #[tokio::test]
    async fn test_blank_patch_shows_info_notice() {
        let renderer = Renderer::new("InspiredGitHub");
        let mut page = HtmlPage::new("t");
        let config = renderer
            .render_patch("  \n\t", SizeClass::Small, &mut page)
            .await
            .unwrap();

        assert!(config.is_none());
        assert!(page.content_html().contains(NO_DIFF_NOTICE));
        assert!(page.advisories().is_empty());
    }

    #[tokio::test]
    async fn test_small_patch_is_tagged_and_normalized() {
        let renderer = Renderer::new("InspiredGitHub");
        let mut page = HtmlPage::new("t");
        let config = renderer
            .render_patch(SMALL_PATCH, SizeClass::Small, &mut page)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(config.output_format, OutputFormat::SideBySide);
        let html = page.content_html();
        assert_eq!(select(&html, r#".d2h-file-wrapper[data-lang="rust"]"#), 1);
        let changed_code = "td.d2h-change:not(.d2h-code-side-linenumber)";
        assert_eq!(select(&html, &format!("{}.d2h-ins", changed_code)), 0);
        assert_eq!(select(&html, &format!("{}.d2h-del", changed_code)), 0);
        assert!(page.advisories().is_empty());
    }

    #[tokio::test]
    async fn test_large_patch_warns_and_simplifies() {
        let renderer = Renderer::new("InspiredGitHub");
        let mut page = HtmlPage::new("t");
        let config = renderer
            .render_patch(SMALL_PATCH, SizeClass::Large, &mut page)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(config.output_format, OutputFormat::LineByLine);
        assert!(!config.highlight);
        assert_eq!(page.advisories().len(), 1);
        assert!(page.advisories()[0].contains(LARGE_DIFF_NOTICE));
        assert_eq!(select(&page.content_html(), ".d2h-file-wrapper[data-lang]"), 0);
    }

    #[tokio::test]
    async fn test_highlight_error_leaves_content_alone() {
        let renderer = Renderer::with_broken_highlighter();
        let mut page = HtmlPage::new("t");
        let result = renderer
            .render_patch(SMALL_PATCH, SizeClass::Small, &mut page)
            .await;

        assert!(matches!(result, Err(RenderError::Highlight(_))));
        assert_eq!(page.content_html(), "");
    }

    #[tokio::test]
    async fn test_large_patch_skips_the_highlighter() {
        let renderer = Renderer::with_broken_highlighter();
        let mut page = HtmlPage::new("t");
        let config = renderer
            .render_patch(SMALL_PATCH, SizeClass::Large, &mut page)
            .await
            .unwrap();
        assert!(config.is_some());
    }

    #[test]
    fn test_plain_text_is_escaped() {
        let renderer = Renderer::new("InspiredGitHub");
        let mut page = HtmlPage::new("t");
        renderer.render_plain_text("a < b && 'c'", &mut page);
        assert_eq!(
            page.content_html(),
            r#"<pre style="white-space:pre-wrap">a &lt; b &amp;&amp; &#39;c&#39;</pre>"#
        );
    }

    #[test]
    fn test_html_is_injected_verbatim() {
        let renderer = Renderer::new("InspiredGitHub");
        let mut page = HtmlPage::new("t");
        renderer.render_html("<h1>Hi</h1><script>x()</script>", &mut page);
        assert_eq!(page.content_html(), "<h1>Hi</h1><script>x()</script>");
    }
}
