// src/render/page.rs
// =============================================================================
// HtmlPage: a stand-alone HTML document used as the render target.
//
// Layout, top to bottom:
// 1. error area (dismissible alerts)
// 2. header (gist details and file list, when viewing a gist)
// 3. one section per rendered file, each with its advisory notices followed
//    by the content surface
//
// The document carries its own CSS and two tiny scripts (dismissing alerts,
// synchronised scrolling of side-by-side panes) so it can be opened from disk.
// =============================================================================

use super::escape::escape_html;
use super::target::{notice_html, NoticeLevel, RenderTarget};

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2em; color: #24292f; }
.alert { padding: .75em 1em; margin: .5em 0; border-radius: 4px; border: 1px solid transparent; }
.alert-info { background: #d9edf7; border-color: #bce8f1; }
.alert-warning { background: #fcf8e3; border-color: #faebcc; }
.alert-danger { background: #f2dede; border-color: #ebccd1; }
.alert .close { float: right; text-decoration: none; color: inherit; }
.d2h-file-wrapper { border: 1px solid #d0d7de; border-radius: 4px; margin-bottom: 1em; }
.d2h-file-header { background: #f6f8fa; padding: .5em; border-bottom: 1px solid #d0d7de; }
.d2h-tag { margin-left: .5em; font-size: .75em; border: 1px solid; border-radius: 3px; padding: 0 .3em; }
.d2h-files-diff { display: flex; }
.d2h-file-side-diff { width: 50%; overflow-x: auto; }
.d2h-diff-table { border-collapse: collapse; width: 100%; font-family: Menlo, Consolas, monospace; font-size: 12px; }
.d2h-code-side-linenumber, .d2h-code-linenumber { color: #8c959f; text-align: right; padding: 0 .5em; user-select: none; }
.d2h-code-line-ctn { white-space: pre; }
.d2h-ins { background: #e6ffec; }
.d2h-del { background: #ffebe9; }
.d2h-change { background: #fff8c5; }
.d2h-info { background: #ddf4ff; color: #57606a; }
.d2h-emptyplaceholder { background: #f6f8fa; }
ins { background: #abf2bc; text-decoration: none; }
del { background: #ffc1c0; text-decoration: none; }
.d2h-lines-added { color: #1a7f37; margin-left: .5em; }
.d2h-lines-deleted { color: #cf222e; margin-left: .3em; }
"#;

const SCRIPT: &str = r#"
document.addEventListener('click', function (e) {
  if (e.target.matches('[data-dismiss="alert"]')) { e.preventDefault(); e.target.parentNode.remove(); }
});
document.querySelectorAll('[data-sync-scroll] ').forEach(function (pair) {
  var panes = pair.querySelectorAll('.d2h-file-side-diff');
  panes.forEach(function (pane, i) {
    pane.addEventListener('scroll', function () {
      var other = panes[1 - i];
      if (other && other.scrollLeft !== pane.scrollLeft) other.scrollLeft = pane.scrollLeft;
    });
  });
});
"#;

#[derive(Debug, Default)]
struct Section {
    title: Option<String>,
    advisories: Vec<String>,
    content: Vec<String>,
}

impl Section {
    fn is_blank(&self) -> bool {
        self.title.is_none() && self.advisories.is_empty() && self.content.is_empty()
    }
}

#[derive(Debug)]
pub struct HtmlPage {
    title: String,
    header: Option<String>,
    errors: Vec<String>,
    sections: Vec<Section>,
}

impl HtmlPage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            header: None,
            errors: Vec::new(),
            sections: vec![Section::default()],
        }
    }

    // Sets the gist details / file list block shown above the content
    pub fn set_header(&mut self, html: String) {
        self.header = Some(html);
    }

    // Starts a new titled content surface (used when rendering many files)
    pub fn start_section(&mut self, title: impl Into<String>) {
        let section = Section {
            title: Some(title.into()),
            ..Section::default()
        };
        match self.sections.last_mut() {
            Some(last) if last.is_blank() => *last = section,
            _ => self.sections.push(section),
        }
    }

    // Error messages shown so far, unescaped
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    // Advisory notices of the current section, as HTML
    pub fn advisories(&self) -> &[String] {
        self.sections
            .last()
            .map(|section| section.advisories.as_slice())
            .unwrap_or_default()
    }

    // Content surface of the current section, as HTML
    pub fn content_html(&self) -> String {
        self.sections
            .last()
            .map(|section| section.content.concat())
            .unwrap_or_default()
    }

    pub fn into_document(self) -> String {
        let mut body = String::from(r#"<div id="alert-box">"#);
        for message in &self.errors {
            body.push_str(&notice_html(NoticeLevel::Danger, message));
        }
        body.push_str("</div>");

        if let Some(header) = &self.header {
            body.push_str(header);
        }

        for section in &self.sections {
            body.push_str(r#"<section class="gist-file">"#);
            if let Some(title) = &section.title {
                body.push_str(&format!("<h3>{}</h3>", escape_html(title)));
            }
            body.push_str(&section.advisories.concat());
            body.push_str(r#"<div class="gist-content">"#);
            body.push_str(&section.content.concat());
            body.push_str("</div></section>");
        }

        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n<script>{}</script>\n</body>\n</html>\n",
            escape_html(&self.title),
            STYLE,
            body,
            SCRIPT
        )
    }

    fn current(&mut self) -> &mut Section {
        if self.sections.is_empty() {
            self.sections.push(Section::default());
        }
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }
}

impl RenderTarget for HtmlPage {
    fn show_notice(&mut self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Danger => self.errors.push(message.to_string()),
            _ => self.current().advisories.push(notice_html(level, message)),
        }
    }

    fn replace_content(&mut self, html: String) {
        self.current().content = vec![html];
    }

    fn append_blocks(&mut self, blocks: Vec<String>) {
        self.current().content.extend(blocks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn count(document: &str, selector: &str) -> usize {
        let document = Html::parse_document(document);
        let selector = Selector::parse(selector).unwrap();
        document.select(&selector).count()
    }

    #[test]
    fn test_errors_go_to_the_alert_box() {
        let mut page = HtmlPage::new("gist");
        page.show_notice(NoticeLevel::Danger, "File a.md does not exist");
        page.show_notice(NoticeLevel::Warning, "Large diff detected.");
        page.replace_content("<p>body</p>".to_string());

        assert_eq!(page.errors(), ["File a.md does not exist".to_string()]);
        assert_eq!(page.advisories().len(), 1);

        let document = page.into_document();
        assert_eq!(count(&document, "#alert-box .alert-danger"), 1);
        assert_eq!(count(&document, ".gist-file > .alert-warning"), 1);
        assert_eq!(count(&document, ".gist-content p"), 1);
    }

    #[test]
    fn test_replace_then_append() {
        let mut page = HtmlPage::new("gist");
        page.replace_content("Rendering...".to_string());
        page.replace_content(String::new());
        page.append_blocks(vec!["<a></a>".to_string(), "<b></b>".to_string()]);
        assert_eq!(page.content_html(), "<a></a><b></b>");
    }

    #[test]
    fn test_sections() {
        let mut page = HtmlPage::new("gist");
        page.start_section("one.diff");
        page.replace_content("1".to_string());
        page.start_section("two.md");
        page.replace_content("2".to_string());
        assert_eq!(page.content_html(), "2");

        let document = page.into_document();
        assert_eq!(count(&document, "section.gist-file"), 2);
        assert_eq!(count(&document, "section.gist-file h3"), 2);
    }
}
