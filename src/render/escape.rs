// src/render/escape.rs
// =============================================================================
// HTML escaping for everything we put on the page ourselves: plain text
// bodies, file names, gist details and unhighlighted diff lines.
//
// Escaped characters: & < > " '
// Gist HTML files are never passed through here, they are injected as-is.
//
// Rust concepts:
// - String::with_capacity: reserve once, most text has nothing to escape
// - chars(): walks Unicode scalar values, so multi-byte text stays intact
// =============================================================================

// Returns `text` with the HTML special characters replaced by entities
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    // One pass; every other character is copied unchanged
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_all_specials() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
        assert_eq!(escape_html(""), "");
    }

    #[test]
    fn test_non_ascii_is_kept() {
        assert_eq!(escape_html("naïve → <ok>"), "naïve → &lt;ok&gt;");
    }
}
