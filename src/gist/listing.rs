// src/gist/listing.rs
// =============================================================================
// The two HTML blocks shown above the rendered content:
//
// 1. details_html: html_url, description, id, created_at, updated_at
// 2. file_list_html: one entry per file with a viewer link, the size, the
//    language (when GitHub knows it) and a link to the raw file
//
// Every value coming from the API is escaped before it lands in the markup.
//
// Rust concepts:
// - Closures: `link` captures nothing and formats one anchor tag
// - Arrays of tuples: iterate over (key, value) rows without a HashMap
// =============================================================================

use crate::render::escape_html;

use super::fetch::Gist;

// Binary units, 1 KB = 1024 Bytes
const SIZE_UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

// Human-readable size: 0 -> "0 Bytes", 1536 -> "1.5 KB"
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    // Divide until the number fits the unit (or we run out of units)
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    // Two decimals at most, without trailing zeros: "1.50" -> "1.5"
    let number = format!("{:.2}", value);
    let number = number.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", number, SIZE_UNITS[unit])
}

// Builds the "Gist Details" list
pub fn details_html(gist: &Gist) -> String {
    let link = |url: &str| {
        let url = escape_html(url);
        format!(r#"<a href="{0}" target="_blank" rel="noopener">{0}</a>"#, url)
    };
    let rows = [
        ("html_url", link(&gist.html_url)),
        (
            "description",
            escape_html(gist.description.as_deref().unwrap_or_default()),
        ),
        ("id", escape_html(&gist.id)),
        ("created_at", escape_html(&gist.created_at)),
        ("updated_at", escape_html(&gist.updated_at)),
    ];

    let mut html = String::from(r#"<div id="gist_details"><h4>Gist Details:</h4><ul>"#);
    for (key, value) in rows {
        html.push_str(&format!("<li>{} : {}</li>", key, value));
    }
    html.push_str("</ul></div>");
    html
}

// One entry per file: viewer link (?<id>/<file>), size and raw link
//
// The file name is percent-encoded so address parsing gets it back intact.
pub fn file_list_html(gist: &Gist) -> String {
    let mut html = format!(
        r#"<div id="files"><h4>Files from Gist: <span class="badge">{}</span></h4><ul>"#,
        gist.files.len()
    );
    for file in &gist.files {
        // byte_serialize writes spaces as '+', the address parser wants %20
        let viewer_link = format!(
            "?{}/{}",
            gist.id,
            url::form_urlencoded::byte_serialize(file.filename.as_bytes())
                .collect::<String>()
                .replace('+', "%20")
        );
        let language = file
            .language
            .as_deref()
            .map(|language| format!(", {}", escape_html(language)))
            .unwrap_or_default();
        html.push_str(&format!(
            r#"<li><a target="_blank" rel="noopener" href="{}">{}</a> ({}{}) [<a href="{}">raw_gist</a>]</li>"#,
            escape_html(&viewer_link),
            escape_html(&file.filename),
            format_bytes(file.size),
            language,
            escape_html(&file.raw_url)
        ));
    }
    html.push_str("</ul></div>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gist::fetch::GistFile;
    use scraper::{Html, Selector};

    fn gist() -> Gist {
        Gist {
            id: "abc123".to_string(),
            html_url: "https://gist.github.com/abc123".to_string(),
            description: Some("fix <parser>".to_string()),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-02T00:00:00Z".to_string(),
            files: vec![GistFile {
                filename: "my notes.md".to_string(),
                content: None,
                raw_url: "https://gist.githubusercontent.com/raw/notes".to_string(),
                size: 1536,
                truncated: false,
                language: None,
            }],
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1024 * 1024), "1 MB");
    }

    #[test]
    fn test_details_are_escaped() {
        let html = details_html(&gist());
        assert!(html.contains("fix &lt;parser&gt;"));
        let fragment = Html::parse_fragment(&html);
        let items = Selector::parse("#gist_details li").unwrap();
        assert_eq!(fragment.select(&items).count(), 5);
    }

    #[test]
    fn test_file_list_links() {
        let html = file_list_html(&gist());
        let fragment = Html::parse_fragment(&html);
        let links = Selector::parse("#files li a").unwrap();
        let hrefs: Vec<_> = fragment
            .select(&links)
            .filter_map(|a| a.value().attr("href"))
            .collect();
        assert_eq!(
            hrefs,
            vec!["?abc123/my%20notes.md", "https://gist.githubusercontent.com/raw/notes"]
        );
        assert!(html.contains("(1.5 KB)"));
    }
}
