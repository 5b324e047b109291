// src/render/config.rs
// =============================================================================
// RenderConfig: how a patch gets painted.
//
// The values are picked from the patch's SizeClass:
//
//   Small -> side-by-side, lines matched by similarity, char-level inline
//            diffs, synchronised scrolling, syntax highlighting
//   Large -> line-by-line, no line matching, word-level inline diffs,
//            no synchronised scrolling, no highlighting
//
// Matching lines, char-level diffing and keeping two panes in sync all get
// expensive as a diff grows, so Large patches turn them off.
// =============================================================================

use serde::Serialize;

use crate::content::SizeClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineMatching {
    /// Pair deleted and inserted lines by similarity
    Lines,
    /// Pair them in the order they appear
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    SideBySide,
    LineByLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiffStyle {
    Char,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderConfig {
    pub draw_file_list: bool,
    pub file_list_toggle: bool,
    pub file_list_start_visible: bool,
    pub file_content_toggle: bool,
    pub matching: LineMatching,
    pub output_format: OutputFormat,
    pub synchronised_scroll: bool,
    pub highlight: bool,
    pub render_nothing_when_empty: bool,
    pub diff_style: DiffStyle,
}

impl RenderConfig {
    // Builds the configuration for a patch of the given size
    pub fn for_size(size: SizeClass) -> Self {
        let large = size == SizeClass::Large;

        Self {
            draw_file_list: true,
            file_list_toggle: true,
            file_list_start_visible: true,
            file_content_toggle: true,
            matching: if large { LineMatching::None } else { LineMatching::Lines },
            output_format: if large {
                OutputFormat::LineByLine
            } else {
                OutputFormat::SideBySide
            },
            synchronised_scroll: !large,
            highlight: !large,
            render_nothing_when_empty: false,
            diff_style: if large { DiffStyle::Word } else { DiffStyle::Char },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_small_patch_gets_full_fidelity() {
        let config = RenderConfig::for_size(SizeClass::Small);
        assert!(config.draw_file_list && config.file_list_start_visible);
        assert_eq!(config.matching, LineMatching::Lines);
        assert_eq!(config.output_format, OutputFormat::SideBySide);
        assert!(config.synchronised_scroll);
        assert!(config.highlight);
        assert_eq!(config.diff_style, DiffStyle::Char);
    }

    #[test]
    fn test_large_patch_gets_simplified() {
        let config = RenderConfig::for_size(SizeClass::Large);
        assert!(config.draw_file_list && config.file_list_start_visible);
        assert_eq!(config.matching, LineMatching::None);
        assert_eq!(config.output_format, OutputFormat::LineByLine);
        assert!(!config.synchronised_scroll);
        assert!(!config.highlight);
        assert_eq!(config.diff_style, DiffStyle::Word);
    }

    #[test]
    fn test_serializes_like_the_report_expects() {
        let json = serde_json::to_value(RenderConfig::for_size(SizeClass::Large)).unwrap();
        assert_eq!(json["output_format"], "line-by-line");
        assert_eq!(json["matching"], "none");
        assert_eq!(json["diff_style"], "word");
    }
}
