// src/render/diff.rs
// =============================================================================
// Paints a patch as HTML using the d2h-* class vocabulary.
//
// Output blocks:
// - an optional file list (names, +/- counts, anchors)
// - one `d2h-file-wrapper` block per changed file
//
// Per file, deleted and inserted lines of a change run are paired up
// (by similarity or by position, see RenderConfig::matching). Paired lines
// get inline <del>/<ins> markup at char or word granularity; everything else
// is syntax highlighted when the config asks for it.
//
// The post-paint fix-up (`tag_languages`, `normalize_change_classes`) runs
// only for small patches and is idempotent.
// =============================================================================

use similar::{ChangeTag, TextDiff};

use super::config::{DiffStyle, LineMatching, OutputFormat, RenderConfig};
use super::escape::escape_html;
use super::highlight::Highlighter;
use super::patch::{parse_patch, DiffLine, FileDiff, FileStatus, Hunk, LineKind};
use super::RenderError;

// Label for modified files
const CHANGED_TAG_TEMPLATE: &str =
    r#"<span class="d2h-tag d2h-changed d2h-changed-tag">MODIFIED</span>"#;

// Pairs need at least this similarity to be matched
const MATCH_THRESHOLD: f32 = 0.5;

// Above this many deletion x insertion comparisons, pair by position instead
const MAX_LINE_COMPARISONS: usize = 2_500;

const WRAPPER_OPEN: &str = r#"<div class="d2h-file-wrapper""#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintedFile {
    pub path: String,
    pub language: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintedDiff {
    pub file_list: Option<String>,
    pub files: Vec<PaintedFile>,
    render_nothing_when_empty: bool,
}

impl PaintedDiff {
    // Flattens the painted diff into content blocks, in display order
    pub fn into_blocks(self) -> Vec<String> {
        let mut blocks = Vec::with_capacity(self.files.len() + 1);
        if self.files.is_empty() {
            if !self.render_nothing_when_empty {
                blocks.push(r#"<div class="d2h-info">No changes found in this patch.</div>"#.to_string());
            }
            return blocks;
        }
        blocks.extend(self.file_list);
        blocks.extend(self.files.into_iter().map(|file| file.html));
        blocks
    }
}

// Paints patch text with the given configuration
pub fn paint(
    patch: &str,
    config: &RenderConfig,
    highlighter: &Highlighter,
) -> Result<PaintedDiff, RenderError> {
    let files = parse_patch(patch);

    let file_list = (config.draw_file_list && !files.is_empty())
        .then(|| file_list_html(&files, config));

    let painted = files
        .iter()
        .enumerate()
        .map(|(index, file)| paint_file(index, file, config, highlighter))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("painted {} file(s) as {:?}", painted.len(), config.output_format);

    Ok(PaintedDiff {
        file_list,
        files: painted,
        render_nothing_when_empty: config.render_nothing_when_empty,
    })
}

// Adds a data-lang attribute to every file block that does not have one yet
pub fn tag_languages(diff: &mut PaintedDiff) {
    for file in &mut diff.files {
        let Some(open_end) = file.html.find('>') else {
            continue;
        };
        let open_tag = &file.html[..open_end];
        if !open_tag.starts_with(WRAPPER_OPEN) || open_tag.contains("data-lang=") {
            continue;
        }
        let attribute = format!(r#" data-lang="{}""#, escape_html(&file.language));
        file.html.insert_str(open_end, &attribute);
    }
}

// Turns changed-line code cells into plain `d2h-change` cells
//
// Line-number cells keep their classes.
pub fn normalize_change_classes(diff: &mut PaintedDiff) {
    for file in &mut diff.files {
        file.html = file
            .html
            .replace(r#"<td class="d2h-ins d2h-change">"#, r#"<td class="d2h-change">"#)
            .replace(r#"<td class="d2h-del d2h-change">"#, r#"<td class="d2h-change">"#);
    }
}

fn file_list_html(files: &[FileDiff], config: &RenderConfig) -> String {
    let mut html = String::from(r#"<div class="d2h-file-list-wrapper">"#);
    html.push_str(&format!(
        r#"<div class="d2h-file-list-header"><span class="d2h-file-list-title">Files changed ({})</span>"#,
        files.len()
    ));
    if config.file_list_toggle {
        html.push_str(r##"<a class="d2h-file-switch" href="#">hide</a>"##);
    }
    html.push_str("</div>");

    let style = if config.file_list_start_visible {
        ""
    } else {
        r#" style="display: none""#
    };
    html.push_str(&format!(r#"<ol class="d2h-file-list"{}>"#, style));
    for (index, file) in files.iter().enumerate() {
        html.push_str(&format!(
            concat!(
                r#"<li class="d2h-file-list-line"><span class="d2h-file-name-wrapper">"#,
                r##"<a href="#d2h-file-{}" class="d2h-file-name">{}</a>"##,
                r#"<span class="d2h-file-stats"><span class="d2h-lines-added">+{}</span>"#,
                r#"<span class="d2h-lines-deleted">-{}</span></span></span></li>"#
            ),
            index,
            escape_html(&file.display_name()),
            file.additions(),
            file.deletions()
        ));
    }
    html.push_str("</ol></div>");
    html
}

fn paint_file(
    index: usize,
    file: &FileDiff,
    config: &RenderConfig,
    highlighter: &Highlighter,
) -> Result<PaintedFile, RenderError> {
    let painter = LinePainter {
        path: &file.path,
        config,
        highlighter,
    };

    let mut html = format!(
        r#"{} id="d2h-file-{}">{}"#,
        WRAPPER_OPEN,
        index,
        file_header_html(file, config)
    );

    if file.is_binary {
        html.push_str(r#"<div class="d2h-info">Binary files differ</div>"#);
    } else {
        match config.output_format {
            OutputFormat::SideBySide => html.push_str(&painter.side_by_side(&file.hunks)?),
            OutputFormat::LineByLine => html.push_str(&painter.line_by_line(&file.hunks)?),
        }
    }
    html.push_str("</div>");

    Ok(PaintedFile {
        path: file.path.clone(),
        language: highlighter.language_for(&file.path),
        html,
    })
}

fn file_header_html(file: &FileDiff, config: &RenderConfig) -> String {
    let tag = match file.status {
        FileStatus::Added => r#"<span class="d2h-tag d2h-added d2h-added-tag">ADDED</span>"#,
        FileStatus::Deleted => r#"<span class="d2h-tag d2h-deleted d2h-deleted-tag">DELETED</span>"#,
        FileStatus::Renamed => r#"<span class="d2h-tag d2h-moved d2h-moved-tag">RENAMED</span>"#,
        FileStatus::Modified => CHANGED_TAG_TEMPLATE,
    };
    let toggle = if config.file_content_toggle {
        r#"<label class="d2h-file-collapse"><input class="d2h-file-collapse-input" type="checkbox" name="viewed" value="viewed">Viewed</label>"#
    } else {
        ""
    };
    format!(
        r#"<div class="d2h-file-header"><span class="d2h-file-name-wrapper"><span class="d2h-file-name">{}</span>{}</span>{}</div>"#,
        escape_html(&file.display_name()),
        tag,
        toggle
    )
}

// One visual row: the old side, the new side, or both
enum Row<'a> {
    Info(&'a str),
    Context(&'a DiffLine),
    Change {
        old: Option<&'a DiffLine>,
        new: Option<&'a DiffLine>,
    },
}

// Splits a hunk into rows, pairing deletions with insertions per change run
fn hunk_rows<'a>(hunk: &'a Hunk, matching: LineMatching) -> Vec<Row<'a>> {
    let mut rows = vec![Row::Info(&hunk.header)];
    let mut deleted: Vec<&DiffLine> = Vec::new();
    let mut inserted: Vec<&DiffLine> = Vec::new();

    for line in &hunk.lines {
        match line.kind {
            LineKind::Deletion => deleted.push(line),
            LineKind::Addition => inserted.push(line),
            LineKind::Context | LineKind::Note => {
                flush_change_run(&mut rows, &mut deleted, &mut inserted, matching);
                rows.push(match line.kind {
                    LineKind::Note => Row::Info(&line.content),
                    _ => Row::Context(line),
                });
            }
        }
    }
    flush_change_run(&mut rows, &mut deleted, &mut inserted, matching);
    rows
}

fn flush_change_run<'a>(
    rows: &mut Vec<Row<'a>>,
    deleted: &mut Vec<&'a DiffLine>,
    inserted: &mut Vec<&'a DiffLine>,
    matching: LineMatching,
) {
    if deleted.is_empty() && inserted.is_empty() {
        return;
    }
    for (old, new) in pair_lines(deleted, inserted, matching) {
        rows.push(Row::Change {
            old: old.map(|i| deleted[i]),
            new: new.map(|i| inserted[i]),
        });
    }
    deleted.clear();
    inserted.clear();
}

// Index pairs (deleted, inserted) in display order
fn pair_lines(
    deleted: &[&DiffLine],
    inserted: &[&DiffLine],
    matching: LineMatching,
) -> Vec<(Option<usize>, Option<usize>)> {
    let too_many = deleted.len() * inserted.len() > MAX_LINE_COMPARISONS;
    if matching == LineMatching::None || too_many {
        let rows = deleted.len().max(inserted.len());
        return (0..rows)
            .map(|i| {
                (
                    (i < deleted.len()).then_some(i),
                    (i < inserted.len()).then_some(i),
                )
            })
            .collect();
    }

    let mut pairs = Vec::new();
    let mut next_insert = 0;
    for (del_index, del) in deleted.iter().enumerate() {
        let mut best: Option<(usize, f32)> = None;
        for (ins_index, ins) in inserted.iter().enumerate().skip(next_insert) {
            let ratio = TextDiff::from_chars(del.content.as_str(), ins.content.as_str()).ratio();
            if ratio >= MATCH_THRESHOLD && best.map_or(true, |(_, top)| ratio > top) {
                best = Some((ins_index, ratio));
            }
        }

        match best {
            Some((ins_index, _)) => {
                pairs.extend((next_insert..ins_index).map(|skipped| (None, Some(skipped))));
                pairs.push((Some(del_index), Some(ins_index)));
                next_insert = ins_index + 1;
            }
            None => pairs.push((Some(del_index), None)),
        }
    }
    pairs.extend((next_insert..inserted.len()).map(|rest| (None, Some(rest))));
    pairs
}

// Marks the changed parts of a paired line, returns (old html, new html)
fn inline_diff(old: &str, new: &str, style: DiffStyle) -> (String, String) {
    let diff = match style {
        DiffStyle::Char => TextDiff::from_chars(old, new),
        DiffStyle::Word => TextDiff::from_words(old, new),
    };

    let mut old_segments: Vec<(ChangeTag, String)> = Vec::new();
    let mut new_segments: Vec<(ChangeTag, String)> = Vec::new();
    for change in diff.iter_all_changes() {
        let tag = change.tag();
        if tag != ChangeTag::Insert {
            push_segment(&mut old_segments, tag, change.value());
        }
        if tag != ChangeTag::Delete {
            push_segment(&mut new_segments, tag, change.value());
        }
    }

    (segments_html(&old_segments), segments_html(&new_segments))
}

fn push_segment(segments: &mut Vec<(ChangeTag, String)>, tag: ChangeTag, value: &str) {
    match segments.last_mut() {
        Some((last_tag, text)) if *last_tag == tag => text.push_str(value),
        _ => segments.push((tag, value.to_string())),
    }
}

fn segments_html(segments: &[(ChangeTag, String)]) -> String {
    segments
        .iter()
        .map(|(tag, text)| match tag {
            ChangeTag::Equal => escape_html(text),
            ChangeTag::Delete => format!("<del>{}</del>", escape_html(text)),
            ChangeTag::Insert => format!("<ins>{}</ins>", escape_html(text)),
        })
        .collect()
}

// Which side of a row a cell is painted for
#[derive(Clone, Copy)]
enum Side {
    Old,
    New,
}

struct LinePainter<'a> {
    path: &'a str,
    config: &'a RenderConfig,
    highlighter: &'a Highlighter,
}

impl LinePainter<'_> {
    fn side_by_side(&self, hunks: &[Hunk]) -> Result<String, RenderError> {
        let mut left = String::new();
        let mut right = String::new();

        for hunk in hunks {
            for row in hunk_rows(hunk, self.config.matching) {
                match row {
                    Row::Info(text) => {
                        let cell = side_cell("d2h-info", "", &escape_html(text), "");
                        left.push_str(&cell);
                        right.push_str(&cell);
                    }
                    Row::Context(line) => {
                        let code = self.code(line)?;
                        left.push_str(&side_cell("d2h-cntx", &number(line.old_line), &code, " "));
                        right.push_str(&side_cell("d2h-cntx", &number(line.new_line), &code, " "));
                    }
                    Row::Change { old, new } => {
                        let (old_html, new_html) = self.change_pair(old, new)?;
                        let paired = old.is_some() && new.is_some();
                        left.push_str(&change_cell(Side::Old, old, old_html, paired));
                        right.push_str(&change_cell(Side::New, new, new_html, paired));
                    }
                }
            }
        }

        let sync = if self.config.synchronised_scroll {
            r#" data-sync-scroll="true""#
        } else {
            ""
        };
        Ok(format!(
            r#"<div class="d2h-files-diff"{}><div class="d2h-file-side-diff">{}</div><div class="d2h-file-side-diff">{}</div></div>"#,
            sync,
            diff_table(&left),
            diff_table(&right)
        ))
    }

    fn line_by_line(&self, hunks: &[Hunk]) -> Result<String, RenderError> {
        let mut rows = String::new();

        for hunk in hunks {
            for row in hunk_rows(hunk, self.config.matching) {
                match row {
                    Row::Info(text) => {
                        rows.push_str(&unified_cell("d2h-info", None, None, "", &escape_html(text)));
                    }
                    Row::Context(line) => {
                        let code = self.code(line)?;
                        rows.push_str(&unified_cell("d2h-cntx", line.old_line, line.new_line, " ", &code));
                    }
                    Row::Change { old, new } => {
                        let (old_html, new_html) = self.change_pair(old, new)?;
                        let paired = old.is_some() && new.is_some();
                        let change = if paired { " d2h-change" } else { "" };
                        if let Some(line) = old {
                            let class = format!("d2h-del{}", change);
                            rows.push_str(&unified_cell(&class, line.old_line, None, "-", &old_html));
                        }
                        if let Some(line) = new {
                            let class = format!("d2h-ins{}", change);
                            rows.push_str(&unified_cell(&class, None, line.new_line, "+", &new_html));
                        }
                    }
                }
            }
        }

        Ok(format!(r#"<div class="d2h-file-diff">{}</div>"#, diff_table(&rows)))
    }

    // Inline-diffed html for a pair, or plain code for a lone line
    fn change_pair(
        &self,
        old: Option<&DiffLine>,
        new: Option<&DiffLine>,
    ) -> Result<(String, String), RenderError> {
        match (old, new) {
            (Some(old), Some(new)) => Ok(inline_diff(&old.content, &new.content, self.config.diff_style)),
            (Some(old), None) => Ok((self.code(old)?, String::new())),
            (None, Some(new)) => Ok((String::new(), self.code(new)?)),
            (None, None) => Ok((String::new(), String::new())),
        }
    }

    fn code(&self, line: &DiffLine) -> Result<String, RenderError> {
        if self.config.highlight {
            self.highlighter.highlight_line(self.path, &line.content)
        } else {
            Ok(escape_html(&line.content))
        }
    }
}

fn number(line: Option<u32>) -> String {
    line.map(|n| n.to_string()).unwrap_or_default()
}

fn diff_table(rows: &str) -> String {
    format!(
        r#"<div class="d2h-code-wrapper"><table class="d2h-diff-table"><tbody class="d2h-diff-tbody">{}</tbody></table></div>"#,
        rows
    )
}

fn side_cell(class: &str, number: &str, code: &str, prefix: &str) -> String {
    format!(
        concat!(
            r#"<tr><td class="d2h-code-side-linenumber {class}">{number}</td>"#,
            r#"<td class="{class}"><div class="d2h-code-side-line">"#,
            r#"<span class="d2h-code-line-prefix">{prefix}</span>"#,
            r#"<span class="d2h-code-line-ctn">{code}</span></div></td></tr>"#
        ),
        class = class,
        number = number,
        prefix = prefix,
        code = code
    )
}

fn change_cell(side: Side, line: Option<&DiffLine>, code: String, paired: bool) -> String {
    let Some(line) = line else {
        return side_cell("d2h-cntx d2h-emptyplaceholder", "", "", "");
    };
    let (base, prefix, number_value) = match side {
        Side::Old => ("d2h-del", "-", line.old_line),
        Side::New => ("d2h-ins", "+", line.new_line),
    };
    let class = if paired {
        format!("{} d2h-change", base)
    } else {
        base.to_string()
    };
    side_cell(&class, &number(number_value), &code, prefix)
}

fn unified_cell(class: &str, old: Option<u32>, new: Option<u32>, prefix: &str, code: &str) -> String {
    format!(
        concat!(
            r#"<tr><td class="d2h-code-linenumber {class}">"#,
            r#"<div class="line-num1">{old}</div><div class="line-num2">{new}</div></td>"#,
            r#"<td class="{class}"><div class="d2h-code-line">"#,
            r#"<span class="d2h-code-line-prefix">{prefix}</span>"#,
            r#"<span class="d2h-code-line-ctn">{code}</span></div></td></tr>"#
        ),
        class = class,
        old = number(old),
        new = number(new),
        prefix = prefix,
        code = code
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SizeClass;
    use pretty_assertions::assert_eq;
    use scraper::{Html, Selector};

    const PATCH: &str = "diff --git a/src/app.rs b/src/app.rs\n--- a/src/app.rs\n+++ b/src/app.rs\n@@ -1,3 +1,3 @@\n fn main() {\n-    let total = 1;\n+    let total = 2;\n }\n";

    fn select_count(html: &str, selector: &str) -> usize {
        let document = Html::parse_fragment(html);
        let selector = Selector::parse(selector).unwrap();
        document.select(&selector).count()
    }

    fn paint_with(size: SizeClass) -> PaintedDiff {
        let highlighter = Highlighter::new("InspiredGitHub");
        paint(PATCH, &RenderConfig::for_size(size), &highlighter).unwrap()
    }

    #[test]
    fn test_small_patch_is_side_by_side() {
        let painted = paint_with(SizeClass::Small);
        assert_eq!(painted.files.len(), 1);

        let html = &painted.files[0].html;
        assert_eq!(select_count(html, ".d2h-file-side-diff"), 2);
        assert_eq!(select_count(html, "[data-sync-scroll]"), 1);
        assert_eq!(select_count(html, "td.d2h-del.d2h-change"), 2);
        assert_eq!(select_count(html, "del"), 1);
        assert_eq!(select_count(html, "ins"), 1);
        assert_eq!(painted.files[0].language, "rust");
    }

    #[test]
    fn test_large_patch_is_line_by_line() {
        let painted = paint_with(SizeClass::Large);
        let html = &painted.files[0].html;
        assert_eq!(select_count(html, ".d2h-file-side-diff"), 0);
        assert_eq!(select_count(html, ".d2h-file-diff"), 1);
        assert_eq!(select_count(html, "[data-sync-scroll]"), 0);
        // word granularity marks the whole "1;" / "2;" token
        assert!(html.contains("<del>1;</del>"));
        assert!(html.contains("<ins>2;</ins>"));
    }

    #[test]
    fn test_file_list_links_to_files() {
        let painted = paint_with(SizeClass::Small);
        let list = painted.file_list.clone().unwrap();
        assert_eq!(select_count(&list, "a[href='#d2h-file-0']"), 1);
        assert!(list.contains("+1"));
        assert!(list.contains("-1"));

        let blocks = painted.into_blocks();
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_fix_up_is_idempotent() {
        let mut painted = paint_with(SizeClass::Small);
        tag_languages(&mut painted);
        normalize_change_classes(&mut painted);
        let once = painted.clone();

        tag_languages(&mut painted);
        normalize_change_classes(&mut painted);
        assert_eq!(painted, once);

        let html = &painted.files[0].html;
        assert!(html.starts_with(r#"<div class="d2h-file-wrapper" id="d2h-file-0" data-lang="rust">"#));
        assert_eq!(select_count(html, "td.d2h-ins.d2h-change:not(.d2h-code-side-linenumber)"), 0);
        assert_eq!(select_count(html, "td.d2h-code-side-linenumber.d2h-ins.d2h-change"), 1);
        assert_eq!(select_count(html, "td.d2h-change"), 4);
    }

    #[test]
    fn test_similar_lines_are_paired_across_a_run() {
        let old = DiffLine {
            kind: LineKind::Deletion,
            content: "let total = compute(1);".to_string(),
            old_line: Some(1),
            new_line: None,
        };
        let unrelated = DiffLine {
            kind: LineKind::Addition,
            content: "}}}}".to_string(),
            old_line: None,
            new_line: Some(1),
        };
        let similar_line = DiffLine {
            content: "let total = compute(2);".to_string(),
            new_line: Some(2),
            ..unrelated.clone()
        };

        let pairs = pair_lines(&[&old], &[&unrelated, &similar_line], LineMatching::Lines);
        assert_eq!(pairs, vec![(None, Some(0)), (Some(0), Some(1))]);

        let positional = pair_lines(&[&old], &[&unrelated, &similar_line], LineMatching::None);
        assert_eq!(positional, vec![(Some(0), Some(0)), (None, Some(1))]);
    }

    #[test]
    fn test_char_inline_diff_merges_runs() {
        let (old, new) = inline_diff("value = 10", "value = 42", DiffStyle::Char);
        assert_eq!(old, "value = <del>10</del>");
        assert_eq!(new, "value = <ins>42</ins>");
    }

    #[test]
    fn test_empty_patch_renders_info_block() {
        let highlighter = Highlighter::new("InspiredGitHub");
        let painted = paint("not a patch", &RenderConfig::for_size(SizeClass::Small), &highlighter).unwrap();
        let blocks = painted.into_blocks();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("No changes found"));
    }
}
