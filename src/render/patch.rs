// src/render/patch.rs
// =============================================================================
// A forgiving unified-diff reader for the painter.
//
// It understands what shows up in gists:
// - `diff --git a/x b/y` headers
// - `--- a/x` / `+++ b/y` headers (with /dev/null for added/deleted files)
// - `@@ -1,3 +1,4 @@ section` hunk headers, even without any file header
// - `new file mode`, `deleted file mode`, `rename from/to`, `Binary files`
// - `\ No newline at end of file`
//
// Anything it does not recognise is skipped. This is not a patch applier:
// there is no validation beyond what painting needs.
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Addition,
    Deletion,
    /// "\ No newline at end of file" and friends
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    /// Line text without the leading +, - or space
    pub content: String,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub header: String,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Deleted,
    Renamed,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub old_path: Option<String>,
    pub status: FileStatus,
    pub is_binary: bool,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            old_path: None,
            status: FileStatus::Modified,
            is_binary: false,
            hunks: Vec::new(),
        }
    }

    pub fn additions(&self) -> usize {
        self.count(LineKind::Addition)
    }

    pub fn deletions(&self) -> usize {
        self.count(LineKind::Deletion)
    }

    // Name shown in headers, "old → new" for renames
    pub fn display_name(&self) -> String {
        match &self.old_path {
            Some(old) if *old != self.path => format!("{} → {}", old, self.path),
            _ => self.path.clone(),
        }
    }

    fn count(&self, kind: LineKind) -> usize {
        self.hunks
            .iter()
            .flat_map(|hunk| &hunk.lines)
            .filter(|line| line.kind == kind)
            .count()
    }
}

// Where we are inside the current hunk
struct HunkCursor {
    old_line: u32,
    new_line: u32,
    old_remaining: u32,
    new_remaining: u32,
}

impl HunkCursor {
    fn is_open(&self) -> bool {
        self.old_remaining > 0 || self.new_remaining > 0
    }
}

#[derive(Default)]
struct Reader {
    files: Vec<FileDiff>,
    current: Option<FileDiff>,
    cursor: Option<HunkCursor>,
}

// Parses patch text into files, hunks and lines
pub fn parse_patch(text: &str) -> Vec<FileDiff> {
    let mut reader = Reader::default();
    for line in text.lines() {
        reader.feed(line);
    }
    reader.finish()
}

impl Reader {
    fn feed(&mut self, line: &str) {
        if self.cursor.as_ref().is_some_and(HunkCursor::is_open) && self.hunk_line(line) {
            return;
        }

        if let Some(note) = line.strip_prefix('\\') {
            self.push_line(LineKind::Note, note.trim_start(), None, None);
        } else if let Some(rest) = line.strip_prefix("diff --git ") {
            let (old, new) = split_git_paths(rest);
            self.start_file(FileDiff::new(new));
            if let Some(file) = self.current.as_mut() {
                file.old_path = Some(old);
            }
        } else if let Some(rest) = line.strip_prefix("--- ") {
            if self.current.as_ref().map_or(true, |file| !file.hunks.is_empty()) {
                self.start_file(FileDiff::new(""));
            }
            let path = header_path(rest);
            let file = self.file();
            if path == "/dev/null" {
                file.status = FileStatus::Added;
            } else {
                file.old_path = Some(path);
            }
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            let path = header_path(rest);
            let file = self.file();
            if path == "/dev/null" {
                file.status = FileStatus::Deleted;
                if file.path.is_empty() {
                    file.path = file.old_path.clone().unwrap_or_default();
                }
            } else {
                file.path = path;
            }
        } else if line.starts_with("@@") {
            self.start_hunk(line);
        } else if line.starts_with("new file mode") {
            self.file().status = FileStatus::Added;
        } else if line.starts_with("deleted file mode") {
            self.file().status = FileStatus::Deleted;
        } else if let Some(old) = line.strip_prefix("rename from ") {
            let file = self.file();
            file.old_path = Some(old.to_string());
            file.status = FileStatus::Renamed;
        } else if let Some(new) = line.strip_prefix("rename to ") {
            let file = self.file();
            file.path = new.to_string();
            file.status = FileStatus::Renamed;
        } else if line.starts_with("Binary files") {
            self.file().is_binary = true;
        }
    }

    // Consumes a line that belongs to the open hunk; false if it does not
    fn hunk_line(&mut self, line: &str) -> bool {
        let Some(cursor) = self.cursor.as_mut() else {
            return false;
        };

        let (kind, content) = match line.chars().next() {
            Some(' ') => (LineKind::Context, &line[1..]),
            // some editors strip the single space of empty context lines
            None => (LineKind::Context, ""),
            Some('-') if cursor.old_remaining > 0 => (LineKind::Deletion, &line[1..]),
            Some('+') if cursor.new_remaining > 0 => (LineKind::Addition, &line[1..]),
            Some('\\') => (LineKind::Note, line[1..].trim_start()),
            _ => return false,
        };

        let (old_line, new_line) = match kind {
            LineKind::Context => {
                let numbers = (Some(cursor.old_line), Some(cursor.new_line));
                cursor.old_line = cursor.old_line.saturating_add(1);
                cursor.new_line = cursor.new_line.saturating_add(1);
                cursor.old_remaining = cursor.old_remaining.saturating_sub(1);
                cursor.new_remaining = cursor.new_remaining.saturating_sub(1);
                numbers
            }
            LineKind::Deletion => {
                let numbers = (Some(cursor.old_line), None);
                cursor.old_line = cursor.old_line.saturating_add(1);
                cursor.old_remaining -= 1;
                numbers
            }
            LineKind::Addition => {
                let numbers = (None, Some(cursor.new_line));
                cursor.new_line = cursor.new_line.saturating_add(1);
                cursor.new_remaining -= 1;
                numbers
            }
            LineKind::Note => (None, None),
        };

        self.push_line(kind, content, old_line, new_line);
        true
    }

    fn start_hunk(&mut self, header: &str) {
        let (old_start, old_count, new_start, new_count) =
            parse_hunk_header(header).unwrap_or((1, u32::MAX, 1, u32::MAX));

        self.file().hunks.push(Hunk {
            header: header.to_string(),
            lines: Vec::new(),
        });
        self.cursor = Some(HunkCursor {
            old_line: old_start,
            new_line: new_start,
            old_remaining: old_count,
            new_remaining: new_count,
        });
    }

    fn push_line(&mut self, kind: LineKind, content: &str, old_line: Option<u32>, new_line: Option<u32>) {
        let Some(hunk) = self.current.as_mut().and_then(|file| file.hunks.last_mut()) else {
            return;
        };
        hunk.lines.push(DiffLine {
            kind,
            content: content.to_string(),
            old_line,
            new_line,
        });
    }

    // The file being read, creating an unnamed one for headerless hunks
    fn file(&mut self) -> &mut FileDiff {
        self.current.get_or_insert_with(|| FileDiff::new(""))
    }

    fn start_file(&mut self, file: FileDiff) {
        self.close_file();
        self.current = Some(file);
    }

    fn close_file(&mut self) {
        self.cursor = None;
        if let Some(mut file) = self.current.take() {
            if file.path.is_empty() {
                file.path = file.old_path.take().unwrap_or_else(|| "unknown".to_string());
            }
            if file.status == FileStatus::Modified
                && file.old_path.as_deref().is_some_and(|old| old != file.path)
            {
                file.status = FileStatus::Renamed;
            }
            if file.old_path.as_deref() == Some(file.path.as_str()) {
                file.old_path = None;
            }
            self.files.push(file);
        }
    }

    fn finish(mut self) -> Vec<FileDiff> {
        self.close_file();
        self.files
    }
}

// "a/src/x.rs b/src/y.rs" -> ("src/x.rs", "src/y.rs")
fn split_git_paths(rest: &str) -> (String, String) {
    match rest.rsplit_once(" b/") {
        Some((old, new)) => (clean_path(old), new.to_string()),
        None => (clean_path(rest), clean_path(rest)),
    }
}

// Path part of a ---/+++ header, without a/ b/ prefixes or a trailing timestamp
fn header_path(rest: &str) -> String {
    let path = rest.split('\t').next().unwrap_or(rest);
    clean_path(path)
}

fn clean_path(path: &str) -> String {
    let path = path.trim();
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
        .to_string()
}

// "@@ -12,3 +12,4 @@ fn main()" -> (12, 3, 12, 4)
fn parse_hunk_header(header: &str) -> Option<(u32, u32, u32, u32)> {
    let rest = header.strip_prefix("@@ -")?;
    let (ranges, _section) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(" +")?;
    let (old_start, old_count) = parse_range(old)?;
    let (new_start, new_count) = parse_range(new)?;
    Some((old_start, old_count, new_start, new_count))
}

// "12,3" -> (12, 3), "12" -> (12, 1)
fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}
