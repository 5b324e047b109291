// src/render/highlight.rs
// =============================================================================
// Syntax highlighting of single diff lines, using syntect.
//
// The syntax is picked from the changed file's extension. Lines are
// highlighted one at a time with a fresh parser state: a diff shows isolated
// fragments of a file, so there is no reliable state to carry between them.
// =============================================================================

use std::path::Path;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};

use super::RenderError;

const FALLBACK_THEME: &str = "InspiredGitHub";
const PLAIN_LANGUAGE: &str = "plaintext";

pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
    // every line fails to highlight (tests only)
    #[cfg(test)]
    broken: bool,
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("theme", &self.theme.name)
            .finish()
    }
}

impl Highlighter {
    // Loads the bundled syntaxes and the named theme
    //
    // Unknown theme names fall back to InspiredGitHub (a light theme that
    // suits the white page background).
    pub fn new(theme_name: &str) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = match themes.remove(theme_name) {
            Some(theme) => theme,
            None => {
                log::warn!("unknown highlight theme '{}', using {}", theme_name, FALLBACK_THEME);
                themes.remove(FALLBACK_THEME).unwrap_or_default()
            }
        };

        Self {
            syntax_set: SyntaxSet::load_defaults_nonewlines(),
            theme,
            #[cfg(test)]
            broken: false,
        }
    }

    // A highlighter that errors on every line
    #[cfg(test)]
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::new(FALLBACK_THEME)
        }
    }

    // Language annotation for a file, e.g. "rust", or "plaintext"
    pub fn language_for(&self, path: &str) -> String {
        match self.syntax_for(path) {
            Some(syntax) => syntax.name.to_lowercase(),
            None => PLAIN_LANGUAGE.to_string(),
        }
    }

    // Highlights one line of code into HTML spans
    //
    // The output is already escaped; files with no known syntax come back as
    // plain escaped text wrapped in a single span.
    pub fn highlight_line(&self, path: &str, line: &str) -> Result<String, RenderError> {
        #[cfg(test)]
        if self.broken {
            return Err(RenderError::Highlight(format!("cannot highlight {}", path)));
        }

        let syntax = self
            .syntax_for(path)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let regions = highlighter
            .highlight_line(line, &self.syntax_set)
            .map_err(|e| RenderError::Highlight(e.to_string()))?;

        styled_line_to_highlighted_html(&regions[..], IncludeBackground::No)
            .map_err(|e| RenderError::Highlight(e.to_string()))
    }

    fn syntax_for(&self, path: &str) -> Option<&SyntaxReference> {
        let extension = Path::new(path).extension()?.to_str()?;
        self.syntax_set
            .find_syntax_by_extension(extension)
            .filter(|syntax| syntax.name != "Plain Text")
    }
}
