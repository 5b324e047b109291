// src/content/unit.rs
// =============================================================================
// ContentUnit: one selected gist file, ready (or almost ready) to render.
//
// A unit is built once per selection and never mutated. When the gist API
// hands us a truncated file, the caller fetches the raw body and builds a
// *new* unit with `with_full_body`; the pipeline refuses truncated units.
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUnit {
    body: String,
    file_name_hint: String,
    is_truncated_on_arrival: bool,
}

impl ContentUnit {
    /// A complete unit whose body can be rendered as-is
    pub fn new(body: impl Into<String>, file_name_hint: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            file_name_hint: file_name_hint.into(),
            is_truncated_on_arrival: false,
        }
    }

    /// A unit whose body is only a prefix of the real file
    pub fn truncated(body: impl Into<String>, file_name_hint: impl Into<String>) -> Self {
        Self {
            is_truncated_on_arrival: true,
            ..Self::new(body, file_name_hint)
        }
    }

    /// Replaces a truncated unit with one carrying the fully fetched body
    pub fn with_full_body(self, body: String) -> Self {
        Self::new(body, self.file_name_hint)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn file_name_hint(&self) -> &str {
        &self.file_name_hint
    }

    pub fn is_truncated_on_arrival(&self) -> bool {
        self.is_truncated_on_arrival
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_body_clears_truncation() {
        let unit = ContentUnit::truncated("diff --git a/x", "big.diff");
        assert!(unit.is_truncated_on_arrival());

        let full = unit.with_full_body("diff --git a/x b/x\n".to_string());
        assert!(!full.is_truncated_on_arrival());
        assert_eq!(full.file_name_hint(), "big.diff");
        assert_eq!(full.body(), "diff --git a/x b/x\n");
    }
}
