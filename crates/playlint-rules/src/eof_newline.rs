//! Rule checking how a document ends.
//!
//! A non-empty document must end with exactly one newline. A missing
//! newline is reported without sub-tag; blank lines after the last content
//! line are reported as `eof-newline[empty-lines]`. Both are fixable.

use playlint_core::{DocumentContext, DocumentRule, Edit, Finding, Fix, Rule};

/// Rule id for eof-newline.
pub const NAME: &str = "eof-newline";

/// Checks the end of each document.
#[derive(Debug, Clone, Default)]
pub struct EofNewline;

impl EofNewline {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for EofNewline {
    fn id(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Documents should end with a single newline"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["formatting", "yaml"]
    }

    fn profile(&self) -> Option<&'static str> {
        Some("basic")
    }

    fn fixable(&self) -> bool {
        true
    }
}

impl DocumentRule for EofNewline {
    fn check_document(&self, ctx: &DocumentContext<'_>) -> Vec<Finding> {
        let text = ctx.text();
        if text.is_empty() {
            return Vec::new();
        }
        if !text.ends_with('\n') {
            let end = text.len();
            return vec![Finding::new("no new line character at the end of file")
                .at(end..end)
                .with_fix(Fix::new("add final newline", Edit::insert(end, "\n")))];
        }

        let content_end = text.trim_end_matches(['\n', '\r']).len();
        if content_end == 0 {
            return Vec::new();
        }
        let tail = &text[content_end..];
        let first_break = if tail.starts_with("\r\n") { 2 } else { 1 };
        if tail.len() <= first_break {
            return Vec::new();
        }
        let extra = content_end + first_break..text.len();
        vec![Finding::new("too many blank lines at the end of file")
            .sub_tag("empty-lines")
            .at(extra.clone())
            .with_fix(Fix::new("remove trailing blank lines", Edit::delete(extra)))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixed, text_findings};
    use playlint_core::Matcher;

    fn tags(text: &str) -> Vec<String> {
        text_findings(Matcher::document(EofNewline::new()), text)
            .into_iter()
            .map(|c| c.tag())
            .collect()
    }

    #[test]
    fn accepts_single_final_newline() {
        assert!(tags("a: 1\n").is_empty());
        assert!(tags("").is_empty());
        assert!(tags("\n\n").is_empty());
    }

    #[test]
    fn detects_missing_newline() {
        let found = text_findings(Matcher::document(EofNewline::new()), "a: 1\nb: 2");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag(), NAME);
        assert_eq!(found[0].location.line, 2);
    }

    #[test]
    fn detects_blank_lines_at_end() {
        assert_eq!(tags("a: 1\n\n\n"), vec!["eof-newline[empty-lines]".to_string()]);
    }

    #[test]
    fn fixes_both_endings() {
        let rule = || Matcher::document(EofNewline::new());
        assert_eq!(fixed(rule(), "a: 1"), "a: 1\n");
        assert_eq!(fixed(rule(), "a: 1\r\n\r\n\n"), "a: 1\r\n");
    }
}
