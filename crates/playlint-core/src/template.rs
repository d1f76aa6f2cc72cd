//! Scanner for `{{ }}`, `{% %}` and `{# #}` template expressions.

use std::ops::Range;

/// Kind of a template expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    /// `{{ expr }}`
    Variable,
    /// `{% stmt %}`
    Statement,
    /// `{# comment #}`
    Comment,
}

/// One expression found in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression<'a> {
    /// Kind.
    pub kind: ExpressionKind,
    /// Range of the whole expression, delimiters included.
    pub range: Range<usize>,
    /// Text between the delimiters, whitespace-control dashes excluded.
    pub inner: &'a str,
}

impl Expression<'_> {
    /// Returns true if the inner text is wrapped in exactly one space on
    /// each side (`{{ x }}`). Multi-line expressions are not judged.
    #[must_use]
    pub fn is_well_spaced(&self) -> bool {
        if self.inner.contains('\n') || self.inner.trim().is_empty() {
            return true;
        }
        let leading = self.inner.len() - self.inner.trim_start().len();
        let trailing = self.inner.len() - self.inner.trim_end().len();
        leading == 1 && trailing == 1 && self.inner.starts_with(' ') && self.inner.ends_with(' ')
    }
}

/// Finds every expression in `text`, in order. Unterminated openers are
/// ignored.
#[must_use]
pub fn expressions(text: &str) -> Vec<Expression<'_>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }
        let (kind, close) = match bytes[i + 1] {
            b'{' => (ExpressionKind::Variable, "}}"),
            b'%' => (ExpressionKind::Statement, "%}"),
            b'#' => (ExpressionKind::Comment, "#}"),
            _ => {
                i += 1;
                continue;
            }
        };
        let body_start = i + 2;
        let Some(end) = find_close(text, body_start, close) else {
            i += 2;
            continue;
        };
        let mut inner_start = body_start;
        let mut inner_end = end;
        if bytes.get(inner_start) == Some(&b'-') || bytes.get(inner_start) == Some(&b'+') {
            inner_start += 1;
        }
        if inner_end > inner_start && bytes[inner_end - 1] == b'-' {
            inner_end -= 1;
        }
        out.push(Expression {
            kind,
            range: i..end + 2,
            inner: &text[inner_start..inner_end],
        });
        i = end + 2;
    }
    out
}

/// Finds `close` after `from`, skipping quoted strings.
fn find_close(text: &str, from: usize, close: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'\'' || b == b'"' => quote = Some(b),
            None if text[i..].starts_with(close) => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

/// Returns true if `text` contains a template expression.
#[must_use]
pub fn is_templated(text: &str) -> bool {
    !expressions(text).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_all_kinds() {
        let text = "a {{ x }} b {% if y %} c {# note #}";
        let found = expressions(text);
        let kinds: Vec<_> = found.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ExpressionKind::Variable,
                ExpressionKind::Statement,
                ExpressionKind::Comment
            ]
        );
        assert_eq!(&text[found[0].range.clone()], "{{ x }}");
        assert_eq!(found[1].inner, " if y ");
    }

    #[test]
    fn closing_braces_inside_strings_are_skipped() {
        let text = "{{ '}}' | default('x') }}";
        let found = expressions(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range, 0..text.len());
    }

    #[test]
    fn spacing() {
        assert!(expressions("{{ x }}")[0].is_well_spaced());
        assert!(!expressions("{{x}}")[0].is_well_spaced());
        assert!(!expressions("{{  x }}")[0].is_well_spaced());
        assert!(expressions("{{- x -}}")[0].is_well_spaced());
    }

    #[test]
    fn templated_detection() {
        assert!(is_templated("{{ item }}.yml"));
        assert!(!is_templated("tasks/main.yml"));
        assert!(!is_templated("{{ unterminated"));
    }
}
