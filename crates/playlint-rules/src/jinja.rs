//! Rule checking the layout of template expressions in node attributes.
//!
//! `jinja[spacing]`: `{{x}}` and `{%if x%}` should be written with one space
//! inside each delimiter, `{{ x }}`. Whitespace-control markers (`{{-`, `-}}`)
//! are kept. Multi-line expressions are not judged.

use playlint_core::template::{expressions, Expression, ExpressionKind};
use playlint_core::{Edit, Finding, Fix, NodeContext, NodeKind, NodeRule, Rule, Severity};

/// Rule id for jinja.
pub const NAME: &str = "jinja";

/// Checks template expressions written in node attributes.
#[derive(Debug, Clone, Default)]
pub struct Jinja;

impl Jinja {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for Jinja {
    fn id(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Template expressions should be consistently spaced"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["formatting"]
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn profile(&self) -> Option<&'static str> {
        Some("basic")
    }

    fn fixable(&self) -> bool {
        true
    }
}

impl NodeRule for Jinja {
    fn check_node(&self, ctx: &NodeContext<'_>) -> Vec<Finding> {
        if matches!(ctx.node().kind, NodeKind::DocumentRoot) {
            return Vec::new();
        }
        let mut out = Vec::new();
        for attr in ctx.node().attributes.values() {
            let Some(range) = &attr.value_range else {
                continue;
            };
            let source = ctx.source(range.clone());
            for expr in expressions(source) {
                if expr.kind == ExpressionKind::Comment || expr.is_well_spaced() {
                    continue;
                }
                let original = &source[expr.range.clone()];
                let wanted = respace(original, &expr);
                let at = range.start + expr.range.start..range.start + expr.range.end;
                out.push(
                    Finding::new(format!("{original} -> {wanted}"))
                        .sub_tag("spacing")
                        .at(at.clone())
                        .with_fix(Fix::new("respace expression", Edit::replace(at, wanted))),
                );
            }
        }
        out
    }
}

/// Rebuilds an expression with single spaces inside its delimiters.
fn respace(original: &str, expr: &Expression<'_>) -> String {
    let open_len = 2 + usize::from(original[2..].starts_with(['-', '+']));
    let close_len = 2 + usize::from(original.len() >= open_len + 3 && original[..original.len() - 2].ends_with('-'));
    let open = &original[..open_len];
    let close = &original[original.len() - close_len..];
    format!("{open} {} {close}", expr.inner.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixed, node_findings};
    use playlint_core::Matcher;

    #[test]
    fn detects_unspaced_expressions() {
        let text = "- name: Show\n  debug:\n    msg: \"{{x}} and {{ y }}\"\n  when: \"{{  z }}\"\n";
        let found = node_findings(Jinja::new(), text);
        let messages: Vec<_> = found.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["{{x}} -> {{ x }}", "{{  z }} -> {{ z }}"]);
        assert!(found.iter().all(|f| f.tag() == "jinja[spacing]"));
        assert_eq!(found[0].location.line, 3);
    }

    #[test]
    fn comments_and_whitespace_control_are_respected() {
        let text = "- name: Ok\n  debug:\n    msg: \"{#x#} {{- a -}}\"\n";
        assert!(node_findings(Jinja::new(), text).is_empty());
    }

    #[test]
    fn fix_keeps_markers() {
        let text = "- name: Show\n  debug:\n    msg: \"{{-x|default('a')}} {%if y%}\"  # note\n";
        assert_eq!(
            fixed(Matcher::node(Jinja::new()), text),
            "- name: Show\n  debug:\n    msg: \"{{- x|default('a') }} {% if y %}\"  # note\n"
        );
    }
}
