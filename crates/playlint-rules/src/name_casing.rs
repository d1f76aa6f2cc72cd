//! Rule requiring names of plays, blocks, tasks and handlers to start with
//! an upper-case letter.
//!
//! Fixable: the first letter of the name is upper-cased in place, quotes
//! and the rest of the value are left untouched.

use playlint_core::{Edit, Finding, Fix, NodeContext, NodeKind, NodeRule, Rule, Severity};

/// Rule id for name-casing.
pub const NAME: &str = "name-casing";

/// Requires names to start with an upper-case letter.
#[derive(Debug, Clone, Default)]
pub struct NameCasing;

impl NameCasing {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for NameCasing {
    fn id(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Names should start with an uppercase letter"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["idiom"]
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn profile(&self) -> Option<&'static str> {
        Some("moderate")
    }

    fn fixable(&self) -> bool {
        true
    }
}

impl NodeRule for NameCasing {
    fn check_node(&self, ctx: &NodeContext<'_>) -> Vec<Finding> {
        let node = ctx.node();
        if matches!(node.kind, NodeKind::DocumentRoot | NodeKind::RoleReference) {
            return Vec::new();
        }
        let Some(attr) = node.attr("name") else {
            return Vec::new();
        };
        let Some(name) = attr.as_str() else {
            return Vec::new();
        };
        let Some(first) = name.chars().next() else {
            return Vec::new();
        };
        if !first.is_lowercase() {
            return Vec::new();
        }

        let mut finding = Finding::new(format!("Name '{name}' should start with an uppercase letter."));
        if let Some(range) = &attr.value_range {
            let source = ctx.source(range.clone());
            let skip = usize::from(source.starts_with(['"', '\'']));
            if source[skip..].starts_with(first) {
                let at = range.start + skip;
                let letter = at..at + first.len_utf8();
                finding = finding.at(range.clone()).with_fix(Fix::new(
                    "capitalize name",
                    Edit::replace(letter, first.to_uppercase().to_string()),
                ));
            }
        }
        vec![finding]
    }
}
