//! Rule requiring every task and handler to carry a `name`.
//!
//! # Rationale
//!
//! Task names show up in run output and make failures traceable. Unnamed
//! tasks print as their module invocation, which says little about intent.
//!
//! # Suppression
//!
//! - `# noqa: name-missing` (or the legacy `# noqa: 502`) on the task line

use playlint_core::{Finding, NodeContext, NodeRule, Rule, Severity};

/// Rule id for name-missing.
pub const NAME: &str = "name-missing";

/// Legacy numeric id.
pub const ALIAS: &str = "502";

/// Actions that are not expected to be named.
const EXEMPT_ACTIONS: &[&str] = &["meta", "ansible.builtin.meta"];

/// Requires a `name` on tasks and handlers.
#[derive(Debug, Clone)]
pub struct NameMissing {
    /// Custom severity.
    pub severity: Severity,
}

impl Default for NameMissing {
    fn default() -> Self {
        Self::new()
    }
}

impl NameMissing {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Error,
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl Rule for NameMissing {
    fn id(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "All tasks and handlers should be named"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &[ALIAS]
    }

    fn tags(&self) -> &'static [&'static str] {
        &["idiom"]
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn profile(&self) -> Option<&'static str> {
        Some("basic")
    }
}

impl NodeRule for NameMissing {
    fn check_node(&self, ctx: &NodeContext<'_>) -> Vec<Finding> {
        let node = ctx.node();
        if !node.kind.is_task_like() || node.attr("name").is_some() {
            return Vec::new();
        }
        if node
            .action()
            .is_some_and(|action| EXEMPT_ACTIONS.contains(&action.as_str()))
        {
            return Vec::new();
        }
        vec![Finding::new("All tasks should be named.")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::node_findings;

    #[test]
    fn detects_unnamed_task() {
        let found = node_findings(NameMissing::new(), "- debug:\n    msg: hi\n- name: Ok\n  ping: {}\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location.line, 1);
        assert_eq!(found[0].rule_id, NAME);
    }

    #[test]
    fn handlers_count_and_meta_is_exempt() {
        let text = "- hosts: all\n  handlers:\n    - service:\n        name: x\n  tasks:\n    - meta: flush_handlers\n";
        let found = node_findings(NameMissing::new(), text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location.line, 3);
    }

    #[test]
    fn plays_and_blocks_are_not_tasks() {
        let text = "- hosts: all\n  tasks:\n    - block:\n        - name: Inner\n          ping: {}\n";
        assert!(node_findings(NameMissing::new(), text).is_empty());
    }
}
