//! Rule requiring command-style tasks to declare when they change something.
//!
//! # Rationale
//!
//! `command`, `shell` and `raw` always report "changed". Unless the task
//! says otherwise with `changed_when`, or guards itself with `creates` /
//! `removes`, every run looks like it modified the host.

use playlint_core::{Finding, NodeContext, NodeRule, Rule, Severity};

/// Rule id for no-changed-when.
pub const NAME: &str = "no-changed-when";

/// Legacy numeric id.
pub const ALIAS: &str = "301";

const COMMAND_MODULES: &[&str] = &[
    "command",
    "shell",
    "raw",
    "ansible.builtin.command",
    "ansible.builtin.shell",
    "ansible.builtin.raw",
    "ansible.legacy.command",
    "ansible.legacy.shell",
    "ansible.legacy.raw",
];

const GUARD_ARGS: &[&str] = &["creates", "removes"];

/// Requires `changed_when` (or a `creates`/`removes` guard) on command tasks.
#[derive(Debug, Clone)]
pub struct NoChangedWhen {
    /// Custom severity.
    pub severity: Severity,
}

impl Default for NoChangedWhen {
    fn default() -> Self {
        Self::new()
    }
}

impl NoChangedWhen {
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

impl Rule for NoChangedWhen {
    fn id(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Commands should not change things if nothing needs doing"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &[ALIAS]
    }

    fn tags(&self) -> &'static [&'static str] {
        &["command-shell", "idempotency"]
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn profile(&self) -> Option<&'static str> {
        Some("shared")
    }
}

impl NodeRule for NoChangedWhen {
    fn check_node(&self, ctx: &NodeContext<'_>) -> Vec<Finding> {
        let node = ctx.node();
        let Some(action) = node.action() else {
            return Vec::new();
        };
        if !COMMAND_MODULES.contains(&action.as_str()) {
            return Vec::new();
        }
        if node.attr("changed_when").is_some() {
            return Vec::new();
        }
        let guarded = |value: &serde_yaml::Value| {
            value
                .as_mapping()
                .is_some_and(|m| GUARD_ARGS.iter().any(|arg| m.contains_key(*arg)))
        };
        let module_args = node.action_entry().map(|(_, attr)| &attr.value);
        if module_args.is_some_and(guarded) || node.attr("args").is_some_and(|a| guarded(&a.value)) {
            return Vec::new();
        }
        // Free-form `cmd creates=/path` arguments.
        if let Some(serde_yaml::Value::String(line)) = module_args {
            if line
                .split_whitespace()
                .any(|word| GUARD_ARGS.iter().any(|arg| word.starts_with(&format!("{arg}="))))
            {
                return Vec::new();
            }
        }
        vec![Finding::new("Commands should not change things if nothing needs doing.")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::node_findings;

    fn lines(text: &str) -> Vec<usize> {
        node_findings(NoChangedWhen::new(), text)
            .iter()
            .map(|f| f.location.line)
            .collect()
    }

    #[test]
    fn detects_unguarded_commands() {
        let text = "- name: A\n  command: whoami\n- name: B\n  ansible.builtin.shell: ls\n- name: C\n  debug: {}\n";
        assert_eq!(lines(text), vec![1, 3]);
    }

    #[test]
    fn changed_when_and_guards_satisfy_the_rule() {
        let text = "\
- name: A
  command: whoami
  changed_when: false
- name: B
  shell: make
  args:
    creates: /tmp/out
- name: C
  command:
    cmd: make
    removes: /tmp/in
- name: D
  command: make creates=/tmp/out
";
        assert!(lines(text).is_empty());
    }

    #[test]
    fn handlers_are_checked() {
        let text = "- hosts: all\n  handlers:\n    - name: Reload\n      raw: reboot\n";
        assert_eq!(lines(text), vec![3]);
    }
}
