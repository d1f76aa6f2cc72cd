//! Rule requiring fully-qualified names for builtin actions.
//!
//! `fqcn[action-core]`: `copy:` should be written `ansible.builtin.copy:`.
//! Fixable by rewriting the action key in place.

use playlint_core::{Edit, Finding, Fix, NodeContext, NodeRule, Rule, Severity};

/// Rule id for fqcn.
pub const NAME: &str = "fqcn";

const BUILTIN_PREFIX: &str = "ansible.builtin.";

/// Short names of the builtin modules.
const BUILTIN_MODULES: &[&str] = &[
    "add_host",
    "apt",
    "apt_key",
    "apt_repository",
    "assemble",
    "assert",
    "async_status",
    "blockinfile",
    "command",
    "copy",
    "cron",
    "debconf",
    "debug",
    "dnf",
    "dpkg_selections",
    "expect",
    "fail",
    "fetch",
    "file",
    "find",
    "gather_facts",
    "get_url",
    "getent",
    "git",
    "group",
    "group_by",
    "hostname",
    "import_playbook",
    "import_role",
    "import_tasks",
    "include_role",
    "include_tasks",
    "include_vars",
    "iptables",
    "known_hosts",
    "lineinfile",
    "meta",
    "package",
    "package_facts",
    "pause",
    "ping",
    "pip",
    "raw",
    "reboot",
    "replace",
    "rpm_key",
    "script",
    "service",
    "service_facts",
    "set_fact",
    "set_stats",
    "setup",
    "shell",
    "slurp",
    "stat",
    "subversion",
    "systemd",
    "systemd_service",
    "sysvinit",
    "tempfile",
    "template",
    "unarchive",
    "uri",
    "user",
    "validate_argument_spec",
    "wait_for",
    "wait_for_connection",
    "yum",
    "yum_repository",
];

/// Requires builtin actions to use their fully-qualified name.
#[derive(Debug, Clone, Default)]
pub struct Fqcn;

impl Fqcn {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for Fqcn {
    fn id(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Use FQCN for builtin actions"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["formatting"]
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn profile(&self) -> Option<&'static str> {
        Some("production")
    }

    fn fixable(&self) -> bool {
        true
    }
}

impl NodeRule for Fqcn {
    fn check_node(&self, ctx: &NodeContext<'_>) -> Vec<Finding> {
        let Some((key, attr)) = ctx.node().action_entry() else {
            return Vec::new();
        };
        if !BUILTIN_MODULES.contains(&key) {
            return Vec::new();
        }
        let wanted = format!("{BUILTIN_PREFIX}{key}");
        let mut finding = Finding::new(format!(
            "Use FQCN for builtin module actions ({key})."
        ))
        .sub_tag("action-core");
        if let Some(range) = &attr.key_range {
            if ctx.source(range.clone()) == key {
                finding = finding.at(range.clone()).with_fix(Fix::new(
                    format!("use '{wanted}'"),
                    Edit::replace(range.clone(), wanted),
                ));
            }
        }
        vec![finding]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixed, node_findings};
    use playlint_core::Matcher;

    #[test]
    fn detects_short_builtin_names() {
        let text = "- name: A\n  copy:\n    src: a\n- name: B\n  ansible.builtin.copy: {}\n- name: C\n  community.general.ufw: {}\n";
        let found = node_findings(Fqcn::new(), text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag(), "fqcn[action-core]");
        assert_eq!(found[0].location.line, 2);
        assert_eq!(found[0].location.column, 3);
    }

    #[test]
    fn fix_rewrites_the_key_only() {
        let text = "- name: A\n  copy:  # inline\n    src: a\n  when: x\n";
        assert_eq!(
            fixed(Matcher::node(Fqcn::new()), text),
            "- name: A\n  ansible.builtin.copy:  # inline\n    src: a\n  when: x\n"
        );
    }
}
