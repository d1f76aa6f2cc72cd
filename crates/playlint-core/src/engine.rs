//! Matching engine: drives registered rules over documents and trees.

use std::collections::{BTreeSet, HashSet};
use std::panic::{self, AssertUnwindSafe};

use crate::config::Config;
use crate::context::{DocumentContext, LineContext, NodeContext};
use crate::document::{DocumentId, DocumentRegistry, SourceDocument};
use crate::ids;
use crate::node::{Forest, Node};
use crate::registry::{RuleEntry, RuleSet};
use crate::rule::{Finding, Matcher};
use crate::types::{Location, MatchCandidate, Severity};

/// Which registered rules run.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    only: Option<BTreeSet<String>>,
    disabled: BTreeSet<String>,
}

impl Selection {
    /// Every registered rule.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Rules enabled by the configuration: `rules.<id>.enabled = false`
    /// turns a rule off and opt-in rules need an `enable_list` entry.
    #[must_use]
    pub fn from_config(rules: &RuleSet, config: &Config) -> Self {
        let disabled = rules
            .all()
            .filter(|entry| {
                let id = entry.id();
                let opt_in = entry.descriptor().has_tag(ids::OPT_IN_TAG)
                    && !config
                        .enable_list
                        .iter()
                        .any(|name| rules.selects(name, id, None));
                opt_in || !config.is_rule_enabled(id)
            })
            .map(|entry| entry.id().to_string())
            .collect();
        Self {
            only: None,
            disabled,
        }
    }

    /// Restricts the selection to `ids`.
    #[must_use]
    pub fn only(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.only = Some(ids.into_iter().collect());
        self
    }

    /// Returns true if `rule_id` runs.
    #[must_use]
    pub fn includes(&self, rule_id: &str) -> bool {
        !self.disabled.contains(rule_id)
            && self.only.as_ref().map_or(true, |only| only.contains(rule_id))
    }
}

/// Drives rules and turns their findings into located candidates.
///
/// A rule that panics yields one `internal-error` candidate and is skipped
/// for the rest of that document; other rules keep running.
#[derive(Debug)]
pub struct Engine<'a> {
    rules: &'a RuleSet,
    selection: Selection,
}

impl<'a> Engine<'a> {
    /// Creates an engine over `rules`.
    #[must_use]
    pub fn new(rules: &'a RuleSet, selection: Selection) -> Self {
        Self { rules, selection }
    }

    fn active(&self) -> impl Iterator<Item = (&'a RuleEntry, &'a Matcher)> + '_ {
        self.rules
            .all()
            .filter(|entry| self.selection.includes(entry.id()))
            .filter_map(|entry| entry.matcher().map(|m| (entry, m)))
    }

    /// Runs line and document rules over `document`.
    #[must_use]
    pub fn check_document(&self, document: &SourceDocument) -> Vec<MatchCandidate> {
        let mut out = Vec::new();
        for (entry, matcher) in self.active() {
            match matcher {
                Matcher::Line(rule) => {
                    for line in 1..=document.line_count() {
                        let ctx = LineContext::new(document, line);
                        match guarded(|| rule.check_line(&ctx)) {
                            Ok(findings) => out.extend(findings.into_iter().map(|f| {
                                locate(entry, f, document, None, || document.line_location(line))
                            })),
                            Err(message) => {
                                out.push(internal_error(entry, document, document.line_location(line), &message));
                                break;
                            }
                        }
                    }
                }
                Matcher::Document(rule) => {
                    let ctx = DocumentContext::new(document);
                    match guarded(|| rule.check_document(&ctx)) {
                        Ok(findings) => out.extend(findings.into_iter().map(|f| {
                            locate(entry, f, document, None, || document.location(0..0))
                        })),
                        Err(message) => {
                            out.push(internal_error(entry, document, document.location(0..0), &message));
                        }
                    }
                }
                Matcher::Node(_) => {}
            }
        }
        out
    }

    /// Runs node rules over every node of a resolved tree, in pre-order.
    #[must_use]
    pub fn check_forest(&self, forest: &Forest, documents: &DocumentRegistry) -> Vec<MatchCandidate> {
        let order = forest.preorder();
        let mut out = Vec::new();
        for (entry, matcher) in self.active() {
            let Matcher::Node(rule) = matcher else {
                continue;
            };
            let mut failed: HashSet<DocumentId> = HashSet::new();
            for &id in &order {
                let node = forest.node(id);
                if failed.contains(&node.span.document) {
                    continue;
                }
                let Some(document) = documents.get(node.span.document) else {
                    continue;
                };
                let ctx = NodeContext {
                    forest,
                    id,
                    document,
                };
                match guarded(|| rule.check_node(&ctx)) {
                    Ok(findings) => out.extend(findings.into_iter().map(|f| {
                        locate(entry, f, document, Some(node), || node_location(document, node))
                    })),
                    Err(message) => {
                        failed.insert(node.span.document);
                        out.push(internal_error(entry, document, node_location(document, node), &message));
                    }
                }
            }
        }
        out
    }

    /// Runs every capability against one document on its own, using the
    /// document-local tree for node rules. Used when re-checking fixes.
    #[must_use]
    pub fn check_standalone(&self, document: &SourceDocument) -> Vec<MatchCandidate> {
        let mut out = self.check_document(document);
        if let Some(tree) = document.tree() {
            let mut registry = DocumentRegistry::new();
            registry.insert(std::sync::Arc::new(document.clone()));
            out.extend(self.check_forest(tree, &registry));
        }
        out
    }
}

/// Candidate for a document that failed to parse.
#[must_use]
pub fn parse_failure_candidate(document: &SourceDocument) -> Option<MatchCandidate> {
    let failure = document.parse_failure()?;
    let line_start = document.line_range(failure.line).start;
    Some(MatchCandidate {
        rule_id: ids::PARSER_ERROR.to_string(),
        sub_tag: None,
        message: failure.message.clone(),
        location: Location::new(
            document.relative_path().to_path_buf(),
            failure.line,
            failure.column,
        )
        .with_span(line_start, document.line_range(failure.line).len()),
        document: Some(document.id()),
        node: None,
        severity: Severity::Error,
        fix: None,
    })
}

fn guarded(f: impl FnOnce() -> Vec<Finding>) -> Result<Vec<Finding>, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string())
    })
}

fn node_location(document: &SourceDocument, node: &Node) -> Location {
    let start = node.span.range.start;
    let line_end = document.line_range(node.span.start.line).end;
    document.location(start..line_end.max(start))
}

fn locate(
    entry: &RuleEntry,
    finding: Finding,
    document: &SourceDocument,
    node: Option<&Node>,
    fallback: impl FnOnce() -> Location,
) -> MatchCandidate {
    let descriptor = entry.descriptor();
    MatchCandidate {
        rule_id: descriptor.id.clone(),
        sub_tag: finding.sub_tag,
        message: finding.message,
        location: finding
            .range
            .map_or_else(fallback, |range| document.location(range)),
        document: Some(document.id()),
        node: node.map(|n| n.path.clone()),
        severity: finding.severity.unwrap_or(descriptor.default_severity),
        fix: finding.fix,
    }
}

fn internal_error(
    entry: &RuleEntry,
    document: &SourceDocument,
    location: Location,
    message: &str,
) -> MatchCandidate {
    tracing::error!(
        rule = %entry.id(),
        file = %document.relative_path().display(),
        "rule panicked: {message}"
    );
    MatchCandidate {
        rule_id: ids::INTERNAL_ERROR.to_string(),
        sub_tag: None,
        message: format!("rule '{}' failed: {message}", entry.id()),
        location,
        document: Some(document.id()),
        node: None,
        severity: Severity::Error,
        fix: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{DocumentRule, LineRule, NodeRule, Rule};
    use std::path::PathBuf;
    use std::sync::Arc;

    struct Trailing;
    impl Rule for Trailing {
        fn id(&self) -> &'static str {
            "trailing"
        }
    }
    impl LineRule for Trailing {
        fn check_line(&self, ctx: &LineContext<'_>) -> Vec<Finding> {
            if ctx.text.ends_with(' ') {
                vec![Finding::new("trailing").at(ctx.range.end - 1..ctx.range.end)]
            } else {
                vec![]
            }
        }
    }

    struct Panicky;
    impl Rule for Panicky {
        fn id(&self) -> &'static str {
            "panicky"
        }
    }
    impl NodeRule for Panicky {
        fn check_node(&self, _ctx: &NodeContext<'_>) -> Vec<Finding> {
            panic!("boom")
        }
    }

    struct Unnamed;
    impl Rule for Unnamed {
        fn id(&self) -> &'static str {
            "unnamed"
        }
        fn default_severity(&self) -> Severity {
            Severity::Warning
        }
    }
    impl NodeRule for Unnamed {
        fn check_node(&self, ctx: &NodeContext<'_>) -> Vec<Finding> {
            if ctx.node().kind.is_task_like() && ctx.node().name().is_none() {
                vec![Finding::new("unnamed task")]
            } else {
                vec![]
            }
        }
    }

    struct Empty;
    impl Rule for Empty {
        fn id(&self) -> &'static str {
            "empty"
        }
    }
    impl DocumentRule for Empty {
        fn check_document(&self, ctx: &DocumentContext<'_>) -> Vec<Finding> {
            if ctx.text().trim().is_empty() {
                vec![Finding::new("empty")]
            } else {
                vec![]
            }
        }
    }

    fn doc(text: &str) -> SourceDocument {
        SourceDocument::parse(
            DocumentId(3),
            PathBuf::from("/p/tasks.yml"),
            PathBuf::from("tasks.yml"),
            text.to_string(),
        )
    }

    fn rules() -> RuleSet {
        let mut set = RuleSet::new();
        set.register(Matcher::line(Trailing)).unwrap();
        set.register(Matcher::node(Panicky)).unwrap();
        set.register(Matcher::node(Unnamed)).unwrap();
        set.register(Matcher::document(Empty)).unwrap();
        set
    }

    #[test]
    fn line_rules_run_on_unparseable_documents() {
        let d = doc("a: [ \n");
        let set = rules();
        let engine = Engine::new(&set, Selection::all());
        let found = engine.check_document(&d);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule_id, "trailing");
        assert_eq!(found[0].location.column, 5);
        assert!(parse_failure_candidate(&d).is_some());
    }

    #[test]
    fn panicking_rule_reports_once_per_document_and_others_continue() {
        let d = Arc::new(doc("- debug: {}\n- name: x\n  debug: {}\n"));
        let mut registry = DocumentRegistry::new();
        registry.insert(Arc::clone(&d));
        let set = rules();
        let engine = Engine::new(&set, Selection::all());
        let found = engine.check_forest(d.tree().unwrap(), &registry);
        let internal: Vec<_> = found.iter().filter(|c| c.rule_id == ids::INTERNAL_ERROR).collect();
        assert_eq!(internal.len(), 1);
        assert!(internal[0].message.contains("boom"));
        let unnamed: Vec<_> = found.iter().filter(|c| c.rule_id == "unnamed").collect();
        assert_eq!(unnamed.len(), 1);
        assert_eq!(unnamed[0].location.line, 1);
        assert_eq!(unnamed[0].severity, Severity::Warning);
        assert_eq!(unnamed[0].node.as_ref().map(ToString::to_string).as_deref(), Some("0"));
    }

    #[test]
    fn selection_filters_rules() {
        let d = doc("");
        let set = rules();
        let all = Engine::new(&set, Selection::all()).check_document(&d);
        assert_eq!(all.len(), 1);
        let none = Engine::new(&set, Selection::all().only(["trailing".to_string()])).check_document(&d);
        assert!(none.is_empty());

        let mut config = Config::default();
        config.rules.insert(
            "empty".into(),
            crate::config::RuleConfig {
                enabled: Some(false),
                ..Default::default()
            },
        );
        let selection = Selection::from_config(&set, &config);
        assert!(!selection.includes("empty"));
        assert!(selection.includes("trailing"));
    }
}
