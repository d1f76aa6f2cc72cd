//! Helpers for running a single rule against a text in unit tests.

use playlint_core::{
    Classifier, Config, DocumentId, DocumentRegistry, Engine, FixPipeline, MatchCandidate,
    Matcher, Profiles, RuleSet, Selection, SourceDocument, SuppressionResolver,
};
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) fn document(text: &str) -> SourceDocument {
    SourceDocument::parse(
        DocumentId(0),
        PathBuf::from("/project/tasks.yml"),
        PathBuf::from("tasks.yml"),
        text.to_string(),
    )
}

fn rules(matcher: Matcher) -> RuleSet {
    let mut set = RuleSet::new();
    set.register(matcher).unwrap();
    set
}

/// Line and document rule matches.
pub(crate) fn text_findings(matcher: Matcher, text: &str) -> Vec<MatchCandidate> {
    let set = rules(matcher);
    let engine = Engine::new(&set, Selection::all());
    engine.check_document(&document(text))
}

/// Node rule matches over the document's own tree.
pub(crate) fn node_findings(rule: impl playlint_core::NodeRule + 'static, text: &str) -> Vec<MatchCandidate> {
    let set = rules(Matcher::node(rule));
    let engine = Engine::new(&set, Selection::all());
    let doc = Arc::new(document(text));
    let mut registry = DocumentRegistry::new();
    registry.insert(Arc::clone(&doc));
    doc.tree()
        .map(|forest| engine.check_forest(forest, &registry))
        .unwrap_or_default()
}

/// Text after running the fix pipeline with only `matcher` registered.
pub(crate) fn fixed(matcher: Matcher, text: &str) -> String {
    let set = rules(matcher);
    let config = Config::default();
    let profiles = Profiles::new(&[], &set);
    let selection = Selection::from_config(&set, &config);
    let resolver = SuppressionResolver::new(&set, &config, None);
    let classifier = Classifier::new(&set, &profiles, None, &config);
    let pipeline = FixPipeline::new(&set, &selection, &resolver, &classifier, &config);
    let fix = pipeline.fix_document(&document(text));
    assert!(fix.failures.is_empty(), "fix failed: {:?}", fix.failures);
    fix.fixed
}
