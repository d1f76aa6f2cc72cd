//! Merging, deduplication and ordering of diagnostics.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::types::{Diagnostic, LintResult};

type DedupKey = (PathBuf, usize, usize, String, Option<String>);

/// Collects diagnostics from independent workers.
#[derive(Debug, Default)]
pub struct Aggregator {
    diagnostics: Vec<Diagnostic>,
}

impl Aggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch of diagnostics.
    pub fn merge(&mut self, batch: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(batch);
    }

    /// Deduplicates, sorts and wraps the diagnostics in a result.
    #[must_use]
    pub fn finish(self, files_checked: usize, cancelled: bool) -> LintResult {
        LintResult {
            diagnostics: normalize(self.diagnostics),
            files_checked,
            cancelled,
        }
    }
}

/// Drops repeats of `(file, line, column, rule, sub-tag)` and sorts by
/// file, line, column, rule, sub-tag then message.
#[must_use]
pub fn normalize(mut diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    diagnostics.sort_by(|a, b| {
        a.location
            .file
            .cmp(&b.location.file)
            .then(a.location.line.cmp(&b.location.line))
            .then(a.location.column.cmp(&b.location.column))
            .then_with(|| a.rule_id.cmp(&b.rule_id))
            .then_with(|| a.sub_tag.cmp(&b.sub_tag))
            .then_with(|| a.message.cmp(&b.message))
    });
    let mut seen: HashSet<DedupKey> = HashSet::new();
    diagnostics.retain(|d| {
        seen.insert((
            d.location.file.clone(),
            d.location.line,
            d.location.column,
            d.rule_id.clone(),
            d.sub_tag.clone(),
        ))
    });
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, Severity};

    fn diag(file: &str, line: usize, rule: &str, message: &str) -> Diagnostic {
        Diagnostic {
            rule_id: rule.into(),
            sub_tag: None,
            severity: Severity::Error,
            location: Location::new(PathBuf::from(file), line, 1),
            message: message.into(),
            profile: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn merges_sorts_and_dedups() {
        let mut agg = Aggregator::new();
        agg.merge(vec![diag("b.yml", 1, "yaml", "x"), diag("a.yml", 3, "yaml", "x")]);
        // Same task reached through two plays.
        agg.merge(vec![
            diag("a.yml", 3, "yaml", "x"),
            diag("a.yml", 3, "fqcn", "y"),
        ]);
        let result = agg.finish(2, false);
        let order: Vec<_> = result
            .diagnostics
            .iter()
            .map(|d| (d.location.file.display().to_string(), d.rule_id.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.yml".to_string(), "fqcn".to_string()),
                ("a.yml".to_string(), "yaml".to_string()),
                ("b.yml".to_string(), "yaml".to_string()),
            ]
        );
        assert_eq!(result.files_checked, 2);
    }

    #[test]
    fn output_does_not_depend_on_merge_order() {
        let batch = vec![
            diag("a.yml", 2, "yaml", "x"),
            diag("a.yml", 1, "name-missing", "z"),
        ];
        let mut reversed = batch.clone();
        reversed.reverse();
        assert_eq!(normalize(batch), normalize(reversed));
    }
}
