//! Text-preserving autofix.
//!
//! Fixes are byte edits on the original text; everything they do not touch
//! (comments, quoting, key order, indentation) stays as written. Each pass
//! applies the fixable rules one at a time in ascending id order. After a
//! rule's edits are applied the rule is re-run; an edit that changes
//! nothing, or after which the rule reports as many findings around the
//! edited text as before, is reverted and reported as `fix-failed`. Passes
//! repeat until nothing changes or the pass limit is reached.

use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::classify::Classifier;
use crate::config::Config;
use crate::document::SourceDocument;
use crate::engine::{Engine, Selection};
use crate::ids;
use crate::registry::{RuleEntry, RuleSet};
use crate::suppression::{SuppressionResolver, Verdict};
use crate::types::{Edit, MatchCandidate, Severity};

/// Errors writing fixed documents.
#[derive(Debug, thiserror::Error)]
pub enum FixError {
    /// The fixed text could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Target path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// A fix that was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFix {
    /// Rule that proposed it.
    pub rule_id: String,
    /// Sub-tag of the finding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_tag: Option<String>,
    /// Line of the finding before the fix.
    pub line: usize,
    /// Fix description.
    pub message: String,
}

/// Outcome of fixing one document.
#[derive(Debug, Clone)]
pub struct FileFix {
    /// Resolved path.
    pub path: PathBuf,
    /// Path relative to the project root.
    pub relative: PathBuf,
    /// Text before fixing.
    pub original: String,
    /// Text after fixing.
    pub fixed: String,
    /// Fixes kept, in application order.
    pub applied: Vec<AppliedFix>,
    /// `fix-failed` candidates for reverted fixes.
    pub failures: Vec<MatchCandidate>,
    /// Passes run, the final pass that changed nothing included.
    pub passes: usize,
}

impl FileFix {
    /// Returns true if the text changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.original != self.fixed
    }
}

/// Outcome of a fix run.
#[derive(Debug, Clone, Default)]
pub struct FixReport {
    /// Per-document outcomes, ordered by relative path.
    pub files: Vec<FileFix>,
    /// True when edits were computed but not written.
    pub dry_run: bool,
}

impl FixReport {
    /// Documents whose text changed.
    pub fn changed_files(&self) -> impl Iterator<Item = &FileFix> {
        self.files.iter().filter(|f| f.changed())
    }

    /// Number of fixes kept across all documents.
    #[must_use]
    pub fn fixes_applied(&self) -> usize {
        self.files.iter().map(|f| f.applied.len()).sum()
    }

    /// Every `fix-failed` candidate.
    pub fn failures(&self) -> impl Iterator<Item = &MatchCandidate> {
        self.files.iter().flat_map(|f| f.failures.iter())
    }
}

/// Applies fixes to single documents.
#[derive(Debug)]
pub struct FixPipeline<'a> {
    rules: &'a RuleSet,
    selection: &'a Selection,
    resolver: &'a SuppressionResolver<'a>,
    classifier: &'a Classifier<'a>,
    write_list: &'a [String],
    max_passes: usize,
}

type FailureKey = (String, Option<String>, String);

impl<'a> FixPipeline<'a> {
    /// Creates a pipeline. Only rules that are selected, inside the active
    /// profile, not skipped and named by the `fix` write list may write.
    #[must_use]
    pub fn new(
        rules: &'a RuleSet,
        selection: &'a Selection,
        resolver: &'a SuppressionResolver<'a>,
        classifier: &'a Classifier<'a>,
        config: &'a Config,
    ) -> Self {
        Self {
            rules,
            selection,
            resolver,
            classifier,
            write_list: &config.fix,
            max_passes: config.max_fix_passes.max(1),
        }
    }

    fn writable(&self, entry: &RuleEntry) -> bool {
        let id = entry.id();
        self.selection.includes(id)
            && self.classifier.in_profile(id)
            && !self.resolver.skips_rule(id)
            && self
                .write_list
                .iter()
                .any(|name| name == "all" || self.rules.selects(name, id, None))
    }

    /// Rules that would write, in application order.
    #[must_use]
    pub fn writers(&self) -> Vec<&'a RuleEntry> {
        self.rules
            .fixable()
            .into_iter()
            .filter(|e| self.writable(e))
            .collect()
    }

    /// Fixes one document in memory. A document whose bytes were not valid
    /// UTF-8 is left untouched.
    #[must_use]
    pub fn fix_document(&self, document: &SourceDocument) -> FileFix {
        let writers = if document.is_lossy() {
            Vec::new()
        } else {
            self.writers()
        };
        let mut text = document.text().to_string();
        let mut applied = Vec::new();
        let mut failures = Vec::new();
        let mut failed: HashSet<FailureKey> = HashSet::new();
        let mut passes = 0;

        while passes < self.max_passes && !writers.is_empty() {
            passes += 1;
            let mut changed = false;
            for entry in &writers {
                let engine = Engine::new(self.rules, Selection::all().only([entry.id().to_string()]));
                let current = reparse(document, &text);
                let found = self.live(&engine, &current);
                let candidates: Vec<MatchCandidate> = found
                    .iter()
                    .filter(|c| c.fix.is_some() && !failed.contains(&failure_key(c, &current)))
                    .cloned()
                    .collect();
                if candidates.is_empty() {
                    continue;
                }

                let (chosen, edits) = choose(candidates);
                let attempt = apply_edits(&text, &edits);
                let remaining = if attempt == text {
                    Vec::new()
                } else {
                    self.live(&engine, &reparse(document, &attempt))
                };
                let (kept, reverted): (Vec<_>, Vec<_>) = chosen.into_iter().partition(|c| {
                    !is_noop(&text, c) && resolves(c, &found, &remaining, &edits)
                });

                let new_text = if reverted.is_empty() {
                    attempt
                } else {
                    for candidate in reverted {
                        tracing::warn!(
                            rule = %candidate.tag(),
                            file = %document.relative_path().display(),
                            line = candidate.location.line,
                            "fix did not resolve finding, reverting"
                        );
                        failed.insert(failure_key(&candidate, &current));
                        failures.push(fix_failed(candidate));
                    }
                    let mut kept_edits: Vec<Edit> = kept
                        .iter()
                        .filter_map(|c| c.fix.as_ref())
                        .flat_map(|f| f.edits.iter().cloned())
                        .collect();
                    kept_edits.sort_by_key(|e| (e.range.start, e.range.end));
                    apply_edits(&text, &kept_edits)
                };

                if new_text != text {
                    applied.extend(kept.into_iter().map(|c| AppliedFix {
                        message: c.fix.map(|f| f.message).unwrap_or_default(),
                        rule_id: c.rule_id,
                        sub_tag: c.sub_tag,
                        line: c.location.line,
                    }));
                    text = new_text;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        tracing::debug!(
            file = %document.relative_path().display(),
            passes,
            fixes = applied.len(),
            "fixed document"
        );
        FileFix {
            path: document.path().to_path_buf(),
            relative: document.relative_path().to_path_buf(),
            original: document.text().to_string(),
            fixed: text,
            applied,
            failures,
            passes,
        }
    }

    /// Candidates of the engine's rule that survive suppression.
    fn live(&self, engine: &Engine<'_>, document: &SourceDocument) -> Vec<MatchCandidate> {
        engine
            .check_standalone(document)
            .into_iter()
            .filter(|c| !matches!(self.resolver.verdict(c, Some(document)), Verdict::Suppressed(_)))
            .collect()
    }
}

/// Picks non-overlapping fixes in text order. Returns the chosen candidates
/// and their edits sorted by position.
fn choose(mut candidates: Vec<MatchCandidate>) -> (Vec<MatchCandidate>, Vec<Edit>) {
    candidates.sort_by_key(|c| {
        c.fix
            .as_ref()
            .and_then(|f| f.edits.iter().map(|e| e.range.start).min())
            .unwrap_or(usize::MAX)
    });
    let mut chosen = Vec::new();
    let mut edits: Vec<Edit> = Vec::new();
    for candidate in candidates {
        let Some(fix) = &candidate.fix else {
            continue;
        };
        let clashes = fix
            .edits
            .iter()
            .any(|e| edits.iter().any(|taken| taken.overlaps(e)));
        if clashes {
            continue;
        }
        edits.extend(fix.edits.iter().cloned());
        chosen.push(candidate);
    }
    edits.sort_by_key(|e| (e.range.start, e.range.end));
    (chosen, edits)
}

/// True when the candidate's own edits leave the text as it was.
fn is_noop(text: &str, candidate: &MatchCandidate) -> bool {
    candidate.fix.as_ref().map_or(true, |fix| {
        let mut own = fix.edits.clone();
        own.sort_by_key(|e| (e.range.start, e.range.end));
        apply_edits(text, &own) == text
    })
}

/// True when the rule reports fewer findings around the candidate's edits
/// after `edits` are applied than before. A fix that re-creates the
/// pattern it removed, here or next to it, does not count.
fn resolves(
    candidate: &MatchCandidate,
    before: &[MatchCandidate],
    after: &[MatchCandidate],
    edits: &[Edit],
) -> bool {
    let Some(fix) = &candidate.fix else {
        return false;
    };
    let location = &candidate.location;
    let old = fix
        .edits
        .iter()
        .map(|e| e.range.clone())
        .fold(location.offset..location.offset + location.length, |acc, r| {
            acc.start.min(r.start)..acc.end.max(r.end)
        });
    let new_end = fix
        .edits
        .iter()
        .map(|e| map_offset(e.range.start, edits) + e.new_text.len())
        .fold(map_offset(old.end, edits), usize::max);
    let new = map_offset(old.start, edits)..new_end;

    let count = |found: &[MatchCandidate], region: &Range<usize>| {
        found
            .iter()
            .filter(|r| r.rule_id == candidate.rule_id && r.sub_tag == candidate.sub_tag)
            .filter(|r| {
                let start = r.location.offset;
                start <= region.end && region.start <= start + r.location.length
            })
            .count()
    };
    count(after, &new) < count(before, &old)
}

fn reparse(document: &SourceDocument, text: &str) -> SourceDocument {
    SourceDocument::parse(
        document.id(),
        document.path().to_path_buf(),
        document.relative_path().to_path_buf(),
        text.to_string(),
    )
}

fn failure_key(candidate: &MatchCandidate, document: &SourceDocument) -> FailureKey {
    (
        candidate.rule_id.clone(),
        candidate.sub_tag.clone(),
        document.line_text(candidate.location.line).trim().to_string(),
    )
}

fn fix_failed(candidate: MatchCandidate) -> MatchCandidate {
    MatchCandidate {
        rule_id: ids::FIX_FAILED.to_string(),
        sub_tag: None,
        message: format!(
            "fix for '{}' did not resolve: {}",
            candidate.tag(),
            candidate.message
        ),
        severity: Severity::Error,
        fix: None,
        ..candidate
    }
}

/// Applies sorted, non-overlapping edits to `text`.
#[must_use]
pub fn apply_edits(text: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in edits {
        let start = edit.range.start.clamp(cursor, text.len());
        let end = edit.range.end.clamp(start, text.len());
        out.push_str(&text[cursor..start]);
        out.push_str(&edit.new_text);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Maps an offset in the original text to the text after `edits`.
/// Offsets inside a replaced range map to the start of its replacement.
#[must_use]
pub fn map_offset(offset: usize, edits: &[Edit]) -> usize {
    let mut delta: isize = 0;
    for edit in edits {
        if edit.range.end <= offset && edit.range.start < offset {
            delta += len_isize(&edit.new_text) - len_isize_range(&edit.range);
        } else if edit.range.start <= offset && offset < edit.range.end {
            return offset_add(edit.range.start, delta);
        } else {
            break;
        }
    }
    offset_add(offset, delta)
}

fn len_isize(s: &str) -> isize {
    isize::try_from(s.len()).unwrap_or(isize::MAX)
}

fn len_isize_range(r: &Range<usize>) -> isize {
    isize::try_from(r.end - r.start).unwrap_or(isize::MAX)
}

fn offset_add(offset: usize, delta: isize) -> usize {
    offset.checked_add_signed(delta).unwrap_or(0)
}

/// Replaces `path` with `content` through a temporary file in the same
/// directory, so readers never see a partial write.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created, written or
/// renamed over `path`.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), FixError> {
    let wrap = |source: std::io::Error| FixError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.write_all(content.as_bytes()).map_err(wrap)?;
    tmp.flush().map_err(wrap)?;
    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions()).map_err(wrap)?;
    }
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LineContext;
    use crate::document::DocumentId;
    use crate::profile::Profiles;
    use crate::rule::{Finding, LineRule, Matcher, Rule};
    use crate::types::Fix;

    struct Trailing;
    impl Rule for Trailing {
        fn id(&self) -> &'static str {
            "trailing"
        }
        fn fixable(&self) -> bool {
            true
        }
    }
    impl LineRule for Trailing {
        fn check_line(&self, ctx: &LineContext<'_>) -> Vec<Finding> {
            let trimmed = ctx.text.trim_end().len();
            if trimmed == ctx.text.len() {
                return vec![];
            }
            let range = ctx.range.start + trimmed..ctx.range.end;
            vec![Finding::new("trailing whitespace")
                .at(range.clone())
                .with_fix(Fix::new("remove", Edit::delete(range)))]
        }
    }

    /// Proposes a fix that leaves the finding in place.
    struct Stubborn;
    impl Rule for Stubborn {
        fn id(&self) -> &'static str {
            "stubborn"
        }
        fn fixable(&self) -> bool {
            true
        }
    }
    impl LineRule for Stubborn {
        fn check_line(&self, ctx: &LineContext<'_>) -> Vec<Finding> {
            match ctx.text.find("bad") {
                Some(i) => {
                    let at = ctx.range.start + i;
                    vec![Finding::new("bad")
                        .at(at..at + 3)
                        .with_fix(Fix::new("double", Edit::replace(at..at + 3, "badbad")))]
                }
                None => vec![],
            }
        }
    }

    /// Rewrites `foo` to `xfoo`, which still contains `foo` one byte later.
    struct Drifting;
    impl Rule for Drifting {
        fn id(&self) -> &'static str {
            "drifting"
        }
        fn fixable(&self) -> bool {
            true
        }
    }
    impl LineRule for Drifting {
        fn check_line(&self, ctx: &LineContext<'_>) -> Vec<Finding> {
            match ctx.text.find("foo") {
                Some(i) => {
                    let at = ctx.range.start + i;
                    vec![Finding::new("foo")
                        .at(at..at + 3)
                        .with_fix(Fix::new("prefix", Edit::replace(at..at + 3, "xfoo")))]
                }
                None => vec![],
            }
        }
    }

    /// Proposes a replacement identical to the original text.
    struct Idle;
    impl Rule for Idle {
        fn id(&self) -> &'static str {
            "idle"
        }
        fn fixable(&self) -> bool {
            true
        }
    }
    impl LineRule for Idle {
        fn check_line(&self, ctx: &LineContext<'_>) -> Vec<Finding> {
            match ctx.text.find("same") {
                Some(i) => {
                    let at = ctx.range.start + i;
                    vec![Finding::new("same")
                        .at(at..at + 4)
                        .with_fix(Fix::new("rewrite", Edit::replace(at..at + 4, "same")))]
                }
                None => vec![],
            }
        }
    }

    fn doc(text: &str) -> SourceDocument {
        SourceDocument::parse(
            DocumentId(0),
            PathBuf::from("/p/a.yml"),
            PathBuf::from("a.yml"),
            text.to_string(),
        )
    }

    fn run(text: &str, config: &Config) -> FileFix {
        let mut rules = RuleSet::new();
        rules.register(Matcher::line(Trailing)).unwrap();
        rules.register(Matcher::line(Stubborn)).unwrap();
        rules.register(Matcher::line(Drifting)).unwrap();
        rules.register(Matcher::line(Idle)).unwrap();
        let profiles = Profiles::new(&[], &rules);
        let selection = Selection::from_config(&rules, config);
        let resolver = SuppressionResolver::new(&rules, config, None);
        let classifier = Classifier::new(&rules, &profiles, None, config);
        let pipeline = FixPipeline::new(&rules, &selection, &resolver, &classifier, config);
        pipeline.fix_document(&doc(text))
    }

    #[test]
    fn fixes_preserve_untouched_text() {
        let fix = run("a: 1   # keep me  \nb:   'x'\n", &Config::default());
        assert_eq!(fix.fixed, "a: 1   # keep me\nb:   'x'\n");
        assert_eq!(fix.applied.len(), 1);
        assert_eq!(fix.passes, 2);
    }

    #[test]
    fn unresolved_fix_is_reverted_and_not_retried() {
        let fix = run("x: bad\n", &Config::default());
        assert!(!fix.changed());
        assert_eq!(fix.failures.len(), 1);
        assert_eq!(fix.failures[0].rule_id, ids::FIX_FAILED);
        assert_eq!(fix.failures[0].location.line, 1);

        // Other rules still fix the same line; the failed one is not retried.
        let fix = run("x: bad  \n", &Config::default());
        assert_eq!(fix.fixed, "x: bad\n");
        assert_eq!(fix.failures.len(), 1);
        assert_eq!(fix.passes, 2);
    }

    #[test]
    fn fix_that_recreates_its_pattern_nearby_fails() {
        let fix = run("k: foo\n", &Config::default());
        assert!(!fix.changed());
        assert_eq!(fix.failures.len(), 1);
        assert!(fix.failures[0].message.contains("drifting"));
        assert!(fix.applied.is_empty());
    }

    #[test]
    fn fix_that_changes_nothing_is_reported() {
        let fix = run("k: same\n", &Config::default());
        assert!(!fix.changed());
        assert_eq!(fix.failures.len(), 1);
        assert_eq!(fix.failures[0].rule_id, ids::FIX_FAILED);
        assert!(fix.failures[0].message.contains("idle"));
    }

    #[test]
    fn undecodable_documents_are_never_fixed() {
        let rules = {
            let mut rules = RuleSet::new();
            rules.register(Matcher::line(Trailing)).unwrap();
            rules
        };
        let config = Config::default();
        let profiles = Profiles::new(&[], &rules);
        let selection = Selection::from_config(&rules, &config);
        let resolver = SuppressionResolver::new(&rules, &config, None);
        let classifier = Classifier::new(&rules, &profiles, None, &config);
        let pipeline = FixPipeline::new(&rules, &selection, &resolver, &classifier, &config);
        let document = SourceDocument::undecodable(
            DocumentId(0),
            PathBuf::from("/p/a.yml"),
            PathBuf::from("a.yml"),
            b"a: \xff   \n",
        );
        let fix = pipeline.fix_document(&document);
        assert!(!fix.changed());
        assert!(fix.applied.is_empty());
    }

    #[test]
    fn suppressed_findings_are_not_fixed() {
        let fix = run("a: 1  # noqa: trailing   \n", &Config::default());
        assert!(!fix.changed());
    }

    #[test]
    fn write_list_limits_rules() {
        let config = Config {
            fix: vec!["stubborn".into()],
            ..Config::default()
        };
        let fix = run("a: 1  \n", &config);
        assert!(!fix.changed());
    }

    #[test]
    fn edits_apply_and_map_offsets() {
        let text = "abcdef";
        let edits = vec![Edit::replace(1..2, "XX"), Edit::delete(3..5)];
        assert_eq!(apply_edits(text, &edits), "aXXcf");
        assert_eq!(map_offset(0, &edits), 0);
        assert_eq!(map_offset(2, &edits), 3);
        assert_eq!(map_offset(4, &edits), 4);
        assert_eq!(map_offset(5, &edits), 4);
    }

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.yml");
        std::fs::write(&path, "old").unwrap();
        write_atomic(&path, "new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }
}
