//! Core types for match candidates, diagnostics and results.

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

use crate::document::DocumentId;
use crate::node::NodePath;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, does not fail lint.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source code location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to project root.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Byte offset in file.
    #[serde(skip)]
    pub offset: usize,
    /// Length of the span in bytes.
    #[serde(skip)]
    pub length: usize,
}

impl Location {
    /// Creates a new location with explicit values.
    #[must_use]
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            offset: 0,
            length: 0,
        }
    }

    /// Sets the byte offset and length for this location.
    #[must_use]
    pub fn with_span(mut self, offset: usize, length: usize) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }
}

/// A single text replacement expressed on the original byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Byte range to replace.
    pub range: Range<usize>,
    /// Replacement text.
    pub new_text: String,
}

impl Edit {
    /// Creates a replacement edit.
    #[must_use]
    pub fn replace(range: Range<usize>, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }

    /// Creates an insertion at `offset`.
    #[must_use]
    pub fn insert(offset: usize, new_text: impl Into<String>) -> Self {
        Self::replace(offset..offset, new_text)
    }

    /// Creates a deletion of `range`.
    #[must_use]
    pub fn delete(range: Range<usize>) -> Self {
        Self::replace(range, String::new())
    }

    /// Returns true when both edits touch a common byte, or insert at the same point.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.range.start == other.range.start {
            return true;
        }
        self.range.start < other.range.end && other.range.start < self.range.end
    }
}

/// A mechanical rewrite proposed by a fixable rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    /// Human-readable description of the fix.
    pub message: String,
    /// Edits on the document text. Must not overlap each other.
    pub edits: Vec<Edit>,
}

impl Fix {
    /// Creates a fix made of a single edit.
    #[must_use]
    pub fn new(message: impl Into<String>, edit: Edit) -> Self {
        Self {
            message: message.into(),
            edits: vec![edit],
        }
    }
}

/// A raw rule match, before suppression and classification.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    /// Canonical rule id.
    pub rule_id: String,
    /// Facet of a multi-faceted rule (e.g. `trailing-spaces` for `yaml`).
    pub sub_tag: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Resolved source location.
    pub location: Location,
    /// Document the location refers to, `None` for non-document sources
    /// such as the ignore file.
    pub document: Option<DocumentId>,
    /// Path of the node the match was reported on, if any.
    pub node: Option<NodePath>,
    /// Severity carried from the rule.
    pub severity: Severity,
    /// Optional mechanical fix.
    pub fix: Option<Fix>,
}

impl MatchCandidate {
    /// Returns the display id, `rule[sub_tag]` or `rule`.
    #[must_use]
    pub fn tag(&self) -> String {
        display_tag(&self.rule_id, self.sub_tag.as_deref())
    }
}

pub(crate) fn display_tag(rule_id: &str, sub_tag: Option<&str>) -> String {
    match sub_tag {
        Some(sub) => format!("{rule_id}[{sub}]"),
        None => rule_id.to_string(),
    }
}

/// A finding that survived suppression and classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Canonical rule id (e.g. "name-missing").
    pub rule_id: String,
    /// Optional facet of the rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_tag: Option<String>,
    /// Resolved severity.
    pub severity: Severity,
    /// Primary location.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
    /// Lowest profile containing the rule, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Tags of the rule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Diagnostic {
    /// Returns the display id, `rule[sub_tag]` or `rule`.
    #[must_use]
    pub fn tag(&self) -> String {
        display_tag(&self.rule_id, self.sub_tag.as_deref())
    }

    /// Formats the diagnostic for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!(
            "{} at {}:{}:{}\n",
            self.tag(),
            self.location.file.display(),
            self.location.line,
            self.location.column,
        );
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        if let Some(profile) = &self.profile {
            let _ = writeln!(output, "  = profile: {profile}");
        }
        output
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} [{}] {}",
            self.location.file.display(),
            self.location.line,
            self.location.column,
            self.severity,
            self.tag(),
            self.message
        )
    }
}

/// A diagnostic paired with its source text for rich rendering.
#[derive(Debug, thiserror::Error, MietteDiagnostic)]
#[error("[{tag}] {message}")]
pub struct DiagnosticReport {
    tag: String,
    message: String,
    #[source_code]
    source_code: NamedSource<String>,
    #[label("{severity}")]
    span: SourceSpan,
    severity: Severity,
    #[help]
    help: Option<String>,
}

impl DiagnosticReport {
    /// Builds a report for `diagnostic` over the document text it points into.
    #[must_use]
    pub fn new(diagnostic: &Diagnostic, text: &str) -> Self {
        let offset = diagnostic.location.offset.min(text.len());
        let length = diagnostic.location.length.min(text.len() - offset);
        Self {
            tag: diagnostic.tag(),
            message: diagnostic.message.clone(),
            source_code: NamedSource::new(
                diagnostic.location.file.display().to_string(),
                text.to_string(),
            ),
            span: SourceSpan::from((offset, length)),
            severity: diagnostic.severity,
            help: diagnostic
                .profile
                .as_ref()
                .map(|p| format!("rule belongs to the '{p}' profile")),
        }
    }
}

/// Run-level outcome of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcome {
    /// No diagnostic reached error severity.
    Success,
    /// At least one error-severity diagnostic.
    ViolationsFound,
    /// Registry or loader invariant violation; always fatal.
    EngineFailure,
}

impl RunOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ViolationsFound => 2,
            Self::EngineFailure => 3,
        }
    }
}

/// Result of running lint analysis.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LintResult {
    /// All diagnostics, deduplicated and sorted.
    pub diagnostics: Vec<Diagnostic>,
    /// Number of documents checked.
    pub files_checked: usize,
    /// True when the run was cancelled before every document was processed.
    #[serde(default)]
    pub cancelled: bool,
}

impl LintResult {
    /// Creates a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the run outcome.
    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        self.outcome_at(Severity::Error)
    }

    /// Returns the run outcome, failing on diagnostics at or above `fail_on`.
    #[must_use]
    pub fn outcome_at(&self, fail_on: Severity) -> RunOutcome {
        if self.has_violations_at(fail_on) {
            RunOutcome::ViolationsFound
        } else {
            RunOutcome::Success
        }
    }

    /// Returns diagnostics for one rule id.
    #[must_use]
    pub fn by_rule(&self, rule_id: &str) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.rule_id == rule_id)
            .collect()
    }

    /// Counts diagnostics by severity.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let count = |severity| {
            self.diagnostics
                .iter()
                .filter(|d| d.severity == severity)
                .count()
        };
        (
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info),
        )
    }

    /// Formats diagnostics as a test failure report.
    ///
    /// Produces a human-readable multi-line report suitable for `panic!()` messages
    /// in `cargo test` integration.
    #[must_use]
    pub fn format_test_report(&self, fail_on: Severity) -> String {
        use std::fmt::Write;

        let failing: Vec<&Diagnostic> = self
            .diagnostics
            .iter()
            .filter(|d| d.severity >= fail_on)
            .collect();

        let mut report = String::new();
        let _ = writeln!(
            report,
            "\n=== playlint: {} violation(s) ===\n",
            failing.len()
        );
        for d in &failing {
            let _ = writeln!(report, "{}", d.format());
        }

        let (errors, warnings, infos) = self.count_by_severity();
        let _ = writeln!(
            report,
            "Total: {} error(s), {} warning(s), {} info(s) in {} file(s)",
            errors, warnings, infos, self.files_checked
        );
        report
    }

    /// Checks if any diagnostics meet or exceed the given severity threshold.
    #[must_use]
    pub fn has_violations_at(&self, severity: Severity) -> bool {
        self.diagnostics.iter().any(|d| d.severity >= severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_diagnostic(severity: Severity) -> Diagnostic {
        Diagnostic {
            rule_id: "name-missing".to_string(),
            sub_tag: None,
            severity,
            location: Location::new(PathBuf::from("site.yml"), 4, 3),
            message: "All tasks should be named.".to_string(),
            profile: Some("basic".to_string()),
            tags: vec!["idiom".to_string()],
        }
    }

    #[test]
    fn display_includes_sub_tag() {
        let mut d = make_diagnostic(Severity::Error);
        d.rule_id = "yaml".to_string();
        d.sub_tag = Some("truthy".to_string());
        assert_eq!(
            d.to_string(),
            "site.yml:4:3: error [yaml[truthy]] All tasks should be named."
        );
    }

    #[test]
    fn outcome_follows_error_severity() {
        let mut result = LintResult::new();
        result.diagnostics.push(make_diagnostic(Severity::Warning));
        assert_eq!(result.outcome(), RunOutcome::Success);
        result.diagnostics.push(make_diagnostic(Severity::Error));
        assert_eq!(result.outcome(), RunOutcome::ViolationsFound);
        assert_eq!(result.outcome().exit_code(), 2);
        assert_eq!(RunOutcome::EngineFailure.exit_code(), 3);
    }

    #[test]
    fn format_test_report_filters_by_severity() {
        let mut result = LintResult::new();
        result.files_checked = 2;
        result.diagnostics.push(make_diagnostic(Severity::Warning));
        result.diagnostics.push(make_diagnostic(Severity::Error));

        let report = result.format_test_report(Severity::Error);
        assert!(report.contains("1 violation(s)"));
        assert!(report.contains("1 error(s), 1 warning(s)"));
        assert!(report.contains("= profile: basic"));
    }

    #[test]
    fn edits_overlap_on_shared_bytes_or_same_insertion_point() {
        let a = Edit::replace(2..5, "x");
        assert!(a.overlaps(&Edit::replace(4..8, "y")));
        assert!(!a.overlaps(&Edit::replace(5..8, "y")));
        assert!(Edit::insert(3, "a").overlaps(&Edit::insert(3, "b")));
    }
}
