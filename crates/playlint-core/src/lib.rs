//! # playlint-core
//!
//! Core engine for linting automation playbooks.
//!
//! This crate loads playbooks, task lists and roles, splices included
//! documents into one tree per root document, runs rules against lines,
//! nodes and whole documents, and turns the raw matches into sorted,
//! de-duplicated diagnostics. It includes:
//!
//! - [`Rule`] and its [`LineRule`], [`NodeRule`] and [`DocumentRule`]
//!   capabilities for writing checks
//! - [`RuleSet`], the explicit registry of rules for one run
//! - [`Analyzer`] for orchestrating discovery, matching and suppression
//! - [`FixPipeline`] for text-preserving autofix
//! - [`Diagnostic`] and [`LintResult`] for reporting findings
//!
//! ## Example
//!
//! ```ignore
//! use playlint_core::{Analyzer, Matcher, Severity};
//!
//! let analyzer = Analyzer::builder()
//!     .root("./playbooks")
//!     .rule(Matcher::node(MyRule))
//!     .build()?;
//!
//! let result = analyzer.analyze()?;
//! println!("{}", result.format_test_report(Severity::Error));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod aggregate;
mod analyzer;
mod autofix;
mod classify;
mod config;
mod context;
mod document;
mod engine;
mod loader;
mod node;
mod profile;
mod registry;
mod rule;
mod suppression;
mod tree;
mod types;

/// Identifiers of the rules emitted by the engine itself.
pub mod ids;
/// Span-recording outline of YAML block structure.
pub mod outline;
/// Template expression scanning.
pub mod template;

pub use aggregate::{normalize, Aggregator};
pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError, Cancellation, IGNORE_FILE};
pub use autofix::{
    apply_edits, map_offset, write_atomic, AppliedFix, FileFix, FixError, FixPipeline, FixReport,
};
pub use classify::Classifier;
pub use config::{AnalyzerConfig, Config, ConfigError, RuleConfig};
pub use context::{DocumentContext, LineContext, NodeContext};
pub use document::{
    DocumentId, DocumentKind, DocumentRegistry, LineCol, LineIndex, ParseFailure, ParsedContent,
    SourceDocument,
};
pub use engine::{parse_failure_candidate, Engine, Selection};
pub use loader::{LoadError, Loader, Resolution};
pub use node::{Attribute, Forest, Node, NodeId, NodeKind, NodePath, Section, Span};
pub use profile::{Profile, Profiles};
pub use registry::{split_sub_tag, RegistryError, RuleEntry, RuleSet};
pub use rule::{
    Capability, DocumentRule, Finding, LineRule, Matcher, NodeRule, Rule, RuleDescriptor,
};
pub use suppression::{
    IgnoreEntry, IgnoreFile, MalformedDirective, Origin, Scope, SuppressionDirective,
    SuppressionResolver, Target, Verdict,
};
pub use types::{
    Diagnostic, DiagnosticReport, Edit, Fix, LintResult, Location, MatchCandidate, RunOutcome,
    Severity,
};
