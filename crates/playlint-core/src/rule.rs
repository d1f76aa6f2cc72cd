//! Rule traits for defining lint rules.

use serde::Serialize;
use std::fmt;
use std::ops::Range;

use crate::context::{DocumentContext, LineContext, NodeContext};
use crate::types::{Fix, Severity};

/// Metadata shared by every rule.
///
/// A rule also implements exactly one of [`LineRule`], [`NodeRule`] or
/// [`DocumentRule`], and is registered through the matching [`Matcher`]
/// variant.
///
/// # Example
///
/// ```ignore
/// use playlint_core::{Finding, NodeContext, NodeRule, Rule};
///
/// pub struct NoBecomeRoot;
///
/// impl Rule for NoBecomeRoot {
///     fn id(&self) -> &'static str { "no-become-root" }
///     fn description(&self) -> &'static str { "Tasks should not become root" }
/// }
///
/// impl NodeRule for NoBecomeRoot {
///     fn check_node(&self, ctx: &NodeContext<'_>) -> Vec<Finding> {
///         match ctx.node().attr("become_user").and_then(|a| a.as_str()) {
///             Some("root") => vec![Finding::new("become_user is root")],
///             _ => vec![],
///         }
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Returns the canonical kebab-case id of this rule (e.g., "name-missing").
    fn id(&self) -> &'static str;

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Returns alternate names accepted wherever the id is (e.g., legacy codes).
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Returns the tags of this rule.
    fn tags(&self) -> &'static [&'static str] {
        &[]
    }

    /// Returns the default severity for findings from this rule.
    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    /// Returns the lowest profile this rule belongs to.
    fn profile(&self) -> Option<&'static str> {
        None
    }

    /// Whether findings of this rule may carry fixes.
    fn fixable(&self) -> bool {
        false
    }
}

/// A rule checked against each raw text line of each document, including
/// documents that failed to parse.
pub trait LineRule: Rule {
    /// Checks one line.
    fn check_line(&self, ctx: &LineContext<'_>) -> Vec<Finding>;
}

/// A rule checked against each node of each resolved tree, in pre-order.
pub trait NodeRule: Rule {
    /// Checks one node.
    fn check_node(&self, ctx: &NodeContext<'_>) -> Vec<Finding>;
}

/// A rule checked once against each document as a whole.
pub trait DocumentRule: Rule {
    /// Checks one document.
    fn check_document(&self, ctx: &DocumentContext<'_>) -> Vec<Finding>;
}

/// How a rule is driven by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Per line.
    Line,
    /// Per node.
    Node,
    /// Per document.
    Document,
    /// Emitted by the engine itself.
    Internal,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line => write!(f, "line"),
            Self::Node => write!(f, "node"),
            Self::Document => write!(f, "document"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// A registered rule together with its capability.
pub enum Matcher {
    /// Line rule.
    Line(Box<dyn LineRule>),
    /// Node rule.
    Node(Box<dyn NodeRule>),
    /// Document rule.
    Document(Box<dyn DocumentRule>),
}

impl Matcher {
    /// Wraps a line rule.
    pub fn line(rule: impl LineRule + 'static) -> Self {
        Self::Line(Box::new(rule))
    }

    /// Wraps a node rule.
    pub fn node(rule: impl NodeRule + 'static) -> Self {
        Self::Node(Box::new(rule))
    }

    /// Wraps a document rule.
    pub fn document(rule: impl DocumentRule + 'static) -> Self {
        Self::Document(Box::new(rule))
    }

    /// Capability of the wrapped rule.
    #[must_use]
    pub fn capability(&self) -> Capability {
        match self {
            Self::Line(_) => Capability::Line,
            Self::Node(_) => Capability::Node,
            Self::Document(_) => Capability::Document,
        }
    }

    /// Canonical id of the wrapped rule.
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::Line(r) => r.id(),
            Self::Node(r) => r.id(),
            Self::Document(r) => r.id(),
        }
    }

    /// Metadata of the wrapped rule.
    #[must_use]
    pub fn descriptor(&self) -> RuleDescriptor {
        match self {
            Self::Line(r) => RuleDescriptor::describe(r.as_ref(), Capability::Line),
            Self::Node(r) => RuleDescriptor::describe(r.as_ref(), Capability::Node),
            Self::Document(r) => RuleDescriptor::describe(r.as_ref(), Capability::Document),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher::{}({})", self.capability(), self.id())
    }
}

/// Registered metadata of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDescriptor {
    /// Canonical id.
    pub id: String,
    /// Description.
    pub description: String,
    /// Alternate names.
    pub aliases: Vec<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Default severity.
    pub default_severity: Severity,
    /// Lowest profile the rule belongs to.
    pub profile: Option<String>,
    /// How the rule is driven.
    pub capability: Capability,
    /// Whether findings may carry fixes.
    pub fixable: bool,
    /// Whether findings may be suppressed.
    pub suppressible: bool,
}

impl RuleDescriptor {
    /// Reads the metadata of `rule`.
    #[must_use]
    pub fn describe<R: Rule + ?Sized>(rule: &R, capability: Capability) -> Self {
        Self {
            id: rule.id().to_string(),
            description: rule.description().to_string(),
            aliases: rule.aliases().iter().map(|s| (*s).to_string()).collect(),
            tags: rule.tags().iter().map(|s| (*s).to_string()).collect(),
            default_severity: rule.default_severity(),
            profile: rule.profile().map(str::to_string),
            capability,
            fixable: rule.fixable(),
            suppressible: true,
        }
    }

    /// Metadata for a rule emitted by the engine itself, tagged `core`.
    #[must_use]
    pub fn internal(id: &str, description: &str, severity: Severity) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            aliases: Vec::new(),
            tags: vec![crate::ids::CORE_TAG.to_string()],
            default_severity: severity,
            profile: None,
            capability: Capability::Internal,
            fixable: false,
            suppressible: true,
        }
    }

    /// Marks findings of this rule as exempt from suppression.
    #[must_use]
    pub fn unsuppressible(mut self) -> Self {
        self.suppressible = false;
        self
    }

    /// Returns true if the rule carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns true for engine rules that every profile keeps.
    #[must_use]
    pub fn is_core(&self) -> bool {
        self.has_tag(crate::ids::CORE_TAG)
    }
}

/// What a rule reports; the engine turns it into a located candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Human-readable message.
    pub message: String,
    /// Facet of the rule.
    pub sub_tag: Option<String>,
    /// Byte range in the document; defaults to the line or node start.
    pub range: Option<Range<usize>>,
    /// Severity override; defaults to the rule's default severity.
    pub severity: Option<Severity>,
    /// Optional mechanical fix.
    pub fix: Option<Fix>,
}

impl Finding {
    /// Creates a finding with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sub_tag: None,
            range: None,
            severity: None,
            fix: None,
        }
    }

    /// Sets the sub-tag.
    #[must_use]
    pub fn sub_tag(mut self, sub_tag: impl Into<String>) -> Self {
        self.sub_tag = Some(sub_tag.into());
        self
    }

    /// Sets the byte range.
    #[must_use]
    pub fn at(mut self, range: Range<usize>) -> Self {
        self.range = Some(range);
        self
    }

    /// Overrides the severity.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Attaches a fix.
    #[must_use]
    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestRule;

    impl Rule for TestRule {
        fn id(&self) -> &'static str {
            "test-rule"
        }
        fn description(&self) -> &'static str {
            "A test rule"
        }
        fn aliases(&self) -> &'static [&'static str] {
            &["999"]
        }
    }

    impl LineRule for TestRule {
        fn check_line(&self, ctx: &LineContext<'_>) -> Vec<Finding> {
            vec![Finding::new(format!("line {}", ctx.line))]
        }
    }

    #[test]
    fn descriptor_reads_rule_metadata() {
        let matcher = Matcher::line(TestRule);
        let descriptor = matcher.descriptor();
        assert_eq!(descriptor.id, "test-rule");
        assert_eq!(descriptor.aliases, vec!["999".to_string()]);
        assert_eq!(descriptor.capability, Capability::Line);
        assert_eq!(descriptor.default_severity, Severity::Error);
        assert!(descriptor.suppressible);
        assert_eq!(format!("{matcher:?}"), "Matcher::line(test-rule)");
    }

    #[test]
    fn internal_descriptors_are_core() {
        let d = RuleDescriptor::internal("parser-error", "x", Severity::Error).unsuppressible();
        assert!(d.is_core());
        assert!(!d.suppressible);
    }
}
