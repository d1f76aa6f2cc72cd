//! Suppression directives and the resolver applying them.
//!
//! Sources, strongest first:
//! - `# noqa` / `# noqa: rule rule[sub] tag` comments in documents
//! - the ignore file (`.playlint-ignore`): `<path> <rule>...` per line
//! - `skip_list` in the configuration
//!
//! `warn_list` does not remove findings; it demotes them to warnings.

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::config::Config;
use crate::document::{DocumentRegistry, LineIndex, SourceDocument};
use crate::ids;
use crate::node::NodePath;
use crate::outline::comment_start;
use crate::registry::{split_sub_tag, RuleSet};
use crate::types::{Location, MatchCandidate, Severity};

#[allow(clippy::expect_used)]
static TARGET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|[A-Za-z0-9_.-]+(\[[A-Za-z0-9_.-]+\])?)$").expect("valid target pattern")
});

/// Where a directive comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Comment in a document.
    Inline,
    /// Ignore file entry.
    IgnoreFile,
    /// `skip_list` entry.
    Config,
}

/// What a directive covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A single line.
    Line(usize),
    /// A node and everything below it.
    NodeSubtree(NodePath),
    /// A whole file.
    File(PathBuf),
    /// The whole run.
    Run,
}

/// A rule selector inside a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every rule.
    Wildcard,
    /// Id, alias or tag, optionally with a `[sub-tag]`.
    Name(String),
}

impl Target {
    /// Parses one token. Returns `None` for malformed tokens.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        if !TARGET_PATTERN.is_match(token) {
            return None;
        }
        Some(if token == "*" {
            Self::Wildcard
        } else {
            Self::Name(token.to_string())
        })
    }

    /// Returns true if this target selects the candidate's rule.
    #[must_use]
    pub fn selects(&self, rules: &RuleSet, rule_id: &str, sub_tag: Option<&str>) -> bool {
        match self {
            Self::Wildcard => true,
            Self::Name(name) => rules.selects(name, rule_id, sub_tag),
        }
    }

    /// Returns the id, alias or tag this target names, if it is unknown.
    fn unknown_name<'a>(&'a self, rules: &RuleSet) -> Option<&'a str> {
        match self {
            Self::Wildcard => None,
            Self::Name(name) => {
                let (base, _) = split_sub_tag(name);
                (!rules.knows(base)).then_some(base)
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "*"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// A parsed suppression directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionDirective {
    /// Source of the directive.
    pub origin: Origin,
    /// What it covers.
    pub scope: Scope,
    /// Rules it selects.
    pub targets: Vec<Target>,
    /// Line the directive is written on (1-indexed).
    pub line: usize,
}

/// A directive that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedDirective {
    /// Line (1-indexed).
    pub line: usize,
    /// Column (1-indexed).
    pub column: usize,
    /// Byte offset of the comment.
    pub offset: usize,
    /// Length of the comment.
    pub length: usize,
    /// What is wrong.
    pub reason: String,
}

/// Finds `# noqa` comments. Every directive starts with line scope; the
/// document widens it to the node starting on that line.
pub(crate) fn scan_inline(
    text: &str,
    index: &LineIndex,
) -> (Vec<SuppressionDirective>, Vec<MalformedDirective>) {
    let mut directives = Vec::new();
    let mut malformed = Vec::new();
    for line in 1..=index.line_count() {
        let range = index.line_range(text, line);
        let line_text = &text[range.clone()];
        let Some(hash) = comment_start(line_text) else {
            continue;
        };
        let comment = line_text[hash + 1..].trim();
        let Some(rest) = comment.strip_prefix("noqa") else {
            continue;
        };
        let parsed = if rest.is_empty() {
            Ok(vec![Target::Wildcard])
        } else if let Some(list) = rest.strip_prefix(':') {
            parse_targets(list).and_then(|targets| {
                if targets.is_empty() {
                    Err("empty noqa directive".to_string())
                } else {
                    Ok(targets)
                }
            })
        } else if rest.starts_with(char::is_whitespace) {
            parse_targets(rest)
        } else {
            // `# noqa123` and the like are ordinary comments.
            continue;
        };
        let tokens = match parsed {
            Ok(tokens) => tokens,
            Err(reason) => {
                let offset = range.start + hash;
                malformed.push(MalformedDirective {
                    line,
                    column: index.line_col(text, offset).column,
                    offset,
                    length: line_text.len() - hash,
                    reason,
                });
                continue;
            }
        };
        directives.push(SuppressionDirective {
            origin: Origin::Inline,
            scope: Scope::Line(line),
            targets: tokens,
            line,
        });
    }
    (directives, malformed)
}

/// Splits a whitespace or comma separated list.
fn parse_targets(list: &str) -> Result<Vec<Target>, String> {
    list.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| {
            Target::parse(t).ok_or_else(|| format!("invalid rule name '{t}' in noqa directive"))
        })
        .collect()
}

/// One line of the ignore file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreEntry {
    /// Document path relative to the project root.
    pub path: PathBuf,
    /// Rules ignored in that document.
    pub targets: Vec<Target>,
    /// Line in the ignore file.
    pub line: usize,
}

/// Parsed ignore file.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFile {
    /// Path of the ignore file, relative to the project root.
    pub path: PathBuf,
    /// Entries in file order.
    pub entries: Vec<IgnoreEntry>,
    /// Lines that could not be understood.
    pub malformed: Vec<MalformedDirective>,
}

impl IgnoreFile {
    /// Parses ignore file text.
    #[must_use]
    pub fn parse(path: PathBuf, text: &str) -> Self {
        let mut file = Self {
            path,
            ..Self::default()
        };
        let mut offset = 0;
        for (idx, raw) in text.split('\n').enumerate() {
            let line = idx + 1;
            let line_offset = offset;
            offset += raw.len() + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let mut parts = content.split_whitespace();
            let Some(doc_path) = parts.next() else {
                continue;
            };
            let tokens: Vec<&str> = parts.collect();
            let reason = if tokens.is_empty() {
                Some(format!("ignore entry for '{doc_path}' names no rule"))
            } else {
                tokens
                    .iter()
                    .find(|t| Target::parse(t).is_none())
                    .map(|t| format!("invalid rule name '{t}' in ignore entry"))
            };
            if let Some(reason) = reason {
                file.malformed.push(MalformedDirective {
                    line,
                    column: 1,
                    offset: line_offset,
                    length: raw.trim_end().len(),
                    reason,
                });
                continue;
            }
            file.entries.push(IgnoreEntry {
                path: normalize(Path::new(doc_path)),
                targets: tokens.iter().filter_map(|t| Target::parse(t)).collect(),
                line,
            });
        }
        file
    }

    /// Reads the ignore file at `path`. A missing file yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path, relative: PathBuf) -> std::io::Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(Self::parse(relative, &text))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.strip_prefix("./").unwrap_or(path).to_path_buf()
}

/// Outcome of resolving suppression for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Report as is.
    Keep,
    /// Report, demoted to a warning.
    Demote,
    /// Drop.
    Suppressed(Origin),
}

/// Applies inline directives, the ignore file and config lists to candidates.
#[derive(Debug)]
pub struct SuppressionResolver<'a> {
    rules: &'a RuleSet,
    ignore: Option<&'a IgnoreFile>,
    skip: Vec<Target>,
    warn: Vec<Target>,
}

impl<'a> SuppressionResolver<'a> {
    /// Creates a resolver from the run configuration.
    #[must_use]
    pub fn new(rules: &'a RuleSet, config: &Config, ignore: Option<&'a IgnoreFile>) -> Self {
        Self {
            rules,
            ignore,
            skip: config_targets(&config.skip_list, "skip_list"),
            warn: config_targets(&config.warn_list, "warn_list"),
        }
    }

    /// Decides what happens to `candidate`. `document` is the document the
    /// candidate's location points into.
    #[must_use]
    pub fn verdict(&self, candidate: &MatchCandidate, document: Option<&SourceDocument>) -> Verdict {
        let rule_id = candidate.rule_id.as_str();
        let sub_tag = candidate.sub_tag.as_deref();
        let suppressible = self
            .rules
            .lookup_by_id(rule_id)
            .map_or(true, |e| e.descriptor().suppressible);
        if !suppressible {
            return Verdict::Keep;
        }
        let selects = |targets: &[Target]| targets.iter().any(|t| t.selects(self.rules, rule_id, sub_tag));

        if let Some(doc) = document {
            let inline = doc.directives().iter().any(|d| {
                let in_scope = match &d.scope {
                    Scope::Line(line) => candidate.location.line == *line,
                    Scope::NodeSubtree(path) => {
                        candidate.location.line == d.line
                            || candidate.node.as_ref().is_some_and(|n| path.contains(n))
                    }
                    Scope::File(_) | Scope::Run => true,
                };
                in_scope && selects(&d.targets)
            });
            if inline {
                return Verdict::Suppressed(Origin::Inline);
            }
        }

        if let Some(ignore) = self.ignore {
            let file = normalize(&candidate.location.file);
            if ignore
                .entries
                .iter()
                .any(|e| e.path == file && selects(&e.targets))
            {
                return Verdict::Suppressed(Origin::IgnoreFile);
            }
        }

        if selects(&self.skip) {
            return Verdict::Suppressed(Origin::Config);
        }
        if selects(&self.warn) {
            return Verdict::Demote;
        }
        Verdict::Keep
    }

    /// Returns true if every candidate of `rule_id` is dropped by `skip_list`.
    #[must_use]
    pub fn skips_rule(&self, rule_id: &str) -> bool {
        self.skip.iter().any(|t| match t {
            Target::Wildcard => true,
            Target::Name(name) => {
                split_sub_tag(name).1.is_none() && self.rules.selects(name, rule_id, None)
            }
        })
    }

    /// Findings about the directives themselves: malformed comments, unknown
    /// rule names and bad ignore file lines.
    #[must_use]
    pub fn syntax_candidates(&self, documents: &DocumentRegistry) -> Vec<MatchCandidate> {
        let mut out = Vec::new();
        for doc in documents.documents() {
            for bad in doc.malformed_directives() {
                out.push(syntax_candidate(
                    Location::new(doc.relative_path().to_path_buf(), bad.line, bad.column)
                        .with_span(bad.offset, bad.length),
                    Some(doc.id()),
                    bad.reason.clone(),
                ));
            }
            for directive in doc.directives() {
                for target in &directive.targets {
                    if let Some(name) = target.unknown_name(self.rules) {
                        out.push(syntax_candidate(
                            doc.line_location(directive.line),
                            Some(doc.id()),
                            format!("unknown rule '{name}' in noqa directive"),
                        ));
                    }
                }
            }
        }

        if let Some(ignore) = self.ignore {
            for bad in &ignore.malformed {
                out.push(syntax_candidate(
                    Location::new(ignore.path.clone(), bad.line, bad.column)
                        .with_span(bad.offset, bad.length),
                    None,
                    bad.reason.clone(),
                ));
            }
            for entry in &ignore.entries {
                for target in &entry.targets {
                    if let Some(name) = target.unknown_name(self.rules) {
                        out.push(syntax_candidate(
                            Location::new(ignore.path.clone(), entry.line, 1),
                            None,
                            format!("unknown rule '{name}' in ignore entry"),
                        ));
                    }
                }
            }
        }
        out
    }
}

fn syntax_candidate(
    location: Location,
    document: Option<crate::document::DocumentId>,
    message: String,
) -> MatchCandidate {
    MatchCandidate {
        rule_id: ids::SUPPRESSION_SYNTAX.to_string(),
        sub_tag: None,
        message,
        location,
        document,
        node: None,
        severity: Severity::Warning,
        fix: None,
    }
}

fn config_targets(names: &[String], list: &str) -> Vec<Target> {
    names
        .iter()
        .filter_map(|name| {
            let target = Target::parse(name);
            if target.is_none() {
                tracing::warn!(entry = %name, list, "ignoring malformed rule name");
            }
            target
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentId;
    use crate::rule::RuleDescriptor;

    fn rules() -> RuleSet {
        let mut set = RuleSet::new();
        let mut name = RuleDescriptor::internal("name-missing", "", Severity::Error);
        name.tags = vec!["idiom".into()];
        name.aliases = vec!["502".into()];
        set.register_descriptor(name).unwrap();
        let mut yaml = RuleDescriptor::internal("yaml", "", Severity::Error);
        yaml.tags = vec!["formatting".into()];
        set.register_descriptor(yaml).unwrap();
        set
    }

    fn doc(text: &str) -> SourceDocument {
        SourceDocument::parse(
            DocumentId(0),
            PathBuf::from("/p/site.yml"),
            PathBuf::from("site.yml"),
            text.to_string(),
        )
    }

    fn candidate(rule: &str, sub: Option<&str>, line: usize, node: Option<NodePath>) -> MatchCandidate {
        MatchCandidate {
            rule_id: rule.to_string(),
            sub_tag: sub.map(str::to_string),
            message: "m".to_string(),
            location: Location::new(PathBuf::from("site.yml"), line, 1),
            document: Some(DocumentId(0)),
            node,
            severity: Severity::Error,
            fix: None,
        }
    }

    #[test]
    fn scans_noqa_forms() {
        let text = "a: 1  # noqa\nb: 2  # noqa: yaml[truthy] idiom\nc: 3  # noqa:\nd: 4 # noqa: bad!\ne: 5 # noqa123\n";
        let index = LineIndex::new(text);
        let (directives, malformed) = scan_inline(text, &index);
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].targets, vec![Target::Wildcard]);
        assert_eq!(
            directives[1].targets,
            vec![
                Target::Name("yaml[truthy]".into()),
                Target::Name("idiom".into())
            ]
        );
        assert_eq!(malformed.len(), 2);
        assert_eq!(malformed[0].line, 3);
        assert!(malformed[1].reason.contains("bad!"));
    }

    #[test]
    fn noqa_inside_quotes_is_not_a_directive() {
        let text = "msg: \"# noqa\"\n";
        let (directives, _) = scan_inline(text, &LineIndex::new(text));
        assert!(directives.is_empty());
    }

    #[test]
    fn inline_scope_covers_node_subtree() {
        let d = doc("- block:  # noqa: name-missing\n    - debug: {}\n- debug: {}\n");
        let rules = rules();
        let config = Config::default();
        let resolver = SuppressionResolver::new(&rules, &config, None);
        let inner = candidate("name-missing", None, 2, Some(NodePath::root().child(0).child(0)));
        let outer = candidate("name-missing", None, 3, Some(NodePath::root().child(1)));
        assert_eq!(resolver.verdict(&inner, Some(&d)), Verdict::Suppressed(Origin::Inline));
        assert_eq!(resolver.verdict(&outer, Some(&d)), Verdict::Keep);
    }

    #[test]
    fn inline_wins_over_warn_list() {
        let d = doc("- debug: {}  # noqa: 502\n");
        let rules = rules();
        let config = Config {
            warn_list: vec!["name-missing".into()],
            ..Config::default()
        };
        let resolver = SuppressionResolver::new(&rules, &config, None);
        let c = candidate("name-missing", None, 1, Some(NodePath::root().child(0)));
        assert_eq!(resolver.verdict(&c, Some(&d)), Verdict::Suppressed(Origin::Inline));
        let other = candidate("name-missing", None, 5, None);
        assert_eq!(resolver.verdict(&other, Some(&d)), Verdict::Demote);
    }

    #[test]
    fn ignore_file_and_skip_list() {
        let ignore = IgnoreFile::parse(
            PathBuf::from(".playlint-ignore"),
            "# generated\n./site.yml yaml\nroles/x.yml\nother.yml bad!\n",
        );
        assert_eq!(ignore.entries.len(), 1);
        assert_eq!(ignore.malformed.len(), 2);

        let rules = rules();
        let config = Config {
            skip_list: vec!["idiom".into()],
            ..Config::default()
        };
        let resolver = SuppressionResolver::new(&rules, &config, Some(&ignore));
        assert_eq!(
            resolver.verdict(&candidate("yaml", Some("truthy"), 1, None), None),
            Verdict::Suppressed(Origin::IgnoreFile)
        );
        assert_eq!(
            resolver.verdict(&candidate("name-missing", None, 1, None), None),
            Verdict::Suppressed(Origin::Config)
        );
        assert!(resolver.skips_rule("name-missing"));
        assert!(!resolver.skips_rule("yaml"));
    }

    #[test]
    fn parser_errors_cannot_be_suppressed() {
        let d = doc("a: [  # noqa\n");
        let rules = rules();
        let config = Config {
            skip_list: vec!["*".into()],
            ..Config::default()
        };
        let resolver = SuppressionResolver::new(&rules, &config, None);
        let c = candidate(ids::PARSER_ERROR, None, 1, None);
        assert_eq!(resolver.verdict(&c, Some(&d)), Verdict::Keep);
    }

    #[test]
    fn unknown_names_produce_syntax_warnings() {
        let d = doc("a: 1  # noqa: no-such-rule\nb: 2  # noqa:\n");
        let mut registry = DocumentRegistry::new();
        registry.insert(std::sync::Arc::new(d));
        let rules = rules();
        let config = Config::default();
        let resolver = SuppressionResolver::new(&rules, &config, None);
        let found = resolver.syntax_candidates(&registry);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.rule_id == ids::SUPPRESSION_SYNTAX));
        assert!(found.iter().any(|c| c.message.contains("no-such-rule")));
    }
}
