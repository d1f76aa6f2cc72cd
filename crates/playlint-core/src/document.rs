//! Source documents: raw text, line index, parse result and inline directives.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::node::{Forest, NodeKind, NodePath};
use crate::outline::{self, Block};
use crate::suppression::{self, MalformedDirective, Scope, SuppressionDirective};
use crate::tree;
use crate::types::Location;

/// Identifier of a loaded document, unique within one loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u32);

/// Shape of a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    /// Top-level sequence of plays.
    Playbook,
    /// Top-level sequence of tasks (task files, handler files, role tasks).
    TaskList,
    /// Top-level mapping (vars, defaults, meta).
    Mapping,
    /// Empty document.
    Empty,
    /// Anything else, including documents that failed to parse.
    Other,
}

/// A 1-based line and column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LineCol {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number in characters (1-indexed).
    pub column: usize,
}

/// Offset to line/column mapping for one text.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Builds the index for `text`.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Number of lines. A trailing newline does not open a new line.
    #[must_use]
    pub fn line_count(&self) -> usize {
        match self.line_starts.last() {
            Some(&last) if last == self.len && self.line_starts.len() > 1 => {
                self.line_starts.len() - 1
            }
            _ => self.line_starts.len(),
        }
    }

    /// Byte range of `line` (1-indexed), excluding the line terminator.
    #[must_use]
    pub fn line_range(&self, text: &str, line: usize) -> Range<usize> {
        let Some(&start) = self.line_starts.get(line.saturating_sub(1)) else {
            return self.len..self.len;
        };
        let mut end = self
            .line_starts
            .get(line)
            .map_or(self.len, |next| next - 1);
        if end > start && text.as_bytes().get(end - 1) == Some(&b'\r') {
            end -= 1;
        }
        start..end
    }

    /// Line and column of a byte offset.
    #[must_use]
    pub fn line_col(&self, text: &str, offset: usize) -> LineCol {
        let offset = offset.min(self.len);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let start = self.line_starts[line_idx];
        let column = text
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count())
            + 1;
        LineCol {
            line: line_idx + 1,
            column,
        }
    }
}

/// Why a document could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Parser message.
    pub message: String,
    /// Line of the failure (1-indexed).
    pub line: usize,
    /// Column of the failure (1-indexed).
    pub column: usize,
}

/// Successfully parsed content of a document.
#[derive(Debug, Clone)]
pub struct ParsedContent {
    /// Parsed YAML value.
    pub value: serde_yaml::Value,
    /// Block structure with byte spans.
    pub outline: Option<Block>,
    /// Document-local node tree.
    pub tree: Forest,
}

/// A loaded document. Immutable once parsed; autofix produces a new one.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    id: DocumentId,
    path: PathBuf,
    relative: PathBuf,
    text: String,
    index: LineIndex,
    kind: DocumentKind,
    content: Result<ParsedContent, ParseFailure>,
    directives: Vec<SuppressionDirective>,
    malformed: Vec<MalformedDirective>,
    lossy: bool,
}

impl SourceDocument {
    /// Parses `text` into a document.
    ///
    /// `path` is the resolved path used for inclusion lookups, `relative` the
    /// path reported in diagnostics. Malformed text is not an error: the
    /// failure is kept and line-level checks still apply.
    #[must_use]
    pub fn parse(id: DocumentId, path: PathBuf, relative: PathBuf, text: String) -> Self {
        let index = LineIndex::new(&text);
        let (content, kind) = match serde_yaml::from_str::<serde_yaml::Value>(&text) {
            Ok(value) => {
                let outline = outline::parse(&text);
                let (tree, kind) = tree::build(id, &text, &index, &value, outline.as_ref());
                (
                    Ok(ParsedContent {
                        value,
                        outline,
                        tree,
                    }),
                    kind,
                )
            }
            Err(err) => {
                let (line, column) = err
                    .location()
                    .map_or((1, 1), |loc| (loc.line().max(1), loc.column().max(1)));
                (
                    Err(ParseFailure {
                        message: err.to_string(),
                        line,
                        column,
                    }),
                    DocumentKind::Other,
                )
            }
        };

        Self::assemble(id, path, relative, text, index, content, kind, false)
    }

    /// Builds a document from bytes that are not valid UTF-8. The text is
    /// decoded lossily so line checks still run; the document itself is a
    /// parse failure pointing at the first invalid byte.
    #[must_use]
    pub fn undecodable(id: DocumentId, path: PathBuf, relative: PathBuf, bytes: &[u8]) -> Self {
        let valid_up_to = std::str::from_utf8(bytes)
            .err()
            .map_or(bytes.len(), |e| e.valid_up_to());
        let text = String::from_utf8_lossy(bytes).into_owned();
        let index = LineIndex::new(&text);
        let at = index.line_col(&text, valid_up_to);
        let failure = ParseFailure {
            message: format!("invalid UTF-8 at byte {valid_up_to}"),
            line: at.line,
            column: at.column,
        };
        Self::assemble(id, path, relative, text, index, Err(failure), DocumentKind::Other, true)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        id: DocumentId,
        path: PathBuf,
        relative: PathBuf,
        text: String,
        index: LineIndex,
        content: Result<ParsedContent, ParseFailure>,
        kind: DocumentKind,
        lossy: bool,
    ) -> Self {
        let (mut directives, malformed) = suppression::scan_inline(&text, &index);
        if let Ok(parsed) = &content {
            let starts = node_starts(&parsed.tree);
            for directive in &mut directives {
                if let Some(path) = starts.get(&directive.line) {
                    directive.scope = Scope::NodeSubtree(path.clone());
                }
            }
        }

        Self {
            id,
            path,
            relative,
            text,
            index,
            kind,
            content,
            directives,
            malformed,
            lossy,
        }
    }

    /// Document id.
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Resolved path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the project root, as reported in diagnostics.
    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative
    }

    /// Raw text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Shape of the document.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Parsed content, if the document is well-formed.
    #[must_use]
    pub fn content(&self) -> Option<&ParsedContent> {
        self.content.as_ref().ok()
    }

    /// Document-local node tree, if the document is well-formed.
    #[must_use]
    pub fn tree(&self) -> Option<&Forest> {
        self.content().map(|c| &c.tree)
    }

    /// True when the text was decoded lossily from invalid UTF-8 and must
    /// not be written back.
    #[must_use]
    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    /// Parse failure, if any.
    #[must_use]
    pub fn parse_failure(&self) -> Option<&ParseFailure> {
        self.content.as_ref().err()
    }

    /// Inline suppression directives found in comments.
    #[must_use]
    pub fn directives(&self) -> &[SuppressionDirective] {
        &self.directives
    }

    /// Inline directives that could not be understood.
    #[must_use]
    pub fn malformed_directives(&self) -> &[MalformedDirective] {
        &self.malformed
    }

    /// Number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        if self.text.is_empty() {
            0
        } else {
            self.index.line_count()
        }
    }

    /// Byte range of `line` (1-indexed) without its terminator.
    #[must_use]
    pub fn line_range(&self, line: usize) -> Range<usize> {
        self.index.line_range(&self.text, line)
    }

    /// Text of `line` (1-indexed) without its terminator.
    #[must_use]
    pub fn line_text(&self, line: usize) -> &str {
        &self.text[self.line_range(line)]
    }

    /// Line and column of a byte offset.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> LineCol {
        self.index.line_col(&self.text, offset)
    }

    /// Location of a byte range, reported against the relative path.
    #[must_use]
    pub fn location(&self, range: Range<usize>) -> Location {
        let start = self.line_col(range.start);
        Location::new(self.relative.clone(), start.line, start.column)
            .with_span(range.start, range.end.saturating_sub(range.start))
    }

    /// Location of the start of `line` covering the whole line.
    #[must_use]
    pub fn line_location(&self, line: usize) -> Location {
        self.location(self.line_range(line))
    }
}

/// Innermost non-root node starting on each line.
fn node_starts(tree: &Forest) -> BTreeMap<usize, NodePath> {
    let mut starts = BTreeMap::new();
    for id in tree.preorder() {
        let node = tree.node(id);
        if node.kind == NodeKind::DocumentRoot {
            continue;
        }
        // Pre-order visits parents first, so deeper nodes overwrite them.
        starts.insert(node.span.start.line, node.path.clone());
    }
    starts
}

/// Snapshot of every document reached during a run.
#[derive(Debug, Clone, Default)]
pub struct DocumentRegistry {
    by_id: BTreeMap<DocumentId, Arc<SourceDocument>>,
}

impl DocumentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document.
    pub fn insert(&mut self, document: Arc<SourceDocument>) {
        self.by_id.insert(document.id(), document);
    }

    /// Looks up a document by id.
    #[must_use]
    pub fn get(&self, id: DocumentId) -> Option<&Arc<SourceDocument>> {
        self.by_id.get(&id)
    }

    /// Looks up a document by its relative path.
    #[must_use]
    pub fn by_relative_path(&self, path: &Path) -> Option<&Arc<SourceDocument>> {
        self.by_id.values().find(|d| d.relative_path() == path)
    }

    /// All documents, ordered by relative path.
    #[must_use]
    pub fn documents(&self) -> Vec<&Arc<SourceDocument>> {
        let mut docs: Vec<_> = self.by_id.values().collect();
        docs.sort_by(|a, b| a.relative_path().cmp(b.relative_path()));
        docs
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if no document was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> SourceDocument {
        SourceDocument::parse(
            DocumentId(0),
            PathBuf::from("/p/site.yml"),
            PathBuf::from("site.yml"),
            text.to_string(),
        )
    }

    #[test]
    fn line_index_maps_offsets() {
        let text = "a: 1\nbé: 2\n";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.line_col(text, 0), LineCol { line: 1, column: 1 });
        assert_eq!(index.line_col(text, 5), LineCol { line: 2, column: 1 });
        // 'é' is two bytes but one column.
        assert_eq!(index.line_col(text, 8), LineCol { line: 2, column: 3 });
        assert_eq!(index.line_range(text, 2), 5..11);
    }

    #[test]
    fn line_range_strips_carriage_return() {
        let text = "a: 1\r\nb: 2";
        let index = LineIndex::new(text);
        assert_eq!(&text[index.line_range(text, 1)], "a: 1");
        assert_eq!(&text[index.line_range(text, 2)], "b: 2");
    }

    #[test]
    fn malformed_text_keeps_lines() {
        let d = doc("- name: x\n  foo: [unclosed\n");
        assert!(d.parse_failure().is_some());
        assert!(d.tree().is_none());
        assert_eq!(d.line_count(), 2);
        assert_eq!(d.kind(), DocumentKind::Other);
    }

    #[test]
    fn invalid_utf8_is_a_parse_failure_at_the_bad_byte() {
        let d = SourceDocument::undecodable(
            DocumentId(0),
            PathBuf::from("/p/bad.yml"),
            PathBuf::from("bad.yml"),
            b"- debug: {}\n- name: x\xff\n",
        );
        let failure = d.parse_failure().unwrap();
        assert_eq!((failure.line, failure.column), (2, 10));
        assert!(failure.message.contains("UTF-8"));
        assert!(d.tree().is_none());
        assert!(d.is_lossy());
        assert_eq!(d.line_count(), 2);
    }

    #[test]
    fn detects_playbook_and_task_lists() {
        assert_eq!(
            doc("- hosts: all\n  tasks: []\n").kind(),
            DocumentKind::Playbook
        );
        assert_eq!(
            doc("- ansible.builtin.debug:\n    msg: hi\n").kind(),
            DocumentKind::TaskList
        );
        assert_eq!(doc("foo: 1\n").kind(), DocumentKind::Mapping);
        assert_eq!(doc("").kind(), DocumentKind::Empty);
    }

    #[test]
    fn noqa_on_task_line_scopes_to_node() {
        let d = doc("- name: a\n  debug: {}\n- debug: {}  # noqa: name-missing\n");
        let directive = &d.directives()[0];
        assert_eq!(directive.line, 3);
        assert!(matches!(&directive.scope, Scope::NodeSubtree(p) if p.to_string() == "1"));
    }
}
