//! Context types for rule execution.

use std::ops::Range;
use std::path::{Component, Path};

use crate::document::SourceDocument;
use crate::node::{Attribute, Forest, Node, NodeId};

/// Context provided to line rules.
#[derive(Debug, Clone)]
pub struct LineContext<'a> {
    /// Document the line belongs to.
    pub document: &'a SourceDocument,
    /// Line number (1-indexed).
    pub line: usize,
    /// Line text without its terminator.
    pub text: &'a str,
    /// Byte range of the line in the document.
    pub range: Range<usize>,
}

impl<'a> LineContext<'a> {
    /// Creates a context for `line` of `document`.
    #[must_use]
    pub fn new(document: &'a SourceDocument, line: usize) -> Self {
        let range = document.line_range(line);
        Self {
            document,
            line,
            text: &document.text()[range.clone()],
            range,
        }
    }

    /// Returns true if this is the last line of the document.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.line == self.document.line_count()
    }
}

/// Context provided to node rules.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    /// Resolved tree the node lives in.
    pub forest: &'a Forest,
    /// The node being checked.
    pub id: NodeId,
    /// Document the node was written in.
    pub document: &'a SourceDocument,
}

impl<'a> NodeContext<'a> {
    /// The node being checked.
    #[must_use]
    pub fn node(&self) -> &'a Node {
        self.forest.node(self.id)
    }

    /// Looks up an attribute of the node.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&'a Attribute> {
        self.node().attr(key)
    }

    /// Parent of the node.
    #[must_use]
    pub fn parent(&self) -> Option<&'a Node> {
        self.forest.parent(self.id)
    }

    /// Ancestors of the node, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &'a Node> + 'a {
        self.forest.ancestors(self.id)
    }

    /// Children of the node.
    pub fn children(&self) -> impl Iterator<Item = &'a Node> + 'a {
        self.forest.children(self.id)
    }

    /// Source text of a range in the node's document.
    #[must_use]
    pub fn source(&self, range: Range<usize>) -> &'a str {
        self.document.text().get(range).unwrap_or("")
    }

    /// Returns true if the node's document lives under a `roles/` directory.
    #[must_use]
    pub fn in_role(&self) -> bool {
        is_role_path(self.document.path())
    }
}

/// Context provided to document rules.
#[derive(Debug, Clone, Copy)]
pub struct DocumentContext<'a> {
    /// The document.
    pub document: &'a SourceDocument,
    /// Document-local tree, absent when the document failed to parse.
    pub tree: Option<&'a Forest>,
}

impl<'a> DocumentContext<'a> {
    /// Creates a context for `document`.
    #[must_use]
    pub fn new(document: &'a SourceDocument) -> Self {
        Self {
            document,
            tree: document.tree(),
        }
    }

    /// Raw text of the document.
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.document.text()
    }
}

fn is_role_path(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(s) if s == "roles"))
}
