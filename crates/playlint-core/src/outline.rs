//! Outline of block YAML with byte spans.
//!
//! `serde_yaml` gives values but no positions. The outline walks the
//! lossless syntax tree from `yaml_parser` to recover where each mapping
//! entry and sequence item lives in the text, so nodes and attributes can
//! point back at their source. Flow collections and scalars are opaque:
//! only their extent is recorded.

use std::ops::Range;

use rowan::TextRange;
use yaml_parser::{SyntaxKind, SyntaxNode};

/// A block of YAML content and its byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Byte range covered by the block, trailing comments excluded.
    pub range: Range<usize>,
    /// Structure of the block.
    pub kind: BlockKind,
}

/// Structure of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// `key: value` entries.
    Mapping(Vec<Entry>),
    /// `- item` entries.
    Sequence(Vec<Item>),
    /// Scalar, block scalar or flow collection.
    Scalar,
}

/// One mapping entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Unquoted key text.
    pub key: String,
    /// Range of the key as written (quotes included).
    pub key_range: Range<usize>,
    /// Value block, absent for `key:` with nothing after it.
    pub value: Option<Block>,
    /// Range from the key to the end of the value.
    pub range: Range<usize>,
}

/// One sequence item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Range from the dash to the end of the content.
    pub range: Range<usize>,
    /// Item content, absent for a bare `-`.
    pub value: Option<Block>,
}

impl Block {
    /// Mapping entries, if this is a mapping.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        match &self.kind {
            BlockKind::Mapping(entries) => entries,
            _ => &[],
        }
    }

    /// Sequence items, if this is a sequence.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        match &self.kind {
            BlockKind::Sequence(items) => items,
            _ => &[],
        }
    }

    /// Finds the entry for `key`.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries().iter().find(|e| e.key == key)
    }
}

/// Builds the outline of `text`. Returns `None` for an empty document or
/// text the YAML parser rejects.
#[must_use]
pub fn parse(text: &str) -> Option<Block> {
    let root = yaml_parser::parse(text).ok()?;
    content(text, &root, 0)
}

fn is_scalar(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::PLAIN_SCALAR
            | SyntaxKind::SINGLE_QUOTED_SCALAR
            | SyntaxKind::DOUBLE_QUOTED_SCALAR
            | SyntaxKind::BLOCK_SCALAR
            | SyntaxKind::FLOW_MAP
            | SyntaxKind::FLOW_SEQ
            | SyntaxKind::ALIAS
    )
}

fn to_range(range: TextRange) -> Range<usize> {
    usize::from(range.start())..usize::from(range.end())
}

/// Shrinks `range` to its non-blank part.
fn trimmed(text: &str, range: Range<usize>) -> Range<usize> {
    let slice = &text[range.clone()];
    let start = range.start + (slice.len() - slice.trim_start().len());
    let end = range.end - (slice.len() - slice.trim_end().len());
    start..end.max(start)
}

/// Range of `node` from its first to its last meaningful token. Comments
/// and whitespace the parser attaches to a node are left out.
fn span(text: &str, node: &SyntaxNode) -> Range<usize> {
    let mut tokens = node
        .descendants_with_tokens()
        .filter_map(|element| element.into_token())
        .filter(|token| token.kind() != SyntaxKind::COMMENT && !token.text().trim().is_empty())
        .map(|token| trimmed(text, to_range(token.text_range())));
    let Some(first) = tokens.next() else {
        return trimmed(text, to_range(node.text_range()));
    };
    let end = tokens.last().map_or(first.end, |last| last.end);
    first.start..end
}

/// First collection or scalar below `node` starting at or after `from`.
/// Anchors, tags and the dash or colon of the owner are passed over.
fn content(text: &str, node: &SyntaxNode, from: usize) -> Option<Block> {
    for element in node.descendants_with_tokens().skip(1) {
        if usize::from(element.text_range().start()) < from {
            continue;
        }
        let kind = element.kind();
        let found = match element.as_node() {
            Some(child) if kind == SyntaxKind::BLOCK_MAP => mapping(text, child),
            Some(child) if kind == SyntaxKind::BLOCK_SEQ => sequence(text, child),
            Some(child) if is_scalar(kind) => Block {
                range: span(text, child),
                kind: BlockKind::Scalar,
            },
            None if is_scalar(kind) => Block {
                range: trimmed(text, to_range(element.text_range())),
                kind: BlockKind::Scalar,
            },
            _ => continue,
        };
        return Some(found);
    }
    None
}

fn mapping(text: &str, node: &SyntaxNode) -> Block {
    let entries: Vec<Entry> = node
        .children()
        .filter(|child| child.kind() == SyntaxKind::BLOCK_MAP_ENTRY)
        .filter_map(|child| entry(text, &child))
        .collect();
    Block {
        range: span(text, node),
        kind: BlockKind::Mapping(entries),
    }
}

fn entry(text: &str, node: &SyntaxNode) -> Option<Entry> {
    let key_range = node
        .descendants_with_tokens()
        .skip(1)
        .find(|element| is_scalar(element.kind()))
        .map(|element| match element.as_node() {
            Some(key) => span(text, key),
            None => trimmed(text, to_range(element.text_range())),
        })?;
    let value = content(text, node, key_range.end);
    let range = span(text, node);
    Some(Entry {
        key: unquote(&text[key_range.clone()]).to_string(),
        key_range: key_range.clone(),
        value,
        range: key_range.start..range.end.max(key_range.end),
    })
}

fn sequence(text: &str, node: &SyntaxNode) -> Block {
    let items: Vec<Item> = node
        .children()
        .filter(|child| child.kind() == SyntaxKind::BLOCK_SEQ_ENTRY)
        .map(|child| Item {
            range: span(text, &child),
            value: content(text, &child, 0),
        })
        .collect();
    Block {
        range: span(text, node),
        kind: BlockKind::Sequence(items),
    }
}

fn unquote(key: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|q| key.strip_prefix(*q).and_then(|k| k.strip_suffix(*q)))
        .unwrap_or(key)
}

/// Strips a trailing comment and whitespace, honouring quotes.
pub fn strip_comment(text: &str) -> &str {
    match comment_start(text) {
        Some(i) => text[..i].trim_end(),
        None => text.trim_end(),
    }
}

/// Byte offset of the `#` opening a comment on this line, if any.
pub fn comment_start(text: &str) -> Option<usize> {
    let mut quote = None;
    let mut prev_space = true;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' if prev_space => quote = Some(c),
                '#' if prev_space => return Some(i),
                _ => {}
            },
        }
        prev_space = c == ' ' || c == '\t';
    }
    None
}
