//! Builds the document-local node tree from a parsed value and its outline.

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::ops::Range;

use crate::document::{DocumentId, DocumentKind, LineIndex};
use crate::node::{Attribute, Forest, NewNode, NodeId, NodeKind, NodePath, Section, Span};
use crate::outline::{Block, Entry};

/// Builds the tree of one document.
pub(crate) fn build(
    document: DocumentId,
    text: &str,
    index: &LineIndex,
    value: &Value,
    outline: Option<&Block>,
) -> (Forest, DocumentKind) {
    let mut builder = Builder {
        document,
        text,
        index,
        forest: Forest::new(),
    };
    let root = builder.push(
        NodeKind::DocumentRoot,
        None,
        IndexMap::new(),
        0..text.len(),
        NodePath::root(),
        None,
    );

    let kind = match value {
        Value::Sequence(items) => {
            let playbook = items.iter().any(is_play);
            for (i, item) in items.iter().enumerate() {
                let item_outline = outline.and_then(|o| o.items().get(i));
                let range = item_outline.map_or(0..text.len(), |o| o.range.clone());
                let content = item_outline.and_then(|o| o.value.as_ref());
                let path = NodePath::root().child(index_u32(i));
                if playbook {
                    builder.play(item, content, range, path, root);
                } else {
                    builder.task(item, content, range, path, root, false, None);
                }
            }
            if playbook {
                DocumentKind::Playbook
            } else {
                DocumentKind::TaskList
            }
        }
        Value::Mapping(_) => DocumentKind::Mapping,
        Value::Null => DocumentKind::Empty,
        _ => DocumentKind::Other,
    };

    (builder.forest, kind)
}

/// Range and outline of item `index` in a section list. An item the
/// outline cannot place (an aliased list) points at the section's value,
/// never at the parent node.
fn locate_item<'o>(
    section: Option<&'o Entry>,
    index: usize,
    parent: &Range<usize>,
) -> (Range<usize>, Option<&'o Block>) {
    let list = section.and_then(|e| e.value.as_ref());
    if let Some(item) = list.and_then(|l| l.items().get(index)) {
        return (item.range.clone(), item.value.as_ref());
    }
    let range = list
        .map(|l| l.range.clone())
        .or_else(|| section.map(|e| e.key_range.clone()))
        .unwrap_or_else(|| parent.clone());
    (range, None)
}

fn is_play(value: &Value) -> bool {
    value.as_mapping().is_some_and(|m| {
        m.keys().any(|k| {
            matches!(
                k.as_str(),
                Some("hosts" | "import_playbook" | "ansible.builtin.import_playbook")
            )
        })
    })
}

fn index_u32(i: usize) -> u32 {
    u32::try_from(i).unwrap_or(u32::MAX)
}

/// Renders a mapping key as text.
pub(crate) fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

struct Builder<'a> {
    document: DocumentId,
    text: &'a str,
    index: &'a LineIndex,
    forest: Forest,
}

impl Builder<'_> {
    fn span(&self, range: Range<usize>) -> Span {
        Span {
            document: self.document,
            start: self.index.line_col(self.text, range.start),
            end: self.index.line_col(self.text, range.end),
            range,
        }
    }

    fn push(
        &mut self,
        kind: NodeKind,
        section: Option<Section>,
        attributes: IndexMap<String, Attribute>,
        range: Range<usize>,
        path: NodePath,
        parent: Option<NodeId>,
    ) -> NodeId {
        let span = self.span(range);
        self.forest.push(
            NewNode {
                kind,
                section,
                attributes,
                span,
                path,
            },
            parent,
        )
    }

    /// Collects entries of `map` into attributes, skipping section keys.
    fn attributes(
        map: &Mapping,
        outline: Option<&Block>,
        sections: &[&str],
    ) -> IndexMap<String, Attribute> {
        map.iter()
            .filter_map(|(key, value)| {
                let key = key_text(key);
                if sections.contains(&key.as_str()) {
                    return None;
                }
                let entry = outline.and_then(|o| o.entry(&key));
                Some((
                    key,
                    Attribute {
                        value: value.clone(),
                        key_range: entry.map(|e| e.key_range.clone()),
                        value_range: entry.and_then(|e| e.value.as_ref()).map(|v| v.range.clone()),
                    },
                ))
            })
            .collect()
    }

    fn play(
        &mut self,
        value: &Value,
        outline: Option<&Block>,
        range: Range<usize>,
        path: NodePath,
        parent: NodeId,
    ) {
        const PLAY_SECTIONS: &[&str] = &["pre_tasks", "tasks", "post_tasks", "handlers", "roles"];
        let empty = Mapping::new();
        let map = value.as_mapping().unwrap_or(&empty);
        let attributes = Self::attributes(map, outline, PLAY_SECTIONS);
        let play = self.push(
            NodeKind::Play,
            None,
            attributes,
            range.clone(),
            path.clone(),
            Some(parent),
        );

        let mut ordinal = 0;
        for (key, section_value) in map {
            let key = key_text(key);
            let Some(section) = Section::from_key(&key) else {
                continue;
            };
            if !PLAY_SECTIONS.contains(&key.as_str()) {
                continue;
            }
            let Some(items) = section_value.as_sequence() else {
                continue;
            };
            let entry = outline.and_then(|o| o.entry(&key));
            for (i, item) in items.iter().enumerate() {
                let (item_range, content) = locate_item(entry, i, &range);
                let child_path = path.child(ordinal);
                ordinal += 1;
                match section {
                    Section::Roles => {
                        self.role_reference(item, content, item_range, child_path, play);
                    }
                    Section::Handlers => {
                        self.task(item, content, item_range, child_path, play, true, Some(section));
                    }
                    _ => {
                        self.task(item, content, item_range, child_path, play, false, Some(section));
                    }
                }
            }
        }
    }

    fn role_reference(
        &mut self,
        value: &Value,
        outline: Option<&Block>,
        range: Range<usize>,
        path: NodePath,
        parent: NodeId,
    ) {
        let attributes = match value {
            Value::Mapping(map) => Self::attributes(map, outline, &[]),
            other => {
                let mut attrs = IndexMap::new();
                attrs.insert(
                    "role".to_string(),
                    Attribute {
                        value: other.clone(),
                        key_range: None,
                        value_range: outline.map(|o| o.range.clone()),
                    },
                );
                attrs
            }
        };
        self.push(
            NodeKind::RoleReference,
            Some(Section::Roles),
            attributes,
            range,
            path,
            Some(parent),
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn task(
        &mut self,
        value: &Value,
        outline: Option<&Block>,
        range: Range<usize>,
        path: NodePath,
        parent: NodeId,
        handler: bool,
        section: Option<Section>,
    ) {
        const BLOCK_SECTIONS: &[&str] = &["block", "rescue", "always"];
        let empty = Mapping::new();
        let map = value.as_mapping().unwrap_or(&empty);

        if !map.contains_key("block") {
            let kind = if handler {
                NodeKind::Handler
            } else {
                NodeKind::Task
            };
            let attributes = Self::attributes(map, outline, &[]);
            self.push(kind, section, attributes, range, path, Some(parent));
            return;
        }

        let attributes = Self::attributes(map, outline, BLOCK_SECTIONS);
        let block = self.push(
            NodeKind::Block,
            section,
            attributes,
            range.clone(),
            path.clone(),
            Some(parent),
        );
        let mut ordinal = 0;
        for key in BLOCK_SECTIONS {
            let Some(items) = map.get(*key).and_then(Value::as_sequence) else {
                continue;
            };
            let entry = outline.and_then(|o| o.entry(key));
            for (i, item) in items.iter().enumerate() {
                let (item_range, content) = locate_item(entry, i, &range);
                let child_path = path.child(ordinal);
                ordinal += 1;
                self.task(
                    item,
                    content,
                    item_range,
                    child_path,
                    block,
                    handler,
                    Section::from_key(key),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_text(text: &str) -> (Forest, DocumentKind) {
        let value: Value = serde_yaml::from_str(text).unwrap();
        let outline = crate::outline::parse(text);
        build(DocumentId(7), text, &LineIndex::new(text), &value, outline.as_ref())
    }

    #[test]
    fn builds_plays_blocks_and_handlers() {
        let text = "\
- hosts: all
  tasks:
    - name: grouped
      block:
        - debug: {}
      rescue:
        - command: false
  handlers:
    - name: restart
      service: {}
";
        let (forest, kind) = build_text(text);
        assert_eq!(kind, DocumentKind::Playbook);
        let kinds: Vec<_> = forest
            .preorder()
            .into_iter()
            .map(|id| forest.node(id).kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::DocumentRoot,
                NodeKind::Play,
                NodeKind::Block,
                NodeKind::Task,
                NodeKind::Task,
                NodeKind::Handler,
            ]
        );
        let block = forest
            .preorder()
            .into_iter()
            .map(|id| forest.node(id))
            .find(|n| n.kind == NodeKind::Block)
            .unwrap();
        assert!(block.attr("block").is_none());
        assert_eq!(block.span.start.line, 3);
        assert_eq!(block.path.to_string(), "0/0");
        let rescue = forest.node(block.children[1]);
        assert_eq!(rescue.section, Some(Section::Rescue));
        assert_eq!(rescue.path.to_string(), "0/0/1");
    }

    #[test]
    fn attribute_ranges_point_into_text() {
        let text = "- name: Fetch\n  get_url:\n    url: x\n";
        let (forest, kind) = build_text(text);
        assert_eq!(kind, DocumentKind::TaskList);
        let task = forest.node(forest.node(forest.roots()[0]).children[0]);
        let name = task.attr("name").unwrap();
        assert_eq!(&text[name.value_range.clone().unwrap()], "Fetch");
        assert_eq!(&text[name.key_range.clone().unwrap()], "name");
        assert_eq!(task.span.document, DocumentId(7));
        assert_eq!(task.action().as_deref(), Some("get_url"));
    }

    #[test]
    fn string_roles_become_references() {
        let text = "- hosts: web\n  roles:\n    - common\n    - role: nginx\n";
        let (forest, _) = build_text(text);
        let refs: Vec<_> = forest
            .preorder()
            .into_iter()
            .map(|id| forest.node(id))
            .filter(|n| n.kind == NodeKind::RoleReference)
            .collect();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].attr("role").and_then(Attribute::as_str), Some("common"));
        assert_eq!(refs[1].attr("role").and_then(Attribute::as_str), Some("nginx"));
    }

    #[test]
    fn anchored_sections_keep_item_positions() {
        let text = "- hosts: all\n  tasks: &t\n    - debug:\n        msg: a\n    - ping: {}\n  handlers: *t\n";
        let (forest, _) = build_text(text);
        let play = forest.node(forest.node(forest.roots()[0]).children[0]);
        let lines: Vec<_> = play
            .children
            .iter()
            .map(|id| forest.node(*id))
            .map(|n| (n.kind, n.span.start.line))
            .collect();
        assert_eq!(
            lines,
            vec![
                (NodeKind::Task, 3),
                (NodeKind::Task, 5),
                (NodeKind::Handler, 6),
                (NodeKind::Handler, 6),
            ]
        );
        assert_ne!(play.span.start.line, 6);
    }
}
