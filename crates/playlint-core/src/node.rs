//! Node model: an arena of plays, blocks, tasks, handlers and role references.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::document::{DocumentId, LineCol};

/// Index of a node inside its [`Forest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Root of one document.
    DocumentRoot,
    /// A play in a playbook.
    Play,
    /// A `block:` grouping with optional `rescue:` and `always:`.
    Block,
    /// A task.
    Task,
    /// A task reached in handler context.
    Handler,
    /// An entry of a play's `roles:` list.
    RoleReference,
}

impl NodeKind {
    /// Returns true for tasks and handlers.
    #[must_use]
    pub fn is_task_like(self) -> bool {
        matches!(self, Self::Task | Self::Handler)
    }
}

/// Which list of its parent a node sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// `pre_tasks:`
    PreTasks,
    /// `tasks:`
    Tasks,
    /// `post_tasks:`
    PostTasks,
    /// `handlers:`
    Handlers,
    /// `roles:`
    Roles,
    /// `block:`
    Block,
    /// `rescue:`
    Rescue,
    /// `always:`
    Always,
    /// Spliced in from an included document.
    Included,
}

impl Section {
    /// Maps a mapping key to the section it opens, if any.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "pre_tasks" => Self::PreTasks,
            "tasks" => Self::Tasks,
            "post_tasks" => Self::PostTasks,
            "handlers" => Self::Handlers,
            "roles" => Self::Roles,
            "block" => Self::Block,
            "rescue" => Self::Rescue,
            "always" => Self::Always,
            _ => return None,
        })
    }
}

/// Ordinal route from the document root to a node, e.g. `0/2/1`.
///
/// Local to the node's own document, so it stays the same in every copy
/// spliced into a resolved tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct NodePath(Vec<u32>);

impl NodePath {
    /// The root path.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of the `index`-th child.
    #[must_use]
    pub fn child(&self, index: u32) -> Self {
        let mut steps = self.0.clone();
        steps.push(index);
        Self(steps)
    }

    /// Returns true if `other` is this node or one of its descendants.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Depth below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Source span of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Document the node was written in.
    pub document: DocumentId,
    /// Byte range in that document.
    pub range: Range<usize>,
    /// Start position.
    pub start: LineCol,
    /// End position.
    pub end: LineCol,
}

/// A mapping entry of a node with the source ranges it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Parsed value.
    pub value: serde_yaml::Value,
    /// Range of the key, when it could be located.
    pub key_range: Option<Range<usize>>,
    /// Range of the value, when it could be located.
    pub value_range: Option<Range<usize>>,
}

impl Attribute {
    /// String value, if the attribute is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// Keywords a task may carry besides its action.
const TASK_KEYWORDS: &[&str] = &[
    "action",
    "any_errors_fatal",
    "args",
    "async",
    "become",
    "become_exe",
    "become_flags",
    "become_method",
    "become_user",
    "changed_when",
    "check_mode",
    "collections",
    "connection",
    "debugger",
    "delay",
    "delegate_facts",
    "delegate_to",
    "diff",
    "environment",
    "failed_when",
    "ignore_errors",
    "ignore_unreachable",
    "listen",
    "local_action",
    "loop",
    "loop_control",
    "module_defaults",
    "name",
    "no_log",
    "notify",
    "poll",
    "port",
    "register",
    "remote_user",
    "retries",
    "run_once",
    "tags",
    "throttle",
    "timeout",
    "until",
    "vars",
    "when",
];

/// A node. Immutable once its forest is built.
#[derive(Debug, Clone)]
pub struct Node {
    /// Arena index.
    pub id: NodeId,
    /// Kind.
    pub kind: NodeKind,
    /// Section of the parent this node sits in.
    pub section: Option<Section>,
    /// Entries in source order, section keys excluded.
    pub attributes: IndexMap<String, Attribute>,
    /// Children in source order.
    pub children: Vec<NodeId>,
    /// Parent, `None` for roots.
    pub parent: Option<NodeId>,
    /// Source span.
    pub span: Span,
    /// Route inside the node's own document.
    pub path: NodePath,
}

impl Node {
    /// Looks up an attribute.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    /// The `name:` value, if it is a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.attr("name").and_then(Attribute::as_str)
    }

    /// Key and attribute holding the task's action (`ansible.builtin.copy`,
    /// `shell`, ...). `action:` and `local_action:` count as the action key.
    #[must_use]
    pub fn action_entry(&self) -> Option<(&str, &Attribute)> {
        if !self.kind.is_task_like() {
            return None;
        }
        for key in ["action", "local_action"] {
            if let Some(attr) = self.attributes.get(key) {
                return Some((key, attr));
            }
        }
        self.attributes
            .iter()
            .find(|(key, _)| !TASK_KEYWORDS.contains(&key.as_str()) && !key.starts_with("with_"))
            .map(|(key, attr)| (key.as_str(), attr))
    }

    /// Module name of the task's action.
    #[must_use]
    pub fn action(&self) -> Option<String> {
        let (key, attr) = self.action_entry()?;
        if key != "action" && key != "local_action" {
            return Some(key.to_string());
        }
        match &attr.value {
            serde_yaml::Value::String(s) => s.split_whitespace().next().map(str::to_string),
            serde_yaml::Value::Mapping(map) => map
                .get("module")
                .and_then(serde_yaml::Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }
}

/// Fields of a node before it is placed in a forest.
#[derive(Debug, Clone)]
pub(crate) struct NewNode {
    pub kind: NodeKind,
    pub section: Option<Section>,
    pub attributes: IndexMap<String, Attribute>,
    pub span: Span,
    pub path: NodePath,
}

/// Arena of nodes with one or more roots.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl Forest {
    /// Creates an empty forest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, new: NewNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Node {
            id,
            kind: new.kind,
            section: new.section,
            attributes: new.attributes,
            children: Vec::new(),
            parent,
            span: new.span,
            path: new.path,
        });
        match parent {
            Some(p) => self.nodes[p.0 as usize].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Returns a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this forest.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Returns a node, or `None` for a foreign id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Root nodes.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the forest has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        self.node(id).parent.map(|p| self.node(p))
    }

    /// Children of a node in order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        self.node(id).children.iter().map(|c| self.node(*c))
    }

    /// Ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        let mut current = self.node(id).parent;
        std::iter::from_fn(move || {
            let node = self.node(current?);
            current = node.parent;
            Some(node)
        })
    }

    /// All node ids in pre-order, roots in order.
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }

    /// Nodes written in `document`, in pre-order.
    #[must_use]
    pub fn nodes_from(&self, document: DocumentId) -> Vec<&Node> {
        self.preorder()
            .into_iter()
            .map(|id| self.node(id))
            .filter(|n| n.span.document == document)
            .collect()
    }
}
