//! Document loading and inclusion resolution.
//!
//! Every document is read and parsed once per run. Resolution splices a
//! fresh copy of each referenced document's tree under the node that
//! references it: `include_tasks`/`import_tasks`, `include_role`/
//! `import_role`, `import_playbook` and play `roles:` entries.

use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use crate::document::{DocumentId, DocumentRegistry, SourceDocument};
use crate::ids;
use crate::node::{Forest, NewNode, Node, NodeId, NodeKind, Section};
use crate::template::is_templated;
use crate::types::{MatchCandidate, Severity};

/// Errors loading a root document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The document could not be read.
    #[error("Failed to read {path}: {message}")]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },
}

/// A root document with everything it includes spliced in.
#[derive(Debug)]
pub struct Resolution {
    /// Root document.
    pub root: Arc<SourceDocument>,
    /// Resolved tree with one root.
    pub forest: Forest,
    /// Every document the tree draws nodes from, the root included.
    pub reached: BTreeSet<DocumentId>,
    /// `load-failure` candidates for missing or cyclic references.
    pub failures: Vec<MatchCandidate>,
}

type Slot = Arc<OnceLock<Result<Arc<SourceDocument>, String>>>;

/// Loads documents on demand and resolves inclusions.
///
/// Safe to share between threads; a document requested concurrently is
/// still read only once.
#[derive(Debug)]
pub struct Loader {
    root: PathBuf,
    roles_path: Vec<PathBuf>,
    cache: DashMap<PathBuf, Slot>,
    next_id: AtomicU32,
    overlay: HashMap<PathBuf, String>,
}

const TASK_INCLUDES: &[&str] = &[
    "include_tasks",
    "import_tasks",
    "include",
    "ansible.builtin.include_tasks",
    "ansible.builtin.import_tasks",
    "ansible.builtin.include",
    "ansible.legacy.include_tasks",
    "ansible.legacy.import_tasks",
];

const ROLE_INCLUDES: &[&str] = &[
    "include_role",
    "import_role",
    "ansible.builtin.include_role",
    "ansible.builtin.import_role",
    "ansible.legacy.include_role",
    "ansible.legacy.import_role",
];

const PLAYBOOK_IMPORTS: &[&str] = &["import_playbook", "ansible.builtin.import_playbook"];

impl Loader {
    /// Creates a loader for the project at `root`. `roles_path` entries are
    /// searched for roles after the conventional locations.
    #[must_use]
    pub fn new(root: &Path, roles_path: &[PathBuf]) -> Self {
        let root = canonical(root);
        let roles_path = roles_path
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { root.join(p) })
            .collect();
        Self {
            root,
            roles_path,
            cache: DashMap::new(),
            next_id: AtomicU32::new(0),
            overlay: HashMap::new(),
        }
    }

    /// Serves the given texts instead of the files on disk. Keys are
    /// canonical paths.
    #[must_use]
    pub fn with_overlay(mut self, overlay: HashMap<PathBuf, String>) -> Self {
        self.overlay = overlay;
        self
    }

    /// Project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads a document, reading it on first request.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(&self, path: &Path) -> Result<Arc<SourceDocument>, LoadError> {
        let key = canonical(path);
        // Clone the slot out so the map shard is not held while parsing.
        let slot = Arc::clone(self.cache.entry(key.clone()).or_default().value());
        slot.get_or_init(|| self.read(&key))
            .clone()
            .map_err(|message| LoadError::Read {
                path: key.clone(),
                message,
            })
    }

    fn read(&self, path: &Path) -> Result<Arc<SourceDocument>, String> {
        let text = match self.overlay.get(path) {
            Some(text) => Ok(text.clone()),
            None => {
                let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
                String::from_utf8(bytes)
            }
        };
        let id = DocumentId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let relative = path
            .strip_prefix(&self.root)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf);
        tracing::debug!(file = %relative.display(), id = id.0, "loaded document");
        let document = match text {
            Ok(text) => SourceDocument::parse(id, path.to_path_buf(), relative, text),
            Err(err) => {
                tracing::warn!(file = %relative.display(), "document is not valid UTF-8");
                SourceDocument::undecodable(id, path.to_path_buf(), relative, err.as_bytes())
            }
        };
        Ok(Arc::new(document))
    }

    /// Snapshot of every document loaded so far.
    #[must_use]
    pub fn registry(&self) -> DocumentRegistry {
        let mut registry = DocumentRegistry::new();
        for slot in &self.cache {
            if let Some(Ok(doc)) = slot.value().get() {
                registry.insert(Arc::clone(doc));
            }
        }
        registry
    }

    /// Loads `path` and splices in everything it references.
    ///
    /// Missing references and cycles become `load-failure` candidates; the
    /// rest of the tree is still built.
    ///
    /// # Errors
    ///
    /// Returns an error only if the root document cannot be read.
    pub fn resolve(&self, path: &Path) -> Result<Resolution, LoadError> {
        let root = self.load(path)?;
        let mut walk = Walk {
            loader: self,
            forest: Forest::new(),
            reached: BTreeSet::new(),
            failures: Vec::new(),
            chain: vec![root.path().to_path_buf()],
        };
        walk.reached.insert(root.id());
        walk.splice(&root, None, false, None);
        Ok(Resolution {
            root,
            forest: walk.forest,
            reached: walk.reached,
            failures: walk.failures,
        })
    }

    fn find_role(&self, name: &str, from: &Path) -> Option<PathBuf> {
        let doc_dir = from.parent().unwrap_or(&self.root);
        let mut candidates = vec![doc_dir.join("roles").join(name), doc_dir.join(name)];
        // Role tasks referencing sibling roles: roles/a/tasks/main.yml -> roles/b
        if let Some(roles_dir) = doc_dir.parent().and_then(Path::parent) {
            if roles_dir.starts_with(&self.root) {
                candidates.push(roles_dir.join(name));
            }
        }
        candidates.push(self.root.join("roles").join(name));
        candidates.extend(self.roles_path.iter().map(|p| p.join(name)));
        candidates.into_iter().find(|p| p.join("tasks").is_dir() || p.join("handlers").is_dir())
    }
}

/// State of one resolution.
struct Walk<'a> {
    loader: &'a Loader,
    forest: Forest,
    reached: BTreeSet<DocumentId>,
    failures: Vec<MatchCandidate>,
    /// Canonical paths on the current inclusion chain.
    chain: Vec<PathBuf>,
}

impl Walk<'_> {
    /// Copies `document`'s tree under `parent`. Without a parent the
    /// document root itself becomes the forest root.
    fn splice(
        &mut self,
        document: &SourceDocument,
        parent: Option<NodeId>,
        handlers: bool,
        section: Option<Section>,
    ) {
        let Some(template) = document.tree() else {
            return;
        };
        for &root in template.roots() {
            match parent {
                None => {
                    self.copy(document, template, root, None, handlers, None);
                }
                Some(parent) => {
                    for &child in &template.node(root).children {
                        self.copy(document, template, child, Some(parent), handlers, section);
                    }
                }
            }
        }
    }

    fn copy(
        &mut self,
        document: &SourceDocument,
        template: &Forest,
        id: NodeId,
        parent: Option<NodeId>,
        handlers: bool,
        section: Option<Section>,
    ) {
        let source = template.node(id);
        let handlers = match source.section {
            Some(Section::Handlers) => true,
            Some(Section::PreTasks | Section::Tasks | Section::PostTasks) => false,
            _ => handlers,
        };
        let kind = match source.kind {
            NodeKind::Task if handlers => NodeKind::Handler,
            other => other,
        };
        let new_id = self.forest.push(
            NewNode {
                kind,
                section: section.or(source.section),
                attributes: source.attributes.clone(),
                span: source.span.clone(),
                path: source.path.clone(),
            },
            parent,
        );
        for &child in &source.children {
            self.copy(document, template, child, Some(new_id), handlers, None);
        }
        self.follow(document, source, new_id, handlers);
    }

    /// Resolves the reference a node makes, if any.
    fn follow(&mut self, document: &SourceDocument, node: &Node, id: NodeId, handlers: bool) {
        match node.kind {
            NodeKind::Play => {
                let target = PLAYBOOK_IMPORTS
                    .iter()
                    .find_map(|key| node.attr(key))
                    .and_then(|a| a.as_str());
                if let Some(target) = target {
                    self.include_file(document, node, id, target, false, Section::Included);
                }
            }
            NodeKind::RoleReference => {
                let name = node
                    .attr("role")
                    .or_else(|| node.attr("name"))
                    .and_then(|a| a.as_str());
                if let Some(name) = name {
                    self.include_role(document, node, id, name, None);
                }
            }
            NodeKind::Task | NodeKind::Handler => {
                let Some((key, attr)) = node.action_entry() else {
                    return;
                };
                if TASK_INCLUDES.contains(&key) {
                    let target = match &attr.value {
                        serde_yaml::Value::String(s) => Some(s.as_str()),
                        serde_yaml::Value::Mapping(m) => m.get("file").and_then(|v| v.as_str()),
                        _ => None,
                    };
                    if let Some(target) = target {
                        self.include_file(document, node, id, target, handlers, Section::Included);
                    }
                } else if ROLE_INCLUDES.contains(&key) {
                    let name = attr.value.get("name").and_then(|v| v.as_str());
                    let tasks_from = attr.value.get("tasks_from").and_then(|v| v.as_str());
                    if let Some(name) = name {
                        self.include_role(document, node, id, name, tasks_from);
                    }
                }
            }
            NodeKind::DocumentRoot | NodeKind::Block => {}
        }
    }

    fn include_file(
        &mut self,
        document: &SourceDocument,
        node: &Node,
        parent: NodeId,
        target: &str,
        handlers: bool,
        section: Section,
    ) {
        if is_templated(target) {
            tracing::debug!(target, "skipping templated include");
            return;
        }
        let doc_dir = document.path().parent().unwrap_or(self.loader.root());
        let found = [doc_dir.join(target), self.loader.root().join(target)]
            .into_iter()
            .find(|p| p.is_file());
        let Some(path) = found else {
            self.fail(document, node, "missing", format!("included file '{target}' not found"));
            return;
        };
        self.enter(document, node, parent, &path, handlers, section);
    }

    fn include_role(
        &mut self,
        document: &SourceDocument,
        node: &Node,
        parent: NodeId,
        name: &str,
        tasks_from: Option<&str>,
    ) {
        if is_templated(name) {
            tracing::debug!(role = name, "skipping templated role");
            return;
        }
        let Some(role_dir) = self.loader.find_role(name, document.path()) else {
            if name.contains('.') {
                // Collection roles live outside the project.
                tracing::debug!(role = name, "skipping unresolved collection role");
            } else {
                self.fail(document, node, "missing", format!("role '{name}' not found"));
            }
            return;
        };

        let tasks = tasks_from.unwrap_or("main");
        if let Some(path) = main_file(&role_dir.join("tasks"), tasks) {
            self.enter(document, node, parent, &path, false, Section::Tasks);
        } else if tasks_from.is_some() {
            self.fail(
                document,
                node,
                "missing",
                format!("tasks file '{tasks}' of role '{name}' not found"),
            );
        }
        if let Some(path) = main_file(&role_dir.join("handlers"), "main") {
            self.enter(document, node, parent, &path, true, Section::Handlers);
        }
    }

    fn enter(
        &mut self,
        document: &SourceDocument,
        node: &Node,
        parent: NodeId,
        path: &Path,
        handlers: bool,
        section: Section,
    ) {
        let canonical = canonical(path);
        if self.chain.contains(&canonical) {
            let relative = canonical
                .strip_prefix(self.loader.root())
                .unwrap_or(&canonical)
                .display()
                .to_string();
            self.fail(document, node, "cycle", format!("cyclic inclusion of '{relative}'"));
            return;
        }
        let included = match self.loader.load(&canonical) {
            Ok(doc) => doc,
            Err(err) => {
                self.fail(document, node, "missing", err.to_string());
                return;
            }
        };
        self.reached.insert(included.id());
        self.chain.push(canonical);
        self.splice(&included, Some(parent), handlers, Some(section));
        self.chain.pop();
    }

    fn fail(&mut self, document: &SourceDocument, node: &Node, sub_tag: &str, message: String) {
        let line_end = document.line_range(node.span.start.line).end;
        let start = node.span.range.start;
        self.failures.push(MatchCandidate {
            rule_id: ids::LOAD_FAILURE.to_string(),
            sub_tag: Some(sub_tag.to_string()),
            message,
            location: document.location(start..line_end.max(start)),
            document: Some(document.id()),
            node: Some(node.path.clone()),
            severity: Severity::Error,
            fix: None,
        });
    }
}

fn main_file(dir: &Path, stem: &str) -> Option<PathBuf> {
    let direct = dir.join(stem);
    if direct.extension().is_some() && direct.is_file() {
        return Some(direct);
    }
    ["yml", "yaml"]
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
