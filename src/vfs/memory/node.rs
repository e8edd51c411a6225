/*!
 * Filesystem Node Types
 * Arena tree of files and directories with parent back-references
 */

use ahash::RandomState;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::super::paths;
use super::super::stream::{content_length, Chunk};
use super::super::types::{Entity, Timestamps};

pub(super) type NodeId = u64;

pub(super) const ROOT_ID: NodeId = 0;

/// In-memory filesystem node
#[derive(Debug, Clone)]
pub(super) struct Node {
    pub parent: Option<NodeId>,
    pub name: String,
    pub times: Timestamps,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub(super) enum NodeKind {
    File {
        chunks: Vec<Arc<Chunk>>,
    },
    Directory {
        /// Keyed by lookup name (lowercased on case-insensitive volumes)
        children: BTreeMap<String, NodeId>,
    },
}

impl Node {
    pub fn directory(parent: Option<NodeId>, name: String, times: Timestamps) -> Self {
        Self {
            parent,
            name,
            times,
            kind: NodeKind::Directory {
                children: BTreeMap::new(),
            },
        }
    }

    pub fn file(parent: NodeId, name: String, times: Timestamps) -> Self {
        Self {
            parent: Some(parent),
            name,
            times,
            kind: NodeKind::File { chunks: Vec::new() },
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    /// Committed content length (0 for directories)
    pub fn length(&self) -> u64 {
        match &self.kind {
            NodeKind::File { chunks } => content_length(chunks),
            NodeKind::Directory { .. } => 0,
        }
    }

    pub fn entity(&self, path: String) -> Entity {
        match &self.kind {
            NodeKind::File { .. } => Entity::file(path, self.length(), self.times),
            NodeKind::Directory { .. } => Entity::directory(path, self.times),
        }
    }
}

/// Node arena
///
/// Every node but the root has a parent. Paths are never stored; they are
/// rebuilt from parent links so a rename only touches two directories.
#[derive(Debug)]
pub(super) struct Tree {
    nodes: HashMap<NodeId, Node, RandomState>,
    case_sensitive: bool,
}

impl Tree {
    pub fn new(case_sensitive: bool) -> Self {
        let mut nodes = HashMap::with_hasher(RandomState::new());
        nodes.insert(
            ROOT_ID,
            Node::directory(None, String::new(), Timestamps::now()),
        );
        Self {
            nodes,
            case_sensitive,
        }
    }

    /// Child lookup key for a name
    pub fn key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Resolve a normalized path
    pub fn resolve(&self, path: &str) -> Option<NodeId> {
        let mut current = ROOT_ID;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            current = self.child(current, component)?;
        }
        Some(current)
    }

    /// Child of a directory by name
    pub fn child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        match &self.nodes.get(&dir)?.kind {
            NodeKind::Directory { children } => children.get(&self.key(name)).copied(),
            NodeKind::File { .. } => None,
        }
    }

    /// Rebuild the absolute path of a node
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = self.nodes.get(&id);
        while let Some(node) = current {
            match node.parent {
                Some(parent) => {
                    names.push(node.name.as_str());
                    current = self.nodes.get(&parent);
                }
                None => break,
            }
        }
        if names.is_empty() {
            return paths::ROOT.to_string();
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Insert `node` under its parent; the caller checked the name is free
    pub fn attach(&mut self, id: NodeId, node: Node) {
        let key = self.key(&node.name);
        if let Some(parent) = node.parent {
            if let Some(NodeKind::Directory { children }) =
                self.nodes.get_mut(&parent).map(|p| &mut p.kind)
            {
                children.insert(key, id);
            }
        }
        self.nodes.insert(id, node);
    }

    /// Unlink a node from its parent, keeping it in the arena
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let key = self.key(&node.name);
        if let Some(parent) = node.parent {
            if let Some(NodeKind::Directory { children }) =
                self.nodes.get_mut(&parent).map(|p| &mut p.kind)
            {
                children.remove(&key);
            }
        }
    }

    /// Move a node under `parent` as `name`; the caller checked the name is free
    pub fn relink(&mut self, id: NodeId, parent: NodeId, name: String) {
        self.detach(id);
        let key = self.key(&name);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(parent);
            node.name = name;
        }
        if let Some(NodeKind::Directory { children }) =
            self.nodes.get_mut(&parent).map(|p| &mut p.kind)
        {
            children.insert(key, id);
        }
    }

    /// Remove a node and its whole subtree from the arena
    ///
    /// Returns (entries removed, content bytes released).
    pub fn remove_subtree(&mut self, id: NodeId) -> (u64, u64) {
        self.detach(id);
        let mut removed = 0;
        let mut bytes = 0;
        let mut to_visit = vec![id];
        while let Some(current) = to_visit.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                removed += 1;
                match node.kind {
                    NodeKind::File { chunks } => bytes += content_length(&chunks),
                    NodeKind::Directory { children } => to_visit.extend(children.into_values()),
                }
            }
        }
        (removed, bytes)
    }

    /// True if `id` is `ancestor` or lies below it
    pub fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.nodes.get(&node_id).and_then(|n| n.parent);
        }
        false
    }

    /// Snapshots of a directory's children
    pub fn children_entities(&self, dir: NodeId) -> Vec<Entity> {
        let Some(NodeKind::Directory { children }) = self.nodes.get(&dir).map(|n| &n.kind) else {
            return Vec::new();
        };
        let base = self.path_of(dir);
        children
            .values()
            .filter_map(|child| {
                self.nodes
                    .get(child)
                    .map(|node| node.entity(paths::join(&base, &node.name)))
            })
            .collect()
    }
}
