/*!
 * Directory Operations Implementation
 * Listing, creation, deletion and renaming of tree entries
 */

use std::time::SystemTime;
use tracing::debug;

use super::super::paths;
use super::super::types::*;
use super::node::{Node, NodeKind, ROOT_ID};
use super::MemFs;

impl MemFs {
    pub(super) fn list_directory_impl(&self, path: &str) -> VfsResult<Vec<Entity>> {
        let path = self.normalize(path);
        let tree = self.tree.read();

        let id = tree
            .resolve(&path)
            .ok_or_else(|| VfsError::PathNotFound(path.clone()))?;
        match tree.get(id).map(|n| &n.kind) {
            Some(NodeKind::Directory { .. }) => Ok(tree.children_entities(id)),
            Some(NodeKind::File { .. }) => Err(VfsError::NotADirectory(path)),
            None => Err(VfsError::PathNotFound(path)),
        }
    }

    pub(super) fn get_metadata_impl(&self, path: &str) -> VfsResult<Entity> {
        let path = self.normalize(path);
        let tree = self.tree.read();
        tree.resolve(&path)
            .and_then(|id| tree.get(id))
            .map(|node| node.entity(path.clone()))
            .ok_or_else(|| VfsError::PathNotFound(path.clone()))
    }

    /// Create a file or directory under an existing parent directory
    pub(super) fn create_impl(&self, path: &str, directory: bool) -> VfsResult<()> {
        let path = self.normalize(path);
        let Some(parent_path) = paths::parent(&path) else {
            return Err(VfsError::DestinationAlreadyExists(path));
        };
        let name = paths::file_name(&path).to_string();

        let mut tree = self.tree.write();
        if tree.resolve(&path).is_some() {
            return Err(VfsError::DestinationAlreadyExists(path));
        }
        let parent = tree
            .resolve(parent_path)
            .ok_or_else(|| VfsError::PathNotFound(parent_path.to_string()))?;
        if !tree.get(parent).is_some_and(Node::is_dir) {
            return Err(VfsError::NotADirectory(parent_path.to_string()));
        }

        self.reserve_entry()?;
        let id = self.next_node_id();
        let times = Timestamps::now();
        let node = if directory {
            Node::directory(Some(parent), name, times)
        } else {
            Node::file(parent, name, times)
        };
        tree.attach(id, node);
        if let Some(parent_node) = tree.get_mut(parent) {
            parent_node.times.modified = times.modified;
        }
        drop(tree);

        debug!(path = %path, directory, "created entry");
        Ok(())
    }

    pub(super) fn delete_file_impl(&self, path: &str) -> VfsResult<()> {
        self.delete_impl(path, false)
    }

    pub(super) fn delete_directory_impl(&self, path: &str) -> VfsResult<()> {
        self.delete_impl(path, true)
    }

    fn delete_impl(&self, path: &str, directory: bool) -> VfsResult<()> {
        let path = self.normalize(path);
        if paths::is_root(&path) {
            return Err(VfsError::AccessDenied(path));
        }

        let mut tree = self.tree.write();
        let id = tree
            .resolve(&path)
            .ok_or_else(|| VfsError::PathNotFound(path.clone()))?;
        let is_dir = tree.get(id).is_some_and(Node::is_dir);
        match (directory, is_dir) {
            (false, true) => return Err(VfsError::NotAFile(path)),
            (true, false) => return Err(VfsError::NotADirectory(path)),
            _ => {}
        }

        let parent = tree.get(id).and_then(|n| n.parent).unwrap_or(ROOT_ID);
        let (entries, bytes) = tree.remove_subtree(id);
        if let Some(parent_node) = tree.get_mut(parent) {
            parent_node.times.modified = SystemTime::now();
        }
        drop(tree);

        self.release_entries(entries);
        self.update_size_delta(-(bytes as i64));
        debug!(path = %path, entries, bytes, "deleted entry");
        Ok(())
    }

    pub(super) fn rename_impl(&self, source: &str, destination: &str) -> VfsResult<()> {
        let source = self.normalize(source);
        let destination = self.normalize(destination);
        let Some(dest_parent_path) = paths::parent(&destination) else {
            return Err(VfsError::AccessDenied(destination));
        };
        if paths::is_root(&source) {
            return Err(VfsError::AccessDenied(source));
        }
        let new_name = paths::file_name(&destination).to_string();

        let mut tree = self.tree.write();
        let id = tree
            .resolve(&source)
            .ok_or_else(|| VfsError::PathNotFound(source.clone()))?;
        let dest_parent = tree
            .resolve(dest_parent_path)
            .ok_or_else(|| VfsError::PathNotFound(dest_parent_path.to_string()))?;
        if !tree.get(dest_parent).is_some_and(Node::is_dir) {
            return Err(VfsError::NotADirectory(dest_parent_path.to_string()));
        }
        match tree.child(dest_parent, &new_name) {
            Some(existing) if existing != id => {
                return Err(VfsError::DestinationAlreadyExists(destination));
            }
            Some(_) if tree.get(id).is_some_and(|n| n.name == new_name) => {
                return Err(VfsError::DestinationAlreadyExists(destination));
            }
            _ => {}
        }
        if tree.is_descendant(dest_parent, id) {
            return Err(VfsError::AccessDenied(format!(
                "cannot move {} into itself",
                source
            )));
        }

        tree.relink(id, dest_parent, new_name);
        drop(tree);

        debug!(source = %source, destination = %destination, "renamed entry");
        Ok(())
    }
}
