/*!
 * Link Emulation
 * Symbolic links as placeholder files and hard links as path groups
 */

use tracing::{debug, info};

use super::super::paths;

use super::super::traits::FileSystem;
use super::super::types::*;
use super::store::{load_lines, store_lines, MarkerKey, MarkerKind};
use super::ExtendedSupportFs;

/// Backing of a handle opened through a non-canonical hard-link member
///
/// All I/O goes to `target`, the handle of the canonical path.
pub(super) struct Redirected {
    pub target: FileHandle,
}

/// Handle the inner filesystem should see
pub(super) fn target(handle: &FileHandle) -> &FileHandle {
    handle
        .backing::<Redirected>()
        .map_or(handle, |redirected| &redirected.target)
}

impl<F: FileSystem> ExtendedSupportFs<F> {
    // ------------------------------------------------------------------
    // Symbolic links
    // ------------------------------------------------------------------

    pub(super) fn symlink_target(&self, path: &str) -> VfsResult<Option<String>> {
        let key = MarkerKey::new(path, MarkerKind::SymbolicLink);
        Ok(self
            .store
            .load(&key)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    pub(super) fn emulated_create_symbolic_link(&self, source: &str, destination: &str) -> VfsResult<()> {
        let _group = self.group_lock.write();
        if self.inner.path_exists(source) {
            return Err(VfsError::SourceAlreadyExists(source.to_string()));
        }
        match self.inner.create_file(source) {
            Ok(()) => {}
            Err(VfsError::DestinationAlreadyExists(_)) => {
                return Err(VfsError::SourceAlreadyExists(source.to_string()));
            }
            Err(e) => return Err(e),
        }
        self.store.store(
            &MarkerKey::new(source, MarkerKind::SymbolicLink),
            destination.as_bytes(),
        )?;
        debug!(source, destination, "created symbolic link");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Hard links
    // ------------------------------------------------------------------

    /// Members of the path's hard-link group, canonical first; empty if none
    pub(super) fn group(&self, path: &str) -> VfsResult<Vec<String>> {
        if !self.emulates(self.config.hard_links) {
            return Ok(Vec::new());
        }
        Ok(load_lines(&*self.store, &MarkerKey::new(path, MarkerKind::HardLink))?
            .unwrap_or_default()
            .into_iter()
            .filter(|member| !member.is_empty())
            .collect())
    }

    /// Path whose content and metadata are authoritative for `path`
    pub(super) fn canonical(&self, path: &str) -> VfsResult<String> {
        Ok(self
            .group(path)?
            .into_iter()
            .next()
            .unwrap_or_else(|| path.to_string()))
    }

    fn write_group(&self, members: &[String]) -> VfsResult<()> {
        for member in members {
            store_lines(&*self.store, &MarkerKey::new(member, MarkerKind::HardLink), members)?;
        }
        Ok(())
    }

    pub(super) fn emulated_create_hard_link(&self, source: &str, destination: &str) -> VfsResult<()> {
        let _group = self.group_lock.write();
        if self.inner.path_exists(source) {
            return Err(VfsError::SourceAlreadyExists(source.to_string()));
        }
        match self.resolve_entity(self.inner.get_metadata(destination)?)? {
            Entity::File { .. } => {}
            Entity::Directory { .. } | Entity::SymbolicLink { .. } => {
                return Err(VfsError::NotAFile(destination.to_string()));
            }
        }
        match self.inner.create_file(source) {
            Ok(()) => {}
            Err(VfsError::DestinationAlreadyExists(_)) => {
                return Err(VfsError::SourceAlreadyExists(source.to_string()));
            }
            Err(e) => return Err(e),
        }

        let mut members = self.group(destination)?;
        if members.is_empty() {
            members.push(destination.to_string());
        }
        members.push(source.to_string());
        self.write_group(&members)?;

        debug!(source, destination, canonical = %members[0], members = members.len(), "created hard link");
        Ok(())
    }

    /// Take a path out of its hard-link group before it is deleted
    ///
    /// Returns `true` when the path's content was already dealt with: it was
    /// canonical and its content now lives at the next member.
    pub(super) fn leave_group(&self, path: &str) -> VfsResult<bool> {
        let members = self.group(path)?;
        if members.is_empty() {
            return Ok(false);
        }
        let remaining: Vec<String> = members.iter().filter(|m| *m != path).cloned().collect();

        if remaining.len() == 1 {
            let result = self
                .store
                .remove(&MarkerKey::new(&remaining[0], MarkerKind::HardLink));
            self.best_effort(&remaining[0], "hard link", result);
        } else {
            self.write_group(&remaining)?;
        }

        let was_canonical = members[0] == path;
        let migrated = if was_canonical && !remaining.is_empty() {
            let successor = &remaining[0];
            self.inner.delete_file(successor)?;
            self.inner.rename(path, successor)?;
            self.remove_permissions_and_attributes(successor);
            self.move_permissions_and_attributes(path, successor);
            info!(from = %path, to = %successor, "migrated hard link content");
            true
        } else {
            false
        };

        let result = self.store.remove(&MarkerKey::new(path, MarkerKind::HardLink));
        self.best_effort(path, "hard link", result);
        Ok(migrated)
    }

    /// Replace `from` by `to` in its group after a rename
    pub(super) fn rename_in_group(&self, from: &str, to: &str) -> VfsResult<()> {
        let members = self.group(from)?;
        if members.is_empty() {
            return Ok(());
        }
        let members: Vec<String> = members
            .into_iter()
            .map(|member| if member == from { to.to_string() } else { member })
            .collect();
        self.write_group(&members)?;
        let result = self.store.remove(&MarkerKey::new(from, MarkerKind::HardLink));
        self.best_effort(from, "hard link", result);
        Ok(())
    }

    /// Point every group with members under a renamed directory at their
    /// new paths
    ///
    /// Runs after the directory and its records have moved.
    pub(super) fn rebase_groups(&self, from: &str, to: &str) -> VfsResult<()> {
        if !self.emulates(self.config.hard_links) {
            return Ok(());
        }
        for member in self.store.paths_with(to, &MarkerKind::HardLink)? {
            let members = self.group(&member)?;
            if !members.iter().any(|m| paths::is_within(m, from)) {
                continue;
            }
            let rebased: Vec<String> = members
                .iter()
                .map(|m| paths::rebase(m, from, to).unwrap_or_else(|| m.clone()))
                .collect();
            self.write_group(&rebased)?;
        }
        debug!(from, to, "rebased hard-link groups under renamed directory");
        Ok(())
    }

    /// Take every grouped path under a directory out of its group before the
    /// directory is deleted
    ///
    /// Content of a canonical member moves to a surviving member, which may
    /// lie outside the directory.
    pub(super) fn leave_groups_within(&self, directory: &str) -> VfsResult<()> {
        if !self.emulates(self.config.hard_links) {
            return Ok(());
        }
        for member in self.store.paths_with(directory, &MarkerKind::HardLink)? {
            self.leave_group(&member)?;
        }
        Ok(())
    }

    fn remove_permissions_and_attributes(&self, path: &str) {
        let result = self.store.remove(&MarkerKey::new(path, MarkerKind::Permissions));
        self.best_effort(path, "permissions", result);
        self.remove_attributes(path);
    }

    fn move_permissions_and_attributes(&self, from: &str, to: &str) {
        let key = MarkerKey::new(from, MarkerKind::Permissions);
        let result = self.store.rename(&key, &key.moved_to(to));
        self.best_effort(from, "permissions", result);
        self.move_attributes(from, to);
    }
}
