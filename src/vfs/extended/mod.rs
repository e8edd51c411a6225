/*!
 * Extended Support Wrapper - Emulated links, permissions, attributes and locks
 * Decorator pattern: optional capabilities on top of any FileSystem
 */

mod links;
mod locks;
mod permissions;
mod store;
mod xattr;

pub use store::{load_lines, store_lines, InMemoryStore, MarkerKey, MarkerKind, MetadataStore, SiblingFileStore};

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

use super::config::{ExtendedConfig, Support};
use super::paths;
use super::traits::FileSystem;
use super::types::*;
use crate::core::limits::{MARKER_LOCK_STRIPES, MARKER_PREFIX};
use crate::core::sync::StripedLocks;
use links::{target, Redirected};
use locks::LockTable;

/// Wrapper that adds the optional capabilities an inner filesystem lacks
///
/// Emulated metadata lives in a [`MetadataStore`], by default hidden
/// sibling files in the inner filesystem whose names contain
/// [`MARKER_PREFIX`]. Such paths are invisible through this layer.
///
/// Each capability follows its [`Support`] mode: emulated here, delegated to
/// the inner filesystem, or delegated with emulation as the fallback when
/// the inner filesystem reports UnsupportedFeature.
///
/// Lock order: group lock, then at most one marker stripe. Entry points that
/// resolve links hold the group lock shared; link, rename and delete hold it
/// exclusively so no reader sees a group or symlink record mid-rewrite.
pub struct ExtendedSupportFs<F: FileSystem> {
    /// Inner filesystem implementation
    inner: Arc<F>,
    store: Arc<dyn MetadataStore>,
    config: ExtendedConfig,
    locks: LockTable,
    marker_locks: StripedLocks,
    group_lock: RwLock<()>,
}

impl<F: FileSystem + 'static> ExtendedSupportFs<F> {
    /// Emulate every capability with sibling files in `inner`
    pub fn new(inner: F) -> Self {
        Self::from_arc(Arc::new(inner), ExtendedConfig::default())
    }

    pub fn with_config(inner: F, config: ExtendedConfig) -> Self {
        Self::from_arc(Arc::new(inner), config)
    }

    /// Wrap an Arc'd filesystem, keeping metadata beside its entries
    pub fn from_arc(inner: Arc<F>, config: ExtendedConfig) -> Self {
        let store: Arc<dyn MetadataStore> = Arc::new(SiblingFileStore::new(Arc::clone(&inner)));
        Self::with_store(inner, store, config)
    }
}

impl<F: FileSystem> ExtendedSupportFs<F> {
    /// Wrap a filesystem with an explicit metadata store
    pub fn with_store(inner: Arc<F>, store: Arc<dyn MetadataStore>, config: ExtendedConfig) -> Self {
        Self {
            inner,
            store,
            config,
            locks: LockTable::default(),
            marker_locks: StripedLocks::new(MARKER_LOCK_STRIPES),
            group_lock: RwLock::new(()),
        }
    }

    /// Get reference to inner filesystem
    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn config(&self) -> &ExtendedConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn MetadataStore {
        &*self.store
    }

    /// Number of byte-range locks held on a path
    pub fn held_locks(&self, path: &str) -> usize {
        self.locks.held(&paths::normalize(path))
    }

    #[inline]
    fn is_hidden(path: &str) -> bool {
        path.contains(MARKER_PREFIX)
    }

    /// Normalized path, or PathNotFound for marker entries
    fn lookup_path(path: &str) -> VfsResult<String> {
        let path = paths::normalize(path);
        if Self::is_hidden(&path) {
            return Err(VfsError::PathNotFound(path));
        }
        Ok(path)
    }

    /// Normalized path, or AccessDenied for marker entries
    fn mutable_path(path: &str) -> VfsResult<String> {
        let path = paths::normalize(path);
        if Self::is_hidden(&path) {
            return Err(VfsError::AccessDenied(path));
        }
        Ok(path)
    }

    #[inline]
    fn emulates(&self, support: Support) -> bool {
        support != Support::Delegated
    }

    /// Route a capability call according to its support mode
    fn dispatch<T>(
        &self,
        support: Support,
        native: impl FnOnce() -> VfsResult<T>,
        emulated: impl FnOnce() -> VfsResult<T>,
    ) -> VfsResult<T> {
        match support {
            Support::Emulated => emulated(),
            Support::Delegated => native(),
            Support::PreferNative => match native() {
                Err(VfsError::UnsupportedFeature(feature)) => {
                    debug!(feature = %feature, "inner filesystem lacks feature, emulating");
                    emulated()
                }
                other => other,
            },
        }
    }

    /// Report the outcome of a cleanup step that must not fail the operation
    fn best_effort(&self, path: &str, marker: &str, result: VfsResult<bool>) {
        if let Err(e) = result {
            self.log_cleanup_failure(path, marker, &e);
        }
    }

    fn log_cleanup_failure(&self, path: &str, marker: &str, error: &VfsError) {
        warn!(path = %path, marker, error = %error, "metadata cleanup failed");
    }

    /// Relabel symbolic links and hard-link members
    fn resolve_entity(&self, entity: Entity) -> VfsResult<Entity> {
        if !entity.is_file() {
            return Ok(entity);
        }
        let path = entity.path().to_string();

        let canonical = self.canonical(&path)?;
        if canonical != path {
            return Ok(self.inner.get_metadata(&canonical)?.with_path(path));
        }
        if self.emulates(self.config.symbolic_links) {
            if let Some(destination) = self.symlink_target(&path)? {
                return Ok(Entity::symbolic_link(path, destination, *entity.times()));
            }
        }
        Ok(entity)
    }

    /// Drop every marker of a deleted path
    fn remove_markers(&self, path: &str) {
        for kind in [MarkerKind::Permissions, MarkerKind::SymbolicLink] {
            let result = self.store.remove(&MarkerKey::new(path, kind));
            self.best_effort(path, "markers", result);
        }
        self.remove_attributes(path);
    }

    /// Move every per-path marker after a rename
    fn move_markers(&self, from: &str, to: &str) {
        for kind in [MarkerKind::Permissions, MarkerKind::SymbolicLink] {
            let key = MarkerKey::new(from, kind);
            let result = self.store.rename(&key, &key.moved_to(to));
            self.best_effort(from, "markers", result);
        }
        self.move_attributes(from, to);
    }
}

impl<F: FileSystem> FileSystem for ExtendedSupportFs<F> {
    fn list_directory(&self, path: &str) -> VfsResult<Vec<Entity>> {
        let path = Self::lookup_path(path)?;
        let _group = self.group_lock.read();
        self.inner
            .list_directory(&path)?
            .into_iter()
            .filter(|entity| !Self::is_hidden(entity.file_name()))
            .map(|entity| self.resolve_entity(entity))
            .collect()
    }

    fn get_metadata(&self, path: &str) -> VfsResult<Entity> {
        let path = Self::lookup_path(path)?;
        let _group = self.group_lock.read();
        let entity = self.inner.get_metadata(&path)?;
        self.resolve_entity(entity)
    }

    fn path_exists(&self, path: &str) -> bool {
        let path = paths::normalize(path);
        !Self::is_hidden(&path) && self.inner.path_exists(&path)
    }

    fn create_file(&self, path: &str) -> VfsResult<()> {
        let path = Self::mutable_path(path)?;
        self.inner.create_file(&path)
    }

    fn create_directory(&self, path: &str) -> VfsResult<()> {
        let path = Self::mutable_path(path)?;
        self.inner.create_directory(&path)
    }

    fn rename(&self, source: &str, destination: &str) -> VfsResult<()> {
        let source = Self::mutable_path(source)?;
        let destination = Self::mutable_path(destination)?;

        let _group = self.group_lock.write();
        self.inner.rename(&source, &destination)?;

        let _guard = self.marker_locks.lock(&source);
        self.rename_in_group(&source, &destination)?;
        self.move_markers(&source, &destination);
        if matches!(self.inner.get_metadata(&destination), Ok(Entity::Directory { .. })) {
            if let Err(e) = self.store.rename_tree(&source, &destination) {
                self.log_cleanup_failure(&source, "subtree", &e);
            }
            self.rebase_groups(&source, &destination)?;
        }
        debug!(source = %source, destination = %destination, "renamed with metadata");
        Ok(())
    }

    fn delete_file(&self, path: &str) -> VfsResult<()> {
        let path = Self::mutable_path(path)?;
        if matches!(self.inner.get_metadata(&path)?, Entity::Directory { .. }) {
            return Err(VfsError::NotAFile(path));
        }

        let _group = self.group_lock.write();
        let _guard = self.marker_locks.lock(&path);
        if !self.leave_group(&path)? {
            self.inner.delete_file(&path)?;
        }
        self.remove_markers(&path);
        debug!(path = %path, "deleted file with metadata");
        Ok(())
    }

    fn delete_directory_recursively(&self, path: &str) -> VfsResult<()> {
        let path = Self::mutable_path(path)?;
        if paths::is_root(&path) {
            return Err(VfsError::AccessDenied(path));
        }

        let _group = self.group_lock.write();
        if !matches!(self.inner.get_metadata(&path)?, Entity::Directory { .. }) {
            return Err(VfsError::NotADirectory(path));
        }
        self.leave_groups_within(&path)?;
        self.inner.delete_directory_recursively(&path)?;

        let _guard = self.marker_locks.lock(&path);
        self.remove_markers(&path);
        if let Err(e) = self.store.remove_tree(&path) {
            self.log_cleanup_failure(&path, "subtree", &e);
        }
        Ok(())
    }

    fn create_symbolic_link(&self, source: &str, destination: &str) -> VfsResult<()> {
        let source = Self::mutable_path(source)?;
        self.dispatch(
            self.config.symbolic_links,
            || self.inner.create_symbolic_link(&source, destination),
            || self.emulated_create_symbolic_link(&source, destination),
        )
    }

    fn create_hard_link(&self, source: &str, destination: &str) -> VfsResult<()> {
        let source = Self::mutable_path(source)?;
        let destination = Self::lookup_path(destination)?;
        self.dispatch(
            self.config.hard_links,
            || self.inner.create_hard_link(&source, &destination),
            || self.emulated_create_hard_link(&source, &destination),
        )
    }

    fn set_last_access_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        let _group = self.group_lock.read();
        let path = self.canonical(&Self::lookup_path(path)?)?;
        self.inner.set_last_access_time(&path, time)
    }

    fn set_last_modification_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        let _group = self.group_lock.read();
        let path = self.canonical(&Self::lookup_path(path)?)?;
        self.inner.set_last_modification_time(&path, time)
    }

    fn set_creation_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        let _group = self.group_lock.read();
        let path = self.canonical(&Self::lookup_path(path)?)?;
        self.inner.set_creation_time(&path, time)
    }

    fn open_file(&self, path: &str, read: bool, write: bool) -> VfsResult<FileHandle> {
        let path = Self::mutable_path(path)?;
        let _group = self.group_lock.read();
        if self.emulates(self.config.symbolic_links) && self.symlink_target(&path)?.is_some() {
            return Err(VfsError::NotAFile(path));
        }

        let canonical = self.canonical(&path)?;
        if canonical == path {
            return self.inner.open_file(&path, read, write);
        }
        let target = self.inner.open_file(&canonical, read, write)?;
        debug!(path = %path, canonical = %canonical, handle = %target.id(), "redirected open");
        Ok(FileHandle::new(path, read, write, Redirected { target }))
    }

    fn read(&self, handle: &FileHandle, buffer: &mut [u8], offset: u64) -> VfsResult<usize> {
        self.inner.read(target(handle), buffer, offset)
    }

    fn write(&self, handle: &FileHandle, data: &[u8], offset: u64) -> VfsResult<()> {
        let target = target(handle);
        if self.emulates(self.config.file_locking) {
            self.locks
                .check_write(target.path(), target.id(), offset, data.len() as u64)?;
        }
        self.inner.write(target, data, offset)
    }

    fn set_length(&self, handle: &FileHandle, length: u64) -> VfsResult<()> {
        self.inner.set_length(target(handle), length)
    }

    fn flush(&self, handle: &FileHandle) -> VfsResult<()> {
        self.inner.flush(target(handle))
    }

    fn close(&self, handle: &FileHandle) -> VfsResult<()> {
        let target = target(handle);
        if target.id() != handle.id() {
            handle.mark_closed()?;
        }
        let released = self.locks.release(target.id());
        if released > 0 {
            debug!(path = %target.path(), handle = %target.id(), released, "released locks on close");
        }
        self.inner.close(target)
    }

    fn get_unix_permissions(&self, path: &str) -> VfsResult<UnixPermissions> {
        let path = Self::lookup_path(path)?;
        let _group = self.group_lock.read();
        if self.emulates(self.config.unix_permissions) {
            self.emulated_unix_permissions(&path)
        } else {
            self.inner.get_unix_permissions(&path)
        }
    }

    fn set_unix_permissions(&self, path: &str, permissions: UnixPermissions) -> VfsResult<()> {
        let path = Self::lookup_path(path)?;
        let _group = self.group_lock.read();
        self.dispatch(
            self.config.unix_permissions,
            || self.inner.set_unix_permissions(&path, permissions),
            || self.emulated_set_unix_permissions(&path, permissions),
        )
    }

    fn get_windows_attributes(&self, path: &str) -> VfsResult<WindowsAttributes> {
        let path = Self::lookup_path(path)?;
        let _group = self.group_lock.read();
        if self.emulates(self.config.windows_attributes) {
            self.emulated_windows_attributes(&path)
        } else {
            self.inner.get_windows_attributes(&path)
        }
    }

    fn set_windows_attributes(&self, path: &str, attributes: WindowsAttributes) -> VfsResult<()> {
        let path = Self::lookup_path(path)?;
        let _group = self.group_lock.read();
        self.dispatch(
            self.config.windows_attributes,
            || self.inner.set_windows_attributes(&path, attributes),
            || self.emulated_set_windows_attributes(&path, attributes),
        )
    }

    fn list_extended_attributes(&self, path: &str) -> VfsResult<Vec<ExtendedAttribute>> {
        let path = Self::lookup_path(path)?;
        let _group = self.group_lock.read();
        self.dispatch(
            self.config.extended_attributes,
            || self.inner.list_extended_attributes(&path),
            || self.emulated_list_attributes(&path),
        )
    }

    fn get_extended_attribute(&self, path: &str, name: &str) -> VfsResult<ExtendedAttribute> {
        let path = Self::lookup_path(path)?;
        let _group = self.group_lock.read();
        self.dispatch(
            self.config.extended_attributes,
            || self.inner.get_extended_attribute(&path, name),
            || self.emulated_get_attribute(&path, name),
        )
    }

    fn set_extended_attribute(&self, path: &str, attribute: ExtendedAttribute) -> VfsResult<()> {
        let path = Self::lookup_path(path)?;
        let _group = self.group_lock.read();
        match self.config.extended_attributes {
            Support::Emulated => self.emulated_set_attribute(&path, attribute),
            Support::Delegated => self.inner.set_extended_attribute(&path, attribute),
            Support::PreferNative => match self.inner.set_extended_attribute(&path, attribute.clone()) {
                Err(VfsError::UnsupportedFeature(_)) => self.emulated_set_attribute(&path, attribute),
                other => other,
            },
        }
    }

    fn remove_extended_attribute(&self, path: &str, name: &str) -> VfsResult<()> {
        let path = Self::lookup_path(path)?;
        let _group = self.group_lock.read();
        self.dispatch(
            self.config.extended_attributes,
            || self.inner.remove_extended_attribute(&path, name),
            || self.emulated_remove_attribute(&path, name),
        )
    }

    fn lock_file(&self, handle: &FileHandle, offset: u64, length: u64) -> VfsResult<()> {
        let target = target(handle);
        self.dispatch(
            self.config.file_locking,
            || self.inner.lock_file(target, offset, length),
            || {
                target.ensure_open()?;
                self.locks.lock(target.path(), target.id(), offset, length)
            },
        )
    }

    fn unlock_file(&self, handle: &FileHandle, offset: u64, length: u64) -> VfsResult<()> {
        let target = target(handle);
        self.dispatch(
            self.config.file_locking,
            || self.inner.unlock_file(target, offset, length),
            || self.locks.unlock(target.path(), target.id(), offset, length),
        )
    }

    fn volume_name(&self) -> String {
        self.inner.volume_name()
    }

    fn file_system_name(&self) -> String {
        self.inner.file_system_name()
    }

    fn is_case_sensitive(&self) -> bool {
        self.inner.is_case_sensitive()
    }

    fn block_size(&self) -> u64 {
        self.inner.block_size()
    }

    fn total_block_count(&self) -> u64 {
        self.inner.total_block_count()
    }

    fn free_block_count(&self) -> u64 {
        self.inner.free_block_count()
    }

    fn free_block_available_count(&self) -> u64 {
        self.inner.free_block_available_count()
    }

    fn max_path_length(&self) -> u32 {
        self.inner.max_path_length()
    }

    fn files_free_count(&self) -> u64 {
        self.inner.files_free_count()
    }

    fn total_files_count(&self) -> u64 {
        self.inner.total_files_count()
    }

    fn supports_unicode_filenames(&self) -> bool {
        self.inner.supports_unicode_filenames()
    }

    fn is_compressed(&self) -> bool {
        self.inner.is_compressed()
    }

    fn volume_serial_number(&self) -> u32 {
        self.inner.volume_serial_number()
    }

    fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }

    fn before_mounting(&self, mount_path: &str) {
        info!(mount_path, config = ?self.config, "extended support layer mounting");
        self.inner.before_mounting(mount_path);
    }

    fn before_unmounting(&self) {
        self.inner.before_unmounting();
    }

    fn after_unmounting(&self) {
        self.locks.clear();
        info!("extended support layer unmounted");
        self.inner.after_unmounting();
    }
}
