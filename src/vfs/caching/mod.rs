/*!
 * Caching Wrapper - Read window and write coalescing for any FileSystem
 * Decorator pattern: per-handle caches in front of an inner filesystem
 */

mod read_cache;
mod write_cache;

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};

use super::config::CacheConfig;
use super::traits::FileSystem;
use super::types::*;
use crate::core::id::HandleId;
use read_cache::ReadWindow;
use write_cache::{PendingWrite, WriteSlot};

/// Wrapper that caches reads and coalesces writes of any FileSystem
///
/// Each read handle owns one cached window of `read_cache_size` bytes; each
/// write handle owns one pending contiguous buffer of at most
/// `write_cache_size` bytes that reaches the inner filesystem as a single
/// `write` call.
///
/// Lock order per handle: read window, then write slot. The write path
/// never holds both; it appends first and invalidates the window after.
pub struct CachingFs<F: FileSystem> {
    /// Inner filesystem implementation
    inner: Arc<F>,
    read_cache_size: usize,
    write_cache_size: usize,
    read_windows: DashMap<HandleId, Arc<Mutex<ReadWindow>>, RandomState>,
    write_slots: DashMap<HandleId, Arc<Mutex<WriteSlot>>, RandomState>,
}

impl<F: FileSystem> CachingFs<F> {
    /// Wrap a filesystem; both caches use the inner block size
    pub fn new(inner: F) -> Self {
        Self::from_arc(Arc::new(inner), CacheConfig::default())
    }

    /// Wrap a filesystem with explicit cache sizes
    pub fn with_config(inner: F, config: CacheConfig) -> Self {
        Self::from_arc(Arc::new(inner), config)
    }

    /// Wrap an Arc'd filesystem
    pub fn from_arc(inner: Arc<F>, config: CacheConfig) -> Self {
        let block = inner.block_size().max(1) as usize;
        Self {
            read_cache_size: config.read_cache_size.unwrap_or(block).max(1),
            write_cache_size: config.write_cache_size.unwrap_or(block).max(1),
            inner,
            read_windows: DashMap::with_hasher(RandomState::new()),
            write_slots: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Get reference to inner filesystem
    pub fn inner(&self) -> &F {
        &self.inner
    }

    pub fn read_cache_size(&self) -> usize {
        self.read_cache_size
    }

    pub fn write_cache_size(&self) -> usize {
        self.write_cache_size
    }

    /// Number of handles with cache state
    pub fn cached_handles(&self) -> usize {
        self.read_windows.len().max(self.write_slots.len())
    }

    fn window(&self, id: HandleId) -> Option<Arc<Mutex<ReadWindow>>> {
        self.read_windows.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn slot(&self, handle: &FileHandle) -> Arc<Mutex<WriteSlot>> {
        Arc::clone(
            self.write_slots
                .entry(handle.id())
                .or_insert_with(|| Arc::new(Mutex::new(WriteSlot::new(handle.clone()))))
                .value(),
        )
    }

    /// Send the pending buffer to the inner filesystem
    ///
    /// On failure the buffer stays pending and the error is returned.
    fn commit(&self, slot: &mut WriteSlot) -> VfsResult<()> {
        let Some(pending) = slot.pending.take() else {
            return Ok(());
        };
        trace!(handle = %slot.handle.id(), offset = pending.offset, len = pending.data.len(), "committing write buffer");
        if let Err(e) = self.inner.write(&slot.handle, &pending.data, pending.offset) {
            slot.pending = Some(pending);
            return Err(e);
        }
        Ok(())
    }

    /// Commit the handle's pending buffer, whatever its range
    fn commit_handle(&self, id: HandleId) -> VfsResult<()> {
        let Some(slot) = self.write_slots.get(&id).map(|entry| Arc::clone(entry.value())) else {
            return Ok(());
        };
        let mut slot = slot.lock();
        self.commit(&mut slot)
    }

    /// Commit the pending buffer if it touches `[offset, offset + len)`
    fn commit_overlapping(&self, id: HandleId, offset: u64, len: u64) -> VfsResult<()> {
        let Some(slot) = self.write_slots.get(&id).map(|entry| Arc::clone(entry.value())) else {
            return Ok(());
        };
        let mut slot = slot.lock();
        let overlaps = slot
            .pending
            .as_ref()
            .is_some_and(|pending| pending.overlaps(offset, len));
        if overlaps {
            self.commit(&mut slot)
        } else {
            Ok(())
        }
    }

    /// Buffered writes must fail now, not at commit time
    fn ensure_writable(handle: &FileHandle) -> VfsResult<()> {
        handle.ensure_open()?;
        if !handle.can_write() {
            return Err(VfsError::AccessDenied(format!(
                "{} not opened for writing",
                handle.path()
            )));
        }
        Ok(())
    }

    fn invalidate_window(&self, id: HandleId) {
        if let Some(window) = self.window(id) {
            window.lock().invalidate();
        }
    }

    /// Rescale an inner block count to this layer's block size
    fn rescale(&self, inner_blocks: u64) -> u64 {
        let bytes = inner_blocks as u128 * self.inner.block_size() as u128;
        (bytes / self.read_cache_size as u128) as u64
    }
}

impl<F: FileSystem> FileSystem for CachingFs<F> {
    fn list_directory(&self, path: &str) -> VfsResult<Vec<Entity>> {
        self.inner.list_directory(path)
    }

    fn get_metadata(&self, path: &str) -> VfsResult<Entity> {
        self.inner.get_metadata(path)
    }

    fn path_exists(&self, path: &str) -> bool {
        self.inner.path_exists(path)
    }

    fn create_file(&self, path: &str) -> VfsResult<()> {
        self.inner.create_file(path)
    }

    fn create_directory(&self, path: &str) -> VfsResult<()> {
        self.inner.create_directory(path)
    }

    fn rename(&self, source: &str, destination: &str) -> VfsResult<()> {
        self.inner.rename(source, destination)
    }

    fn delete_file(&self, path: &str) -> VfsResult<()> {
        self.inner.delete_file(path)
    }

    fn delete_directory_recursively(&self, path: &str) -> VfsResult<()> {
        self.inner.delete_directory_recursively(path)
    }

    fn create_symbolic_link(&self, source: &str, destination: &str) -> VfsResult<()> {
        self.inner.create_symbolic_link(source, destination)
    }

    fn create_hard_link(&self, source: &str, destination: &str) -> VfsResult<()> {
        self.inner.create_hard_link(source, destination)
    }

    fn set_last_access_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        self.inner.set_last_access_time(path, time)
    }

    fn set_last_modification_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        self.inner.set_last_modification_time(path, time)
    }

    fn set_creation_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        self.inner.set_creation_time(path, time)
    }

    fn open_file(&self, path: &str, read: bool, write: bool) -> VfsResult<FileHandle> {
        let handle = self.inner.open_file(path, read, write)?;
        if read {
            self.read_windows
                .insert(handle.id(), Arc::new(Mutex::new(ReadWindow::default())));
        }
        if write {
            self.write_slots.insert(
                handle.id(),
                Arc::new(Mutex::new(WriteSlot::new(handle.clone()))),
            );
        }
        Ok(handle)
    }

    fn read(&self, handle: &FileHandle, buffer: &mut [u8], offset: u64) -> VfsResult<usize> {
        handle.ensure_open()?;
        let len = buffer.len();
        if len == 0 {
            return Ok(0);
        }

        let window = match self.window(handle.id()) {
            Some(window) if len < self.read_cache_size => window,
            _ => {
                // Large or uncached request goes straight through
                self.commit_overlapping(handle.id(), offset, len as u64)?;
                return self.inner.read(handle, buffer, offset);
            }
        };

        let mut window = window.lock();
        if let Some(n) = window.serve(offset, buffer) {
            trace!(handle = %handle.id(), offset, len, "read cache hit");
            return Ok(n);
        }

        trace!(handle = %handle.id(), offset, len, "read cache miss");
        self.commit_overlapping(handle.id(), offset, self.read_cache_size as u64)?;
        let fetched = self
            .inner
            .read(handle, window.fetch_buffer(self.read_cache_size), offset)?;
        window.fill(offset, fetched);

        let head = window.head(len);
        let n = head.len();
        buffer[..n].copy_from_slice(head);
        Ok(n)
    }

    fn write(&self, handle: &FileHandle, data: &[u8], offset: u64) -> VfsResult<()> {
        Self::ensure_writable(handle)?;
        if data.is_empty() {
            return Ok(());
        }

        let slot = self.slot(handle);
        {
            let mut slot = slot.lock();
            let appendable = slot.pending.as_ref().is_some_and(|pending| {
                pending.end() == offset && pending.data.len() + data.len() <= self.write_cache_size
            });

            if appendable {
                if let Some(pending) = slot.pending.as_mut() {
                    pending.data.extend_from_slice(data);
                }
            } else {
                self.commit(&mut slot)?;
                if data.len() > self.write_cache_size {
                    self.inner.write(handle, data, offset)?;
                } else {
                    slot.pending = Some(PendingWrite::new(offset, data));
                }
            }
        }

        if let Some(window) = self.window(handle.id()) {
            window.lock().invalidate_overlap(offset, data.len() as u64);
        }
        Ok(())
    }

    fn set_length(&self, handle: &FileHandle, length: u64) -> VfsResult<()> {
        Self::ensure_writable(handle)?;
        self.commit_handle(handle.id())?;
        self.invalidate_window(handle.id());
        self.inner.set_length(handle, length)
    }

    fn flush(&self, handle: &FileHandle) -> VfsResult<()> {
        handle.ensure_open()?;
        self.commit_handle(handle.id())?;
        self.inner.flush(handle)
    }

    fn close(&self, handle: &FileHandle) -> VfsResult<()> {
        let committed = if handle.is_closed() {
            Ok(())
        } else {
            self.commit_handle(handle.id())
        };
        let closed = self.inner.close(handle);

        self.read_windows.remove(&handle.id());
        self.write_slots.remove(&handle.id());
        if let Err(e) = &committed {
            warn!(path = %handle.path(), handle = %handle.id(), error = %e, "pending writes lost on close");
        }
        committed.and(closed)
    }

    fn get_unix_permissions(&self, path: &str) -> VfsResult<UnixPermissions> {
        self.inner.get_unix_permissions(path)
    }

    fn set_unix_permissions(&self, path: &str, permissions: UnixPermissions) -> VfsResult<()> {
        self.inner.set_unix_permissions(path, permissions)
    }

    fn get_windows_attributes(&self, path: &str) -> VfsResult<WindowsAttributes> {
        self.inner.get_windows_attributes(path)
    }

    fn set_windows_attributes(&self, path: &str, attributes: WindowsAttributes) -> VfsResult<()> {
        self.inner.set_windows_attributes(path, attributes)
    }

    fn list_extended_attributes(&self, path: &str) -> VfsResult<Vec<ExtendedAttribute>> {
        self.inner.list_extended_attributes(path)
    }

    fn get_extended_attribute(&self, path: &str, name: &str) -> VfsResult<ExtendedAttribute> {
        self.inner.get_extended_attribute(path, name)
    }

    fn set_extended_attribute(&self, path: &str, attribute: ExtendedAttribute) -> VfsResult<()> {
        self.inner.set_extended_attribute(path, attribute)
    }

    fn remove_extended_attribute(&self, path: &str, name: &str) -> VfsResult<()> {
        self.inner.remove_extended_attribute(path, name)
    }

    fn lock_file(&self, handle: &FileHandle, offset: u64, length: u64) -> VfsResult<()> {
        self.inner.lock_file(handle, offset, length)
    }

    fn unlock_file(&self, handle: &FileHandle, offset: u64, length: u64) -> VfsResult<()> {
        self.inner.unlock_file(handle, offset, length)
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
        self.read_cache_size as u64
    }

    fn total_block_count(&self) -> u64 {
        self.rescale(self.inner.total_block_count())
    }

    fn free_block_count(&self) -> u64 {
        self.rescale(self.inner.free_block_count())
    }

    fn free_block_available_count(&self) -> u64 {
        self.rescale(self.inner.free_block_available_count())
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
        info!(mount_path, read_cache = self.read_cache_size, write_cache = self.write_cache_size, "caching layer mounting");
        self.inner.before_mounting(mount_path)
    }

    /// Commits every pending buffer before the inner hook runs
    fn before_unmounting(&self) {
        let slots: Vec<_> = self
            .write_slots
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut committed = 0usize;
        for slot in slots {
            let mut slot = slot.lock();
            if slot.pending.is_none() {
                continue;
            }
            match self.commit(&mut slot) {
                Ok(()) => committed += 1,
                Err(e) => {
                    warn!(path = %slot.handle.path(), handle = %slot.handle.id(), error = %e, "failed to commit write buffer before unmount");
                }
            }
        }
        debug!(committed, "write buffers committed before unmount");
        self.inner.before_unmounting()
    }

    fn after_unmounting(&self) {
        self.inner.after_unmounting()
    }
}
