/*!
 * Metadata Operations Implementation
 * FileSystem trait wiring, timestamps and volume reporting
 */

use std::sync::atomic::Ordering;
use std::time::SystemTime;

use super::super::traits::FileSystem;
use super::super::types::*;
use super::MemFs;
use crate::core::limits::{DEFAULT_FILES_FREE_COUNT, MEMORY_FILESYSTEM_NAME, VIRTUAL_MEMORY_CAPACITY};

/// Which timestamp a setter touches
#[derive(Clone, Copy)]
enum TimeField {
    Accessed,
    Modified,
    Created,
}

impl MemFs {
    fn set_time(&self, path: &str, field: TimeField, time: SystemTime) -> VfsResult<()> {
        let path = self.normalize(path);
        let mut tree = self.tree.write();
        let id = tree
            .resolve(&path)
            .ok_or_else(|| VfsError::PathNotFound(path.clone()))?;
        let node = tree.get_mut(id).ok_or(VfsError::PathNotFound(path))?;
        match field {
            TimeField::Accessed => node.times.accessed = time,
            TimeField::Modified => node.times.modified = time,
            TimeField::Created => node.times.created = time,
        }
        Ok(())
    }

    fn capacity(&self) -> u64 {
        self.config.capacity_bytes.unwrap_or(VIRTUAL_MEMORY_CAPACITY)
    }
}

impl FileSystem for MemFs {
    fn list_directory(&self, path: &str) -> VfsResult<Vec<Entity>> {
        self.list_directory_impl(path)
    }

    fn get_metadata(&self, path: &str) -> VfsResult<Entity> {
        self.get_metadata_impl(path)
    }

    fn create_file(&self, path: &str) -> VfsResult<()> {
        self.create_impl(path, false)
    }

    fn create_directory(&self, path: &str) -> VfsResult<()> {
        self.create_impl(path, true)
    }

    fn rename(&self, source: &str, destination: &str) -> VfsResult<()> {
        self.rename_impl(source, destination)
    }

    fn delete_file(&self, path: &str) -> VfsResult<()> {
        self.delete_file_impl(path)
    }

    fn delete_directory_recursively(&self, path: &str) -> VfsResult<()> {
        self.delete_directory_impl(path)
    }

    fn set_last_access_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        self.set_time(path, TimeField::Accessed, time)
    }

    fn set_last_modification_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        self.set_time(path, TimeField::Modified, time)
    }

    fn set_creation_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        self.set_time(path, TimeField::Created, time)
    }

    fn open_file(&self, path: &str, read: bool, write: bool) -> VfsResult<FileHandle> {
        self.open_file_impl(path, read, write)
    }

    fn read(&self, handle: &FileHandle, buffer: &mut [u8], offset: u64) -> VfsResult<usize> {
        self.read_impl(handle, buffer, offset)
    }

    fn write(&self, handle: &FileHandle, data: &[u8], offset: u64) -> VfsResult<()> {
        self.write_impl(handle, data, offset)
    }

    fn set_length(&self, handle: &FileHandle, length: u64) -> VfsResult<()> {
        self.set_length_impl(handle, length)
    }

    /// Content is committed on close only
    fn flush(&self, handle: &FileHandle) -> VfsResult<()> {
        handle.ensure_open()
    }

    fn close(&self, handle: &FileHandle) -> VfsResult<()> {
        self.close_impl(handle)
    }

    fn volume_name(&self) -> String {
        self.config.volume_name.clone()
    }

    fn file_system_name(&self) -> String {
        MEMORY_FILESYSTEM_NAME.to_string()
    }

    fn is_case_sensitive(&self) -> bool {
        self.config.case_sensitive
    }

    fn block_size(&self) -> u64 {
        self.config.chunk_size as u64
    }

    fn total_block_count(&self) -> u64 {
        self.capacity() / self.block_size()
    }

    fn free_block_count(&self) -> u64 {
        self.capacity().saturating_sub(self.used_bytes()) / self.block_size()
    }

    fn free_block_available_count(&self) -> u64 {
        self.free_block_count()
    }

    fn files_free_count(&self) -> u64 {
        match self.config.max_files {
            Some(max) => max.saturating_sub(self.entry_count.load(Ordering::SeqCst)),
            None => DEFAULT_FILES_FREE_COUNT,
        }
    }

    fn total_files_count(&self) -> u64 {
        self.entry_count.load(Ordering::SeqCst)
    }
}
