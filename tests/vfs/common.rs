/*!
 * Shared test helpers
 */

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use layerfs::vfs::utils;
use layerfs::vfs::{Entity, FileHandle, FileSystem, MemFs, VfsResult};

/// Read a whole file, panicking on error
pub fn read_all<F: FileSystem + ?Sized>(fs: &F, path: &str) -> Vec<u8> {
    utils::read_whole(fs, path).unwrap()
}

/// Create or replace a file with content
pub fn put<F: FileSystem + ?Sized>(fs: &F, path: &str, content: &[u8]) {
    utils::write_whole(fs, path, content).unwrap()
}

/// MemFs that counts the calls a decorator makes into it
#[derive(Default)]
pub struct CountingFs {
    pub inner: MemFs,
    writes: AtomicUsize,
    reads: AtomicUsize,
}

impl CountingFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl FileSystem for CountingFs {
    fn list_directory(&self, path: &str) -> VfsResult<Vec<Entity>> {
        self.inner.list_directory(path)
    }

    fn get_metadata(&self, path: &str) -> VfsResult<Entity> {
        self.inner.get_metadata(path)
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
        self.inner.open_file(path, read, write)
    }

    fn read(&self, handle: &FileHandle, buffer: &mut [u8], offset: u64) -> VfsResult<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(handle, buffer, offset)
    }

    fn write(&self, handle: &FileHandle, data: &[u8], offset: u64) -> VfsResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write(handle, data, offset)
    }

    fn set_length(&self, handle: &FileHandle, length: u64) -> VfsResult<()> {
        self.inner.set_length(handle, length)
    }

    fn flush(&self, handle: &FileHandle) -> VfsResult<()> {
        self.inner.flush(handle)
    }

    fn close(&self, handle: &FileHandle) -> VfsResult<()> {
        self.inner.close(handle)
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
}
