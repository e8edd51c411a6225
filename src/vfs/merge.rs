/*!
 * Merge Wrapper - Union of a master and a slave filesystem
 * Decorator pattern: lookups fall through from master to slave
 */

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

use super::traits::FileSystem;
use super::types::*;

/// Which filesystem served an open handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Master,
    Slave,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Master => write!(f, "master"),
            Side::Slave => write!(f, "slave"),
        }
    }
}

/// Backing of a handle returned by [`MergeFs::open_file`]
struct Routed {
    side: Side,
    handle: FileHandle,
}

/// Union of two filesystems
///
/// New entries always land in the master. Lookups and metadata try the
/// master and consult the slave when the master reports PathNotFound or
/// UnsupportedFeature. Handles remember the side that opened them.
pub struct MergeFs<M: FileSystem, S: FileSystem> {
    master: Arc<M>,
    slave: Arc<S>,
}

impl<M: FileSystem, S: FileSystem> MergeFs<M, S> {
    pub fn new(master: M, slave: S) -> Self {
        Self::from_arcs(Arc::new(master), Arc::new(slave))
    }

    pub fn from_arcs(master: Arc<M>, slave: Arc<S>) -> Self {
        Self { master, slave }
    }

    pub fn master(&self) -> &M {
        &self.master
    }

    pub fn slave(&self) -> &S {
        &self.slave
    }

    /// Side that opened a handle, if it came from this layer
    pub fn side_of(handle: &FileHandle) -> Option<Side> {
        handle.backing::<Routed>().map(|routed| routed.side)
    }

    fn side(&self, side: Side) -> &dyn FileSystem {
        match side {
            Side::Master => &*self.master,
            Side::Slave => &*self.slave,
        }
    }

    /// Inner filesystem and handle for a handle of this layer
    fn route<'h>(&self, handle: &'h FileHandle) -> VfsResult<(&dyn FileSystem, &'h FileHandle)> {
        let routed = handle.backing_or_denied::<Routed>()?;
        Ok((self.side(routed.side), &routed.handle))
    }

    /// Master first; slave on PathNotFound or UnsupportedFeature
    fn fall_through<T>(&self, op: impl Fn(&dyn FileSystem) -> VfsResult<T>) -> VfsResult<T> {
        match op(&*self.master) {
            Err(e) if e.is_fallthrough() => op(&*self.slave),
            other => other,
        }
    }

    /// Master first; slave on any failure
    ///
    /// If the slave does not know the path either, the master's error wins.
    fn either<T>(&self, op: impl Fn(&dyn FileSystem) -> VfsResult<T>) -> VfsResult<T> {
        match op(&*self.master) {
            Ok(value) => Ok(value),
            Err(master_error) => match op(&*self.slave) {
                Err(VfsError::PathNotFound(_)) => Err(master_error),
                other => other,
            },
        }
    }

    /// Master first; slave only on PathNotFound
    fn set_time_with(&self, op: impl Fn(&dyn FileSystem) -> VfsResult<()>) -> VfsResult<()> {
        match op(&*self.master) {
            Err(VfsError::PathNotFound(_)) => op(&*self.slave),
            other => other,
        }
    }
}

impl<M: FileSystem, S: FileSystem> FileSystem for MergeFs<M, S> {
    fn list_directory(&self, path: &str) -> VfsResult<Vec<Entity>> {
        match (self.master.list_directory(path), self.slave.list_directory(path)) {
            (Ok(mut master), Ok(slave)) => {
                master.extend(slave);
                Ok(master)
            }
            (Ok(master), Err(_)) => Ok(master),
            (Err(_), Ok(slave)) => Ok(slave),
            (Err(e), Err(_)) => Err(e),
        }
    }

    fn get_metadata(&self, path: &str) -> VfsResult<Entity> {
        self.fall_through(|fs| fs.get_metadata(path))
    }

    fn path_exists(&self, path: &str) -> bool {
        self.master.path_exists(path) || self.slave.path_exists(path)
    }

    fn create_file(&self, path: &str) -> VfsResult<()> {
        self.master.create_file(path)
    }

    fn create_directory(&self, path: &str) -> VfsResult<()> {
        self.master.create_directory(path)
    }

    fn rename(&self, source: &str, destination: &str) -> VfsResult<()> {
        self.either(|fs| fs.rename(source, destination))
    }

    fn delete_file(&self, path: &str) -> VfsResult<()> {
        self.either(|fs| fs.delete_file(path))
    }

    fn delete_directory_recursively(&self, path: &str) -> VfsResult<()> {
        self.either(|fs| fs.delete_directory_recursively(path))
    }

    fn create_symbolic_link(&self, source: &str, destination: &str) -> VfsResult<()> {
        self.master.create_symbolic_link(source, destination)
    }

    fn create_hard_link(&self, _source: &str, _destination: &str) -> VfsResult<()> {
        Err(VfsError::unsupported("hard links across merged filesystems"))
    }

    fn set_last_access_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        self.set_time_with(|fs| fs.set_last_access_time(path, time))
    }

    fn set_last_modification_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        self.set_time_with(|fs| fs.set_last_modification_time(path, time))
    }

    fn set_creation_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        self.set_time_with(|fs| fs.set_creation_time(path, time))
    }

    fn open_file(&self, path: &str, read: bool, write: bool) -> VfsResult<FileHandle> {
        let (side, handle) = match self.master.open_file(path, read, write) {
            Ok(handle) => (Side::Master, handle),
            Err(e) if e.is_fallthrough() => (Side::Slave, self.slave.open_file(path, read, write)?),
            Err(e) => return Err(e),
        };
        debug!(path, side = %side, handle = %handle.id(), "opened merged file");
        Ok(FileHandle::new(path, read, write, Routed { side, handle }))
    }

    fn read(&self, handle: &FileHandle, buffer: &mut [u8], offset: u64) -> VfsResult<usize> {
        let (fs, inner) = self.route(handle)?;
        fs.read(inner, buffer, offset)
    }

    fn write(&self, handle: &FileHandle, data: &[u8], offset: u64) -> VfsResult<()> {
        let (fs, inner) = self.route(handle)?;
        fs.write(inner, data, offset)
    }

    fn set_length(&self, handle: &FileHandle, length: u64) -> VfsResult<()> {
        let (fs, inner) = self.route(handle)?;
        fs.set_length(inner, length)
    }

    fn flush(&self, handle: &FileHandle) -> VfsResult<()> {
        let (fs, inner) = self.route(handle)?;
        fs.flush(inner)
    }

    fn close(&self, handle: &FileHandle) -> VfsResult<()> {
        let (fs, inner) = self.route(handle)?;
        handle.mark_closed()?;
        fs.close(inner)
    }

    fn get_unix_permissions(&self, path: &str) -> VfsResult<UnixPermissions> {
        self.fall_through(|fs| fs.get_unix_permissions(path))
    }

    fn set_unix_permissions(&self, path: &str, permissions: UnixPermissions) -> VfsResult<()> {
        self.fall_through(|fs| fs.set_unix_permissions(path, permissions))
    }

    fn get_windows_attributes(&self, path: &str) -> VfsResult<WindowsAttributes> {
        self.fall_through(|fs| fs.get_windows_attributes(path))
    }

    fn set_windows_attributes(&self, path: &str, attributes: WindowsAttributes) -> VfsResult<()> {
        self.fall_through(|fs| fs.set_windows_attributes(path, attributes))
    }

    fn list_extended_attributes(&self, path: &str) -> VfsResult<Vec<ExtendedAttribute>> {
        self.fall_through(|fs| fs.list_extended_attributes(path))
    }

    fn get_extended_attribute(&self, path: &str, name: &str) -> VfsResult<ExtendedAttribute> {
        self.fall_through(|fs| fs.get_extended_attribute(path, name))
    }

    fn set_extended_attribute(&self, path: &str, attribute: ExtendedAttribute) -> VfsResult<()> {
        self.fall_through(|fs| fs.set_extended_attribute(path, attribute.clone()))
    }

    fn remove_extended_attribute(&self, path: &str, name: &str) -> VfsResult<()> {
        self.fall_through(|fs| fs.remove_extended_attribute(path, name))
    }

    fn lock_file(&self, handle: &FileHandle, offset: u64, length: u64) -> VfsResult<()> {
        let (fs, inner) = self.route(handle)?;
        fs.lock_file(inner, offset, length)
    }

    fn unlock_file(&self, handle: &FileHandle, offset: u64, length: u64) -> VfsResult<()> {
        let (fs, inner) = self.route(handle)?;
        fs.unlock_file(inner, offset, length)
    }

    fn volume_name(&self) -> String {
        self.master.volume_name()
    }

    fn file_system_name(&self) -> String {
        self.master.file_system_name()
    }

    fn is_case_sensitive(&self) -> bool {
        self.master.is_case_sensitive() || self.slave.is_case_sensitive()
    }

    fn block_size(&self) -> u64 {
        self.master.block_size()
    }

    fn total_block_count(&self) -> u64 {
        self.master.total_block_count()
    }

    fn free_block_count(&self) -> u64 {
        self.master.free_block_count()
    }

    fn free_block_available_count(&self) -> u64 {
        self.master.free_block_available_count()
    }

    fn max_path_length(&self) -> u32 {
        self.master.max_path_length().min(self.slave.max_path_length())
    }

    fn files_free_count(&self) -> u64 {
        self.master.files_free_count().min(self.slave.files_free_count())
    }

    fn total_files_count(&self) -> u64 {
        self.master.total_files_count() + self.slave.total_files_count()
    }

    fn supports_unicode_filenames(&self) -> bool {
        self.master.supports_unicode_filenames() && self.slave.supports_unicode_filenames()
    }

    fn is_compressed(&self) -> bool {
        self.master.is_compressed() || self.slave.is_compressed()
    }

    fn volume_serial_number(&self) -> u32 {
        self.master.volume_serial_number()
    }

    fn is_read_only(&self) -> bool {
        self.master.is_read_only()
    }

    fn before_mounting(&self, mount_path: &str) {
        info!(mount_path, master = %self.master.volume_name(), slave = %self.slave.volume_name(), "merge layer mounting");
        self.master.before_mounting(mount_path);
        self.slave.before_mounting(mount_path);
    }

    fn before_unmounting(&self) {
        self.master.before_unmounting();
        self.slave.before_unmounting();
    }

    fn after_unmounting(&self) {
        self.master.after_unmounting();
        self.slave.after_unmounting();
    }
}
