/*!
 * VFS Traits
 * The filesystem capability contract
 */

use std::time::SystemTime;

use super::types::*;
use crate::core::limits::{DEFAULT_FILES_FREE_COUNT, DEFAULT_MAX_PATH_LENGTH, DEFAULT_VOLUME_SERIAL};

/// Virtual filesystem trait
///
/// The capability contract every backing store and every decorator
/// implements. Paths are absolute, `/`-separated strings.
///
/// Optional capabilities (links, permissions, attributes, extended
/// attributes, locking) fail with [`VfsError::UnsupportedFeature`] by
/// default; decorators such as the extended-support layer translate that
/// into an emulation.
///
/// All operations are blocking and may be called from many threads at once,
/// including concurrently on the same handle.
pub trait FileSystem: Send + Sync {
    // ------------------------------------------------------------------
    // Query
    // ------------------------------------------------------------------

    /// List the entities directly inside a directory
    fn list_directory(&self, path: &str) -> VfsResult<Vec<Entity>>;

    /// Metadata snapshot of a single entity
    fn get_metadata(&self, path: &str) -> VfsResult<Entity>;

    /// True unless metadata lookup fails with PathNotFound
    fn path_exists(&self, path: &str) -> bool {
        !matches!(self.get_metadata(path), Err(VfsError::PathNotFound(_)))
    }

    /// Number of entries in a directory; 0 when it cannot be listed
    fn number_of_files_in_directory(&self, path: &str) -> usize {
        self.list_directory(path).map(|entries| entries.len()).unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Create an empty file; the parent must exist
    fn create_file(&self, path: &str) -> VfsResult<()>;

    /// Create a directory; the parent must exist
    fn create_directory(&self, path: &str) -> VfsResult<()>;

    /// Rename or move an entity
    fn rename(&self, source: &str, destination: &str) -> VfsResult<()>;

    fn delete_file(&self, path: &str) -> VfsResult<()>;

    fn delete_directory_recursively(&self, path: &str) -> VfsResult<()>;

    /// Delete whatever `path` names
    fn delete(&self, path: &str) -> VfsResult<()> {
        match self.get_metadata(path)? {
            Entity::Directory { .. } => self.delete_directory_recursively(path),
            Entity::File { .. } | Entity::SymbolicLink { .. } => self.delete_file(path),
        }
    }

    /// Create `source` as a symbolic link pointing at `destination`
    fn create_symbolic_link(&self, _source: &str, _destination: &str) -> VfsResult<()> {
        Err(VfsError::unsupported("symbolic links"))
    }

    /// Create `source` as a hard link to the existing file `destination`
    fn create_hard_link(&self, _source: &str, _destination: &str) -> VfsResult<()> {
        Err(VfsError::unsupported("hard links"))
    }

    fn set_last_access_time(&self, path: &str, time: SystemTime) -> VfsResult<()>;

    fn set_last_modification_time(&self, path: &str, time: SystemTime) -> VfsResult<()>;

    fn set_creation_time(&self, path: &str, time: SystemTime) -> VfsResult<()>;

    // ------------------------------------------------------------------
    // Content I/O
    // ------------------------------------------------------------------

    /// Open a file with the given intent
    fn open_file(&self, path: &str, read: bool, write: bool) -> VfsResult<FileHandle>;

    /// Read up to `buffer.len()` bytes at `offset`; returns bytes read
    ///
    /// Reading at or past end-of-file returns 0.
    fn read(&self, handle: &FileHandle, buffer: &mut [u8], offset: u64) -> VfsResult<usize>;

    /// Write all of `data` at `offset`
    ///
    /// Writing past end-of-file leaves a zero-filled gap.
    fn write(&self, handle: &FileHandle, data: &[u8], offset: u64) -> VfsResult<()>;

    /// Truncate or extend (zero-filled) to `length`
    fn set_length(&self, handle: &FileHandle, length: u64) -> VfsResult<()>;

    fn flush(&self, handle: &FileHandle) -> VfsResult<()>;

    /// Close the handle; writes become visible to other handles
    fn close(&self, handle: &FileHandle) -> VfsResult<()>;

    // ------------------------------------------------------------------
    // Metadata extensions
    // ------------------------------------------------------------------

    /// Defaults by entity kind: directories 0o777, everything else 0o666
    fn get_unix_permissions(&self, path: &str) -> VfsResult<UnixPermissions> {
        Ok(match self.get_metadata(path)? {
            Entity::Directory { .. } => UnixPermissions::default_directory(),
            Entity::File { .. } | Entity::SymbolicLink { .. } => UnixPermissions::default_file(),
        })
    }

    fn set_unix_permissions(&self, _path: &str, _permissions: UnixPermissions) -> VfsResult<()> {
        Err(VfsError::unsupported("unix permissions"))
    }

    /// Read-only preset on read-only volumes, nothing set otherwise
    fn get_windows_attributes(&self, path: &str) -> VfsResult<WindowsAttributes> {
        self.get_metadata(path)?;
        if self.is_read_only() {
            Ok(WindowsAttributes::read_only())
        } else {
            Ok(WindowsAttributes::default())
        }
    }

    fn set_windows_attributes(&self, _path: &str, _attributes: WindowsAttributes) -> VfsResult<()> {
        Err(VfsError::unsupported("windows attributes"))
    }

    fn list_extended_attributes(&self, _path: &str) -> VfsResult<Vec<ExtendedAttribute>> {
        Err(VfsError::unsupported("extended attributes"))
    }

    /// Look an attribute up by name through [`FileSystem::list_extended_attributes`]
    fn get_extended_attribute(&self, path: &str, name: &str) -> VfsResult<ExtendedAttribute> {
        self.list_extended_attributes(path)?
            .into_iter()
            .find(|attribute| attribute.name == name)
            .ok_or_else(|| VfsError::AttributeNotFound(name.to_string()))
    }

    /// Add or overwrite an attribute
    fn set_extended_attribute(&self, _path: &str, _attribute: ExtendedAttribute) -> VfsResult<()> {
        Err(VfsError::unsupported("extended attributes"))
    }

    fn remove_extended_attribute(&self, _path: &str, _name: &str) -> VfsResult<()> {
        Err(VfsError::unsupported("extended attributes"))
    }

    /// Lock `length` bytes starting at `offset` for this handle
    fn lock_file(&self, _handle: &FileHandle, _offset: u64, _length: u64) -> VfsResult<()> {
        Err(VfsError::unsupported("file locking"))
    }

    fn unlock_file(&self, _handle: &FileHandle, _offset: u64, _length: u64) -> VfsResult<()> {
        Err(VfsError::unsupported("file locking"))
    }

    // ------------------------------------------------------------------
    // Volume
    // ------------------------------------------------------------------

    fn volume_name(&self) -> String;

    fn file_system_name(&self) -> String;

    fn is_case_sensitive(&self) -> bool;

    fn block_size(&self) -> u64;

    fn total_block_count(&self) -> u64;

    fn free_block_count(&self) -> u64;

    fn free_block_available_count(&self) -> u64;

    fn max_path_length(&self) -> u32 {
        DEFAULT_MAX_PATH_LENGTH
    }

    fn files_free_count(&self) -> u64 {
        DEFAULT_FILES_FREE_COUNT
    }

    fn total_files_count(&self) -> u64 {
        0
    }

    fn supports_unicode_filenames(&self) -> bool {
        true
    }

    fn is_compressed(&self) -> bool {
        false
    }

    fn volume_serial_number(&self) -> u32 {
        DEFAULT_VOLUME_SERIAL
    }

    fn is_read_only(&self) -> bool {
        false
    }

    /// Snapshot of every volume query
    fn volume_info(&self) -> VolumeInfo {
        VolumeInfo {
            volume_name: self.volume_name(),
            file_system_name: self.file_system_name(),
            case_sensitive: self.is_case_sensitive(),
            block_size: self.block_size(),
            total_blocks: self.total_block_count(),
            free_blocks: self.free_block_count(),
            available_blocks: self.free_block_available_count(),
            max_path_length: self.max_path_length(),
            files_free_count: self.files_free_count(),
            total_files_count: self.total_files_count(),
            read_only: self.is_read_only(),
            unicode_filenames: self.supports_unicode_filenames(),
            compressed: self.is_compressed(),
            serial_number: self.volume_serial_number(),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Called right before the filesystem is attached to a host
    fn before_mounting(&self, _mount_path: &str) {}

    /// Called right before the filesystem is detached
    fn before_unmounting(&self) {}

    /// Called once detaching completed
    fn after_unmounting(&self) {}
}

/// Forwarding impl so layers can share one inner filesystem behind an `Arc`
impl<F: FileSystem + ?Sized> FileSystem for std::sync::Arc<F> {
    fn list_directory(&self, path: &str) -> VfsResult<Vec<Entity>> {
        (**self).list_directory(path)
    }
    fn get_metadata(&self, path: &str) -> VfsResult<Entity> {
        (**self).get_metadata(path)
    }
    fn path_exists(&self, path: &str) -> bool {
        (**self).path_exists(path)
    }
    fn number_of_files_in_directory(&self, path: &str) -> usize {
        (**self).number_of_files_in_directory(path)
    }
    fn create_file(&self, path: &str) -> VfsResult<()> {
        (**self).create_file(path)
    }
    fn create_directory(&self, path: &str) -> VfsResult<()> {
        (**self).create_directory(path)
    }
    fn rename(&self, source: &str, destination: &str) -> VfsResult<()> {
        (**self).rename(source, destination)
    }
    fn delete_file(&self, path: &str) -> VfsResult<()> {
        (**self).delete_file(path)
    }
    fn delete_directory_recursively(&self, path: &str) -> VfsResult<()> {
        (**self).delete_directory_recursively(path)
    }
    fn delete(&self, path: &str) -> VfsResult<()> {
        (**self).delete(path)
    }
    fn create_symbolic_link(&self, source: &str, destination: &str) -> VfsResult<()> {
        (**self).create_symbolic_link(source, destination)
    }
    fn create_hard_link(&self, source: &str, destination: &str) -> VfsResult<()> {
        (**self).create_hard_link(source, destination)
    }
    fn set_last_access_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        (**self).set_last_access_time(path, time)
    }
    fn set_last_modification_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        (**self).set_last_modification_time(path, time)
    }
    fn set_creation_time(&self, path: &str, time: SystemTime) -> VfsResult<()> {
        (**self).set_creation_time(path, time)
    }
    fn open_file(&self, path: &str, read: bool, write: bool) -> VfsResult<FileHandle> {
        (**self).open_file(path, read, write)
    }
    fn read(&self, handle: &FileHandle, buffer: &mut [u8], offset: u64) -> VfsResult<usize> {
        (**self).read(handle, buffer, offset)
    }
    fn write(&self, handle: &FileHandle, data: &[u8], offset: u64) -> VfsResult<()> {
        (**self).write(handle, data, offset)
    }
    fn set_length(&self, handle: &FileHandle, length: u64) -> VfsResult<()> {
        (**self).set_length(handle, length)
    }
    fn flush(&self, handle: &FileHandle) -> VfsResult<()> {
        (**self).flush(handle)
    }
    fn close(&self, handle: &FileHandle) -> VfsResult<()> {
        (**self).close(handle)
    }
    fn get_unix_permissions(&self, path: &str) -> VfsResult<UnixPermissions> {
        (**self).get_unix_permissions(path)
    }
    fn set_unix_permissions(&self, path: &str, permissions: UnixPermissions) -> VfsResult<()> {
        (**self).set_unix_permissions(path, permissions)
    }
    fn get_windows_attributes(&self, path: &str) -> VfsResult<WindowsAttributes> {
        (**self).get_windows_attributes(path)
    }
    fn set_windows_attributes(&self, path: &str, attributes: WindowsAttributes) -> VfsResult<()> {
        (**self).set_windows_attributes(path, attributes)
    }
    fn list_extended_attributes(&self, path: &str) -> VfsResult<Vec<ExtendedAttribute>> {
        (**self).list_extended_attributes(path)
    }
    fn get_extended_attribute(&self, path: &str, name: &str) -> VfsResult<ExtendedAttribute> {
        (**self).get_extended_attribute(path, name)
    }
    fn set_extended_attribute(&self, path: &str, attribute: ExtendedAttribute) -> VfsResult<()> {
        (**self).set_extended_attribute(path, attribute)
    }
    fn remove_extended_attribute(&self, path: &str, name: &str) -> VfsResult<()> {
        (**self).remove_extended_attribute(path, name)
    }
    fn lock_file(&self, handle: &FileHandle, offset: u64, length: u64) -> VfsResult<()> {
        (**self).lock_file(handle, offset, length)
    }
    fn unlock_file(&self, handle: &FileHandle, offset: u64, length: u64) -> VfsResult<()> {
        (**self).unlock_file(handle, offset, length)
    }
    fn volume_name(&self) -> String {
        (**self).volume_name()
    }
    fn file_system_name(&self) -> String {
        (**self).file_system_name()
    }
    fn is_case_sensitive(&self) -> bool {
        (**self).is_case_sensitive()
    }
    fn block_size(&self) -> u64 {
        (**self).block_size()
    }
    fn total_block_count(&self) -> u64 {
        (**self).total_block_count()
    }
    fn free_block_count(&self) -> u64 {
        (**self).free_block_count()
    }
    fn free_block_available_count(&self) -> u64 {
        (**self).free_block_available_count()
    }
    fn max_path_length(&self) -> u32 {
        (**self).max_path_length()
    }
    fn files_free_count(&self) -> u64 {
        (**self).files_free_count()
    }
    fn total_files_count(&self) -> u64 {
        (**self).total_files_count()
    }
    fn supports_unicode_filenames(&self) -> bool {
        (**self).supports_unicode_filenames()
    }
    fn is_compressed(&self) -> bool {
        (**self).is_compressed()
    }
    fn volume_serial_number(&self) -> u32 {
        (**self).volume_serial_number()
    }
    fn is_read_only(&self) -> bool {
        (**self).is_read_only()
    }
    fn before_mounting(&self, mount_path: &str) {
        (**self).before_mounting(mount_path)
    }
    fn before_unmounting(&self) {
        (**self).before_unmounting()
    }
    fn after_unmounting(&self) {
        (**self).after_unmounting()
    }
}
