/*!
 * VFS Types
 * Shared types for filesystem operations
 */

pub mod attributes;
mod entity;
mod errors;
mod handle;
pub mod permissions;
mod volume;
mod xattr;

pub use attributes::WindowsAttributes;
pub use entity::{Entity, EntityKind, Timestamps};
pub use errors::{ErrorKind, VfsError, VfsResult};
pub use handle::FileHandle;
pub use permissions::UnixPermissions;
pub use volume::VolumeInfo;
pub use xattr::ExtendedAttribute;
