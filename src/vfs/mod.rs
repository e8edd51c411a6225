/*!
 * Virtual File System Module
 * Capability contract, in-memory store and composable decorator layers
 */

pub mod caching;
pub mod config;
pub mod conformance;
pub mod extended;
pub mod memory;
pub mod merge;
pub mod paths;
pub mod stream;
pub mod traits;
pub mod types;
pub mod utils;

// Re-exports
pub use caching::CachingFs;
pub use config::{CacheConfig, ExtendedConfig, MemFsConfig, Support};
pub use conformance::ConformanceError;
pub use extended::{ExtendedSupportFs, InMemoryStore, MetadataStore, SiblingFileStore};
pub use memory::MemFs;
pub use merge::{MergeFs, Side};
pub use stream::ChunkedStream;
pub use traits::FileSystem;
pub use types::{
    Entity, EntityKind, ErrorKind, ExtendedAttribute, FileHandle, Timestamps, UnixPermissions, VfsError,
    VfsResult, VolumeInfo, WindowsAttributes,
};
