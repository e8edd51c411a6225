/*!
 * layerfs
 * Composable virtual filesystem layers over a chunked in-memory store
 */

pub mod core;
pub mod monitoring;
pub mod vfs;

// Re-exports
pub use vfs::{
    CachingFs, Entity, ExtendedSupportFs, FileHandle, FileSystem, MemFs, MergeFs, VfsError,
    VfsResult,
};
