/*!
 * In-Memory Filesystem Backend
 * Fast, volatile filesystem built on chunked byte streams
 */

mod dir_ops;
mod file_handle;
mod file_ops;
mod metadata_ops;
mod node;

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::config::MemFsConfig;
use super::paths;
use super::types::*;
use crate::core::id::IdGenerator;
use node::{NodeId, Tree};

/// In-memory filesystem implementation
///
/// A tree of directories and files behind one reader-writer lock. File
/// content is a list of shared chunks; open write handles work on a private
/// copy-on-write stream that replaces the file's chunk list on close, so
/// readers only ever see complete committed versions.
///
/// # Performance
/// - Cache-line aligned to prevent false sharing of the atomic size counters
/// - Committing a handle swaps a chunk list; no content bytes are copied
#[repr(C, align(64))]
#[derive(Debug)]
pub struct MemFs {
    pub(in crate::vfs::memory) tree: RwLock<Tree>,
    pub(in crate::vfs::memory) config: MemFsConfig,
    pub(in crate::vfs::memory) node_ids: IdGenerator,
    /// Committed content bytes plus growth reserved by open handles
    pub(in crate::vfs::memory) current_size: AtomicU64,
    /// Files and directories, root excluded
    pub(in crate::vfs::memory) entry_count: AtomicU64,
}

impl MemFs {
    /// Create new in-memory filesystem
    pub fn new() -> Self {
        Self::with_config(MemFsConfig::default())
    }

    /// Create with size limit
    pub fn with_capacity(capacity_bytes: u64) -> Self {
        Self::with_config(MemFsConfig::with_capacity(capacity_bytes))
    }

    pub fn with_config(config: MemFsConfig) -> Self {
        let config = MemFsConfig {
            chunk_size: config.chunk_size.max(1),
            ..config
        };
        Self {
            tree: RwLock::new(Tree::new(config.case_sensitive)),
            node_ids: IdGenerator::starting_at(node::ROOT_ID + 1),
            current_size: AtomicU64::new(0),
            entry_count: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &MemFsConfig {
        &self.config
    }

    /// Bytes in use (committed content plus open-handle reservations)
    pub fn used_bytes(&self) -> u64 {
        self.current_size.load(Ordering::SeqCst)
    }

    pub(in crate::vfs::memory) fn next_node_id(&self) -> NodeId {
        self.node_ids.next()
    }

    /// Normalized path of a caller-supplied one
    pub(in crate::vfs::memory) fn normalize(&self, path: &str) -> String {
        paths::normalize(path)
    }

    /// Check if space is available and reserve it atomically
    pub(in crate::vfs::memory) fn check_and_reserve_space(&self, additional: u64) -> VfsResult<()> {
        if additional == 0 {
            return Ok(());
        }
        match self.config.capacity_bytes {
            Some(max) => self
                .current_size
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                    current
                        .checked_add(additional)
                        .filter(|&new_size| new_size <= max)
                })
                .map(|_| ())
                .map_err(|_| VfsError::DriveFull),
            None => {
                self.current_size.fetch_add(additional, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    /// Apply a signed size change that needs no capacity check
    pub(in crate::vfs::memory) fn update_size_delta(&self, delta: i64) {
        if delta >= 0 {
            self.current_size.fetch_add(delta as u64, Ordering::SeqCst);
        } else {
            let release = delta.unsigned_abs();
            let _ = self
                .current_size
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                    Some(current.saturating_sub(release))
                });
        }
    }

    /// Reserve one entry slot, NoCapacity once `max_files` is reached
    pub(in crate::vfs::memory) fn reserve_entry(&self) -> VfsResult<()> {
        match self.config.max_files {
            Some(max) => self
                .entry_count
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                    (count < max).then_some(count + 1)
                })
                .map(|_| ())
                .map_err(|_| VfsError::NoCapacity),
            None => {
                self.entry_count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    pub(in crate::vfs::memory) fn release_entries(&self, count: u64) {
        let _ = self
            .entry_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_sub(count))
            });
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}
