/*!
 * Byte-Range Locks
 * Advisory, in-process lock table keyed by path
 */

use ahash::RandomState;
use dashmap::DashMap;

use super::super::types::{VfsError, VfsResult};
use crate::core::id::HandleId;

/// One held lock over `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct RangeLock {
    pub owner: HandleId,
    pub start: u64,
    pub end: u64,
}

impl RangeLock {
    fn new(owner: HandleId, offset: u64, length: u64) -> Self {
        Self {
            owner,
            start: offset,
            end: offset.saturating_add(length),
        }
    }

    #[inline]
    fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start < end && start < self.end
    }
}

/// Active locks per path
///
/// Any overlap conflicts, including a handle re-locking its own range.
#[derive(Default)]
pub(super) struct LockTable {
    by_path: DashMap<String, Vec<RangeLock>, RandomState>,
}

impl LockTable {
    pub fn lock(&self, path: &str, owner: HandleId, offset: u64, length: u64) -> VfsResult<()> {
        let requested = RangeLock::new(owner, offset, length);
        let mut locks = self.by_path.entry(path.to_string()).or_default();
        if locks.iter().any(|held| held.overlaps(requested.start, requested.end)) {
            return Err(VfsError::AlreadyLocked);
        }
        locks.push(requested);
        Ok(())
    }

    /// Release the lock overlapping the range
    ///
    /// No-op when nothing overlaps; AccessDenied when another handle owns it.
    pub fn unlock(&self, path: &str, owner: HandleId, offset: u64, length: u64) -> VfsResult<()> {
        let range = RangeLock::new(owner, offset, length);
        {
            let Some(mut locks) = self.by_path.get_mut(path) else {
                return Ok(());
            };
            let Some(index) = locks.iter().position(|held| held.overlaps(range.start, range.end)) else {
                return Ok(());
            };
            if locks[index].owner != owner {
                return Err(VfsError::AccessDenied(format!(
                    "range {}..{} of {} is locked by another handle",
                    range.start, range.end, path
                )));
            }
            locks.remove(index);
        }
        self.by_path.remove_if(path, |_, locks| locks.is_empty());
        Ok(())
    }

    /// PartIsLocked if another handle holds a lock over the written range
    pub fn check_write(&self, path: &str, writer: HandleId, offset: u64, length: u64) -> VfsResult<()> {
        if length == 0 {
            return Ok(());
        }
        let range = RangeLock::new(writer, offset, length);
        let Some(locks) = self.by_path.get(path) else {
            return Ok(());
        };
        let foreign = locks
            .iter()
            .any(|held| held.owner != writer && held.overlaps(range.start, range.end));
        if foreign {
            return Err(VfsError::PartIsLocked);
        }
        Ok(())
    }

    /// Drop every lock owned by a handle; returns how many were held
    pub fn release(&self, owner: HandleId) -> usize {
        let mut released = 0;
        self.by_path.retain(|_, locks| {
            let before = locks.len();
            locks.retain(|held| held.owner != owner);
            released += before - locks.len();
            !locks.is_empty()
        });
        released
    }

    /// Number of locks held on a path
    pub fn held(&self, path: &str) -> usize {
        self.by_path.get(path).map_or(0, |locks| locks.len())
    }

    pub fn clear(&self) {
        self.by_path.clear();
    }
}
