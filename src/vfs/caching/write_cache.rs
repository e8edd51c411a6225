/*!
 * Write-Coalescing Buffer
 * Single pending contiguous byte range per open write handle
 */

use super::super::types::FileHandle;

/// Bytes waiting to be written at `offset` in one inner call
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct PendingWrite {
    pub offset: u64,
    pub data: Vec<u8>,
}

impl PendingWrite {
    pub fn new(offset: u64, data: &[u8]) -> Self {
        Self {
            offset,
            data: data.to_vec(),
        }
    }

    /// Offset right after the buffered bytes
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }

    /// True if `[offset, offset + len)` touches the buffered range
    pub fn overlaps(&self, offset: u64, len: u64) -> bool {
        offset < self.end() && offset.saturating_add(len) > self.offset
    }
}

/// Write-side state of one handle
///
/// Keeps a clone of the handle so pending bytes can be committed from
/// lifecycle hooks that only see the cache.
#[derive(Debug)]
pub(super) struct WriteSlot {
    pub handle: FileHandle,
    pub pending: Option<PendingWrite>,
}

impl WriteSlot {
    pub fn new(handle: FileHandle) -> Self {
        Self {
            handle,
            pending: None,
        }
    }
}
