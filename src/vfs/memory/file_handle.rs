/*!
 * File Handle Implementation
 * Backing state of in-memory file handles
 */

use parking_lot::Mutex;

use super::super::stream::ChunkedStream;
use super::super::types::*;
use super::node::NodeId;
use super::MemFs;

/// Backing object stored in every [`FileHandle`] opened by [`MemFs`]
pub(super) struct MemFile {
    pub node: NodeId,
    pub state: Mutex<WriteState>,
}

/// Private working copy of a write handle
///
/// Read-only handles carry no stream and read committed content directly.
pub(super) struct WriteState {
    pub stream: Option<ChunkedStream>,
    /// Committed length when the handle was opened
    pub opened_len: u64,
    /// Largest length this handle has been charged for
    pub charged: u64,
}

impl MemFile {
    pub fn new(node: NodeId, stream: Option<ChunkedStream>, opened_len: u64) -> Self {
        Self {
            node,
            state: Mutex::new(WriteState {
                stream,
                opened_len,
                charged: opened_len,
            }),
        }
    }
}

impl WriteState {
    /// Reserve capacity before the stream grows to `new_len`
    pub fn charge_growth(&mut self, fs: &MemFs, new_len: u64) -> VfsResult<()> {
        if new_len > self.charged {
            fs.check_and_reserve_space(new_len - self.charged)?;
            self.charged = new_len;
        }
        Ok(())
    }
}
