/*!
 * File Operations Implementation
 * Open, read, write, truncate and commit of file handles
 */

use std::time::SystemTime;
use tracing::debug;

use super::super::stream::{read_chunks_at, ChunkedStream};
use super::super::types::*;
use super::file_handle::MemFile;
use super::node::NodeKind;
use super::MemFs;

impl MemFs {
    pub(super) fn open_file_impl(&self, path: &str, read: bool, write: bool) -> VfsResult<FileHandle> {
        let path = self.normalize(path);
        let mut tree = self.tree.write();

        let id = tree
            .resolve(&path)
            .ok_or_else(|| VfsError::PathNotFound(path.clone()))?;
        let node = tree
            .get_mut(id)
            .ok_or_else(|| VfsError::PathNotFound(path.clone()))?;

        let NodeKind::File { chunks } = &node.kind else {
            return Err(VfsError::NotAFile(path));
        };

        let opened_len = node.length();
        let stream = write.then(|| ChunkedStream::from_chunks(chunks.clone(), self.config.chunk_size));
        node.times.accessed = SystemTime::now();
        drop(tree);

        let handle = FileHandle::new(path, read, write, MemFile::new(id, stream, opened_len));
        debug!(path = %handle.path(), handle = %handle.id(), read, write, "opened file");
        Ok(handle)
    }

    pub(super) fn read_impl(&self, handle: &FileHandle, buffer: &mut [u8], offset: u64) -> VfsResult<usize> {
        handle.ensure_open()?;
        if !handle.can_read() {
            return Err(VfsError::AccessDenied(format!(
                "{} not opened for reading",
                handle.path()
            )));
        }
        let file = handle.backing_or_denied::<MemFile>()?;

        let mut state = file.state.lock();
        if let Some(stream) = state.stream.as_mut() {
            // Read-write handles see their own pending writes
            if offset >= stream.len() {
                return Ok(0);
            }
            stream.seek(offset, false)?;
            return Ok(stream.read(buffer));
        }
        drop(state);

        let tree = self.tree.read();
        match tree.get(file.node).map(|n| &n.kind) {
            Some(NodeKind::File { chunks }) => Ok(read_chunks_at(chunks, offset, buffer)),
            Some(NodeKind::Directory { .. }) => Err(VfsError::NotAFile(handle.path().to_string())),
            None => Err(VfsError::PathNotFound(handle.path().to_string())),
        }
    }

    pub(super) fn write_impl(&self, handle: &FileHandle, data: &[u8], offset: u64) -> VfsResult<()> {
        let file = self.writable(handle)?;
        let mut state = file.state.lock();

        let current_len = match state.stream.as_ref() {
            Some(stream) => stream.len(),
            None => return Err(VfsError::AccessDenied(handle.path().to_string())),
        };
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(VfsError::DriveFull)?;
        let new_len = current_len.max(end);
        state.charge_growth(self, new_len)?;

        if let Some(stream) = state.stream.as_mut() {
            if offset > stream.len() {
                stream.set_length(offset);
            }
            stream.seek(offset, false)?;
            stream.write(data);
        }
        Ok(())
    }

    pub(super) fn set_length_impl(&self, handle: &FileHandle, length: u64) -> VfsResult<()> {
        let file = self.writable(handle)?;
        let mut state = file.state.lock();
        if state.stream.is_none() {
            return Err(VfsError::AccessDenied(handle.path().to_string()));
        }
        state.charge_growth(self, length)?;
        if let Some(stream) = state.stream.as_mut() {
            stream.set_length(length);
        }
        Ok(())
    }

    /// Commit a write handle's stream into its file
    pub(super) fn close_impl(&self, handle: &FileHandle) -> VfsResult<()> {
        handle.mark_closed()?;
        let file = handle.backing_or_denied::<MemFile>()?;

        let mut state = file.state.lock();
        let Some(stream) = state.stream.take() else {
            debug!(path = %handle.path(), handle = %handle.id(), "closed read handle");
            return Ok(());
        };
        let reserved = (state.charged - state.opened_len) as i64;
        let committed_len = stream.len();
        let chunks = stream.into_chunks();

        let mut tree = self.tree.write();
        let delta = match tree.get_mut(file.node) {
            Some(node) if !node.is_dir() => {
                let previous_len = node.length();
                node.kind = NodeKind::File { chunks };
                node.times.modified = SystemTime::now();
                committed_len as i64 - previous_len as i64 - reserved
            }
            // Deleted while open: the working copy is dropped
            Some(_) | None => -reserved,
        };
        drop(tree);
        self.update_size_delta(delta);

        debug!(path = %handle.path(), handle = %handle.id(), length = committed_len, "committed file");
        Ok(())
    }

    fn writable<'h>(&self, handle: &'h FileHandle) -> VfsResult<&'h MemFile> {
        handle.ensure_open()?;
        if !handle.can_write() {
            return Err(VfsError::AccessDenied(format!(
                "{} not opened for writing",
                handle.path()
            )));
        }
        handle.backing_or_denied::<MemFile>()
    }
}
