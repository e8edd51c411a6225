/*!
 * Chunked Byte Stream
 * Growable, seekable, truncatable buffer made of fixed-size chunks
 */

mod chunk;

pub use chunk::Chunk;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::types::VfsError;

/// Stream positioning errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    #[error("offset {offset} out of range (length {length})")]
    OffsetOutOfRange { offset: u64, length: u64 },
}

impl From<StreamError> for VfsError {
    fn from(err: StreamError) -> Self {
        VfsError::AccessDenied(err.to_string())
    }
}

/// Chunked byte stream
///
/// Content lives in an ordered list of equally sized chunks. Every chunk
/// but the last is full and the last one never is, so
/// `len == chunk_size * (chunk_count - 1) + last.filled` and a stream always
/// holds at least one chunk. A new chunk is appended only when content
/// reaches the exact end of the last one.
///
/// Chunks are shared through `Arc` and copied on first write, so a stream
/// built from a file's chunk list never disturbs other readers of that
/// list. [`ChunkedStream::into_chunks`] hands the list back without copying
/// any bytes.
///
/// # Performance
/// - Appends touch only the tail chunk; nothing is ever reallocated or moved
/// - Truncation drops whole chunks and zeroes one partial chunk
pub struct ChunkedStream {
    chunks: Vec<Arc<Chunk>>,
    chunk_size: usize,
    position: u64,
}

impl ChunkedStream {
    /// Empty stream
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunks: vec![Arc::new(Chunk::new(chunk_size, 0))],
            chunk_size,
            position: 0,
        }
    }

    /// Stream holding `content`, positioned at 0
    pub fn from_bytes(content: &[u8], chunk_size: usize) -> Self {
        let mut stream = Self::new(chunk_size);
        stream.write(content);
        stream.position = 0;
        stream
    }

    /// Stream over an existing chunk list, positioned at 0
    ///
    /// The chunk size is taken from the list when it is non-empty.
    pub fn from_chunks(chunks: Vec<Arc<Chunk>>, chunk_size: usize) -> Self {
        if chunks.is_empty() {
            return Self::new(chunk_size);
        }
        let chunk_size = chunks[0].size();
        Self {
            chunks,
            chunk_size,
            position: 0,
        }
    }

    /// Content length in bytes
    #[inline]
    pub fn len(&self) -> u64 {
        content_length(&self.chunks)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    /// Give up the chunk list (no byte copy)
    pub fn into_chunks(self) -> Vec<Arc<Chunk>> {
        self.chunks
    }

    /// Move to `offset`
    ///
    /// Past the end this fails unless `stretch` is set, in which case the
    /// content grows to `offset` with a zero-filled gap.
    pub fn seek(&mut self, offset: u64, stretch: bool) -> Result<(), StreamError> {
        let length = self.len();
        if offset > length {
            if !stretch {
                return Err(StreamError::OffsetOutOfRange { offset, length });
            }
            self.grow_to(offset);
        }
        self.position = offset;
        Ok(())
    }

    /// Truncate or zero-extend to `length`; position moves to `length`
    pub fn set_length(&mut self, length: u64) {
        if length >= self.len() {
            self.grow_to(length);
        } else {
            let cs = self.chunk_size as u64;
            let last_index = (length / cs) as usize;
            let tail = (length % cs) as usize;
            self.chunks.truncate(last_index + 1);
            Arc::make_mut(&mut self.chunks[last_index]).truncate(tail);
        }
        self.position = length;
    }

    /// Write at the current position, growing the stream as needed
    pub fn write(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let end = self.position + data.len() as u64;
        self.grow_to(end);

        let cs = self.chunk_size as u64;
        let mut pos = self.position;
        let mut src = data;
        while !src.is_empty() {
            let idx = (pos / cs) as usize;
            let within = (pos % cs) as usize;
            let step = (self.chunk_size - within).min(src.len());
            Arc::make_mut(&mut self.chunks[idx]).write_at(within, &src[..step]);
            pos += step as u64;
            src = &src[step..];
        }
        self.position = end;
    }

    /// Read as much as available into `buffer`; returns bytes read
    pub fn read(&mut self, buffer: &mut [u8]) -> usize {
        let n = read_chunks_at(&self.chunks, self.position, buffer);
        self.position += n as u64;
        n
    }

    /// Whole content as one buffer
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() as usize);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk.bytes());
        }
        out
    }

    /// Grow (never shrink) to `new_len` with zeros
    fn grow_to(&mut self, new_len: u64) {
        if new_len <= self.len() {
            return;
        }
        let cs = self.chunk_size as u64;
        let last_index = (new_len / cs) as usize;
        let tail = (new_len % cs) as usize;

        // Every chunk before the new last one becomes full
        for i in (self.chunks.len() - 1)..last_index {
            if i < self.chunks.len() {
                Arc::make_mut(&mut self.chunks[i]).stretch_to(self.chunk_size);
            } else {
                let mut full = Chunk::new(self.chunk_size, i);
                full.stretch_to(self.chunk_size);
                self.chunks.push(Arc::new(full));
            }
        }
        if last_index >= self.chunks.len() {
            self.chunks.push(Arc::new(Chunk::new(self.chunk_size, last_index)));
        }
        Arc::make_mut(&mut self.chunks[last_index]).stretch_to(tail);
    }
}

impl fmt::Debug for ChunkedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedStream")
            .field("len", &self.len())
            .field("position", &self.position)
            .field("chunk_size", &self.chunk_size)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

/// Content length of a chunk list
pub fn content_length(chunks: &[Arc<Chunk>]) -> u64 {
    match chunks.last() {
        Some(last) => (last.size() as u64) * (chunks.len() as u64 - 1) + last.filled() as u64,
        None => 0,
    }
}

/// Read from a chunk list at `offset` without building a stream
///
/// Returns 0 at or past the end.
pub fn read_chunks_at(chunks: &[Arc<Chunk>], offset: u64, buffer: &mut [u8]) -> usize {
    let length = content_length(chunks);
    if offset >= length || buffer.is_empty() {
        return 0;
    }
    let cs = chunks[0].size() as u64;
    let to_read = ((length - offset) as usize).min(buffer.len());

    let mut pos = offset;
    let mut copied = 0;
    while copied < to_read {
        let chunk = &chunks[(pos / cs) as usize];
        let within = (pos % cs) as usize;
        let available = &chunk.bytes()[within..];
        let step = available.len().min(to_read - copied);
        buffer[copied..copied + step].copy_from_slice(&available[..step]);
        copied += step;
        pos += step as u64;
    }
    copied
}
