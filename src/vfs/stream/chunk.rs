/*!
 * Chunk
 * Fixed-size, zero-initialized storage segment of a chunked stream
 */

/// One fixed-size segment of stream content
///
/// Bytes at or beyond `filled` are always zero, so raising `filled`
/// without writing exposes zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    data: Box<[u8]>,
    filled: usize,
    index: usize,
}

impl Chunk {
    /// Empty, zeroed chunk at `index`
    pub fn new(size: usize, index: usize) -> Self {
        Self {
            data: vec![0u8; size].into_boxed_slice(),
            filled: 0,
            index,
        }
    }

    /// Capacity of the chunk
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Bytes of meaningful content
    #[inline(always)]
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Ordinal position within the stream
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.filled == self.data.len()
    }

    /// Content bytes `[0, filled)`
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.filled]
    }

    /// Copy `src` to `at`, raising the fill mark if needed
    pub(super) fn write_at(&mut self, at: usize, src: &[u8]) {
        let end = at + src.len();
        self.data[at..end].copy_from_slice(src);
        if end > self.filled {
            self.filled = end;
        }
    }

    /// Raise the fill mark without writing (exposes zeros)
    pub(super) fn stretch_to(&mut self, filled: usize) {
        if filled > self.filled {
            self.filled = filled.min(self.data.len());
        }
    }

    /// Lower the fill mark and zero everything past it
    pub(super) fn truncate(&mut self, filled: usize) {
        if filled < self.data.len() {
            self.data[filled..].fill(0);
        }
        self.filled = filled.min(self.data.len());
    }
}
