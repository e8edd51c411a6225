/*!
 * Read Window
 * Single cached byte range per open read handle
 */

/// Most recently fetched range of one handle
///
/// The buffer is allocated on the first miss and reused afterwards.
#[derive(Debug, Default)]
pub(super) struct ReadWindow {
    start: u64,
    filled: usize,
    valid: bool,
    data: Vec<u8>,
}

impl ReadWindow {
    /// Copy the request out of the window if it lies fully inside it
    pub fn serve(&self, offset: u64, buffer: &mut [u8]) -> Option<usize> {
        if !self.valid || offset < self.start {
            return None;
        }
        let within = (offset - self.start) as usize;
        let end = within.checked_add(buffer.len())?;
        if end > self.filled {
            return None;
        }
        buffer.copy_from_slice(&self.data[within..end]);
        Some(buffer.len())
    }

    /// Scratch buffer of exactly `size` bytes for the next fetch
    pub fn fetch_buffer(&mut self, size: usize) -> &mut [u8] {
        self.valid = false;
        if self.data.len() != size {
            self.data = vec![0u8; size];
        }
        &mut self.data
    }

    /// Record what the last fetch produced
    pub fn fill(&mut self, start: u64, filled: usize) {
        self.start = start;
        self.filled = filled.min(self.data.len());
        self.valid = self.filled > 0;
    }

    /// Bytes `[0, len)` of the last fetch
    pub fn head(&self, len: usize) -> &[u8] {
        &self.data[..len.min(self.filled)]
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Invalidate if `[offset, offset + len)` touches the window
    pub fn invalidate_overlap(&mut self, offset: u64, len: u64) {
        if !self.valid {
            return;
        }
        let end = self.start + self.filled as u64;
        if offset < end && offset.saturating_add(len) > self.start {
            self.valid = false;
        }
    }

    #[cfg(test)]
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
