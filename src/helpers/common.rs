use crate::errors::{Error, Result};

/// Chunk size offered to the compression primitive per call.
pub const CHUNK_SIZE: usize = 16384;

pub(crate) const WINDOW_BITS: u8 = 15;

/// Owning output buffer for the codec loops.
///
/// The buffer grows by whole chunks ahead of the produced bytes and is
/// shrunk exactly once, to the produced length, when the codec is done.
/// Keeping that policy inside the type means a codec can never hand out
/// a window that overlaps bytes it already produced.
pub struct ChunkBuffer {
    data: Vec<u8>,
    produced: usize,
}

impl ChunkBuffer {
    pub fn new() -> ChunkBuffer {
        ChunkBuffer {
            data: Vec::new(),
            produced: 0,
        }
    }

    /// Make sure at least one full chunk of window is available past the
    /// produced bytes.
    pub fn ensure_window(&mut self) -> Result<()> {
        if self.data.len() - self.produced < CHUNK_SIZE {
            self.data
                .try_reserve_exact(CHUNK_SIZE)
                .map_err(|_| Error::Allocation(self.data.len() + CHUNK_SIZE))?;
            let target = self.data.len() + CHUNK_SIZE;
            self.data.resize(target, 0);
        }
        Ok(())
    }

    /// Writable window between the produced bytes and the buffer end.
    pub fn window(&mut self) -> &mut [u8] {
        &mut self.data[self.produced..]
    }

    /// Record `count` bytes written into the window.
    pub fn advance(&mut self, count: usize) {
        debug_assert!(self.produced + count <= self.data.len());
        self.produced += count;
    }

    pub fn len(&self) -> usize {
        self.produced
    }

    pub fn is_empty(&self) -> bool {
        self.produced == 0
    }

    /// Drop `count` bytes from the tail of the produced output.
    pub fn truncate_tail(&mut self, count: usize) {
        self.produced = self.produced.saturating_sub(count);
    }

    /// Shrink to the produced length and hand the bytes out.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.data.truncate(self.produced);
        self.data.shrink_to_fit();
        self.data
    }
}

impl Default for ChunkBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_by_whole_chunks() {
        let mut buf = ChunkBuffer::new();
        buf.ensure_window().unwrap();
        assert_eq!(buf.window().len(), CHUNK_SIZE);

        buf.window()[..3].copy_from_slice(b"abc");
        buf.advance(3);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.window().len(), CHUNK_SIZE - 3);

        buf.ensure_window().unwrap();
        assert_eq!(buf.window().len(), 2 * CHUNK_SIZE - 3);
    }

    #[test]
    fn window_never_overlaps_produced_bytes() {
        let mut buf = ChunkBuffer::new();
        buf.ensure_window().unwrap();
        buf.window()[..2].copy_from_slice(b"hi");
        buf.advance(2);
        buf.window()[0] = b'!';
        assert_eq!(buf.into_bytes(), b"hi");
    }

    #[test]
    fn truncate_tail_drops_from_the_end() {
        let mut buf = ChunkBuffer::new();
        buf.ensure_window().unwrap();
        buf.window()[..6].copy_from_slice(b"abcdef");
        buf.advance(6);
        buf.truncate_tail(4);
        assert_eq!(buf.into_bytes(), b"ab");
    }

    #[test]
    fn truncate_tail_saturates() {
        let mut buf = ChunkBuffer::new();
        buf.truncate_tail(10);
        assert!(buf.is_empty());
        assert!(buf.into_bytes().is_empty());
    }
}
