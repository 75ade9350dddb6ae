//! # Iterator Holder
//!
//! Exactly-once forward cursor over a [`DenseStorageReader`] that caches the
//! current cell slice. The typing engine keeps two of these per column so it
//! can take a second pass over the same cells after a narrower parser fails.

use super::reader::DenseStorageReader;
use crate::containers::ByteSlice;
use eyre::Result;

pub struct IteratorHolder {
    reader: DenseStorageReader,
    current: ByteSlice,
    num_consumed: u64,
    exhausted: bool,
}

impl IteratorHolder {
    pub fn new(reader: DenseStorageReader) -> Self {
        Self {
            reader,
            current: ByteSlice::empty(),
            num_consumed: 0,
            exhausted: false,
        }
    }

    /// Advance to the next cell. Returns `false` (and latches `exhausted`)
    /// at end of stream.
    pub fn try_move_next(&mut self) -> Result<bool> {
        match self.reader.try_get_next_slice()? {
            Some(slice) => {
                self.current = slice;
                self.num_consumed += 1;
                Ok(true)
            }
            None => {
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    /// The cell the cursor is currently on. Meaningful only after a
    /// successful [`try_move_next`](Self::try_move_next).
    #[inline]
    pub fn current(&self) -> &ByteSlice {
        &self.current
    }

    /// Cells consumed so far; the current cell's logical index is
    /// `num_consumed() - 1`.
    #[inline]
    pub fn num_consumed(&self) -> u64 {
        self.num_consumed
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The underlying reader, for cloning fresh independent cursors.
    pub fn reader(&self) -> &DenseStorageReader {
        &self.reader
    }
}
