//! # Dense Storage Writer
//!
//! Accepts cells in arrival order, categorizes each as small or large, and
//! publishes them in blocks to readers. See the module docs in
//! [`super`](crate::densestorage) for the queue model.

use super::flow::FlowSemaphore;
use super::node::QueueNode;
use crate::config::{
    CONTROL_WORD_SIZE, END_OF_STREAM_SENTINEL, LARGE_BLOCK_CAPACITY, LARGE_CELL_SENTINEL,
    LARGE_CELL_THRESHOLD, PACKED_BLOCK_CAPACITY,
};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use zerocopy::little_endian::U32;
use zerocopy::IntoBytes;

/// Single-writer end of the per-column cell queue.
pub struct DenseStorageWriter {
    /// Current packed block: inlined control words plus small-cell bytes.
    packed: Vec<u8>,
    /// Start of the not-yet-published region of `packed`.
    packed_flushed: usize,
    /// Current large-handle block.
    large: Vec<Arc<[u8]>>,
    /// Start of the not-yet-published region of `large`.
    large_flushed: usize,
    tail: Arc<QueueNode>,
    flow: Arc<FlowSemaphore>,
}

impl DenseStorageWriter {
    pub(super) fn new(tail: Arc<QueueNode>, flow: Arc<FlowSemaphore>) -> Self {
        Self {
            packed: Vec::with_capacity(PACKED_BLOCK_CAPACITY),
            packed_flushed: 0,
            large: Vec::with_capacity(LARGE_BLOCK_CAPACITY),
            large_flushed: 0,
            tail,
            flow,
        }
    }

    /// Append one cell. Small cells are packed inline behind their control
    /// word; large cells get an owned copy and a handle entry.
    pub fn append(&mut self, cell: &[u8]) -> Result<()> {
        if cell.len() >= LARGE_CELL_THRESHOLD {
            self.reserve_packed(CONTROL_WORD_SIZE)?;
            self.push_control(LARGE_CELL_SENTINEL);
            if self.large.len() == LARGE_BLOCK_CAPACITY {
                self.flush()?;
                self.large.clear();
                self.large_flushed = 0;
            }
            self.large.push(Arc::from(cell));
        } else {
            // Control word and payload are reserved together so a small
            // cell's encoding is never split across blocks.
            self.reserve_packed(CONTROL_WORD_SIZE + cell.len())?;
            self.push_control(cell.len() as u32);
            self.packed.extend_from_slice(cell);
        }
        Ok(())
    }

    /// Mark the column complete and publish everything still buffered.
    pub fn finish(mut self) -> Result<()> {
        self.reserve_packed(CONTROL_WORD_SIZE)?;
        self.push_control(END_OF_STREAM_SENTINEL);
        self.flush()
    }

    fn push_control(&mut self, word: u32) {
        self.packed.extend_from_slice(U32::new(word).as_bytes());
    }

    fn reserve_packed(&mut self, needed: usize) -> Result<()> {
        if self.packed.len() + needed > PACKED_BLOCK_CAPACITY {
            self.flush()?;
            self.packed.clear();
            self.packed_flushed = 0;
        }
        Ok(())
    }

    /// Publish the unflushed regions of both blocks as one queue node.
    ///
    /// Acquires one flow-control permit (may block) before linking the node,
    /// so the writer stays within `MAX_UNOBSERVED_BLOCKS` of the slowest
    /// reader.
    fn flush(&mut self) -> Result<()> {
        let packed_range = &self.packed[self.packed_flushed..];
        let large_range = &self.large[self.large_flushed..];
        if packed_range.is_empty() && large_range.is_empty() {
            return Ok(());
        }
        let node = QueueNode::new(Arc::from(packed_range), Arc::from(large_range));
        self.packed_flushed = self.packed.len();
        self.large_flushed = self.large.len();

        self.flow
            .acquire()
            .wrap_err("dense storage writer blocked on flow control")?;
        self.tail.publish_next(Arc::clone(&node))?;
        self.tail = node;
        Ok(())
    }
}
