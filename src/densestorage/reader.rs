//! # Dense Storage Reader
//!
//! Forward-only cursor over the cells a [`DenseStorageWriter`] published.
//! Cheaply cloneable: a clone snapshots the current node and cursors, and
//! the two copies advance independently over the shared append-only queue.
//!
//! [`DenseStorageWriter`]: super::DenseStorageWriter

use super::flow::FlowSemaphore;
use super::node::QueueNode;
use crate::config::{CONTROL_WORD_SIZE, END_OF_STREAM_SENTINEL, LARGE_CELL_SENTINEL};
use crate::containers::ByteSlice;
use eyre::{bail, ensure, eyre, Result};
use std::sync::Arc;
use zerocopy::little_endian::U32;
use zerocopy::FromBytes;

/// One independent cursor over a column's stored cells.
#[derive(Clone)]
pub struct DenseStorageReader {
    node: Arc<QueueNode>,
    packed_pos: usize,
    large_pos: usize,
    flow: Arc<FlowSemaphore>,
}

impl DenseStorageReader {
    pub(super) fn new(node: Arc<QueueNode>, flow: Arc<FlowSemaphore>) -> Self {
        Self {
            node,
            packed_pos: 0,
            large_pos: 0,
            flow,
        }
    }

    /// Next cell's slice, or `None` at end of stream.
    ///
    /// The slice is backed by the current node's packed block or by an owned
    /// large-cell buffer, and stays valid for as long as the caller holds it.
    pub fn try_get_next_slice(&mut self) -> Result<Option<ByteSlice>> {
        match self.next_control_word()? {
            END_OF_STREAM_SENTINEL => {
                // Rewind so repeated calls (and clones taken here) keep
                // seeing the end-of-stream word.
                self.packed_pos -= CONTROL_WORD_SIZE;
                Ok(None)
            }
            LARGE_CELL_SENTINEL => self.next_large_slice().map(Some),
            small_len => self.next_packed_slice(small_len as usize).map(Some),
        }
    }

    /// Close the writer-side flow control. Called when this reader's
    /// consumer fails fatally, so a producer blocked on a permit observes an
    /// error instead of deadlocking.
    pub(crate) fn poison_flow(&self) {
        self.flow.close();
    }

    fn next_control_word(&mut self) -> Result<u32> {
        loop {
            if self.packed_pos == self.node.packed.len() {
                self.advance_node();
                continue;
            }
            let end = self.packed_pos + CONTROL_WORD_SIZE;
            ensure!(
                end <= self.node.packed.len(),
                "dense storage corrupted: truncated control word"
            );
            let word = U32::read_from_bytes(&self.node.packed[self.packed_pos..end])
                .map_err(|_| eyre!("dense storage corrupted: unreadable control word"))?;
            self.packed_pos = end;
            return Ok(word.get());
        }
    }

    fn next_packed_slice(&mut self, len: usize) -> Result<ByteSlice> {
        let available = self.node.packed.len() - self.packed_pos;
        if available < len {
            bail!(
                "dense storage corrupted: short packed block, needed {} bytes, got {}",
                len,
                available
            );
        }
        let begin = self.packed_pos;
        self.packed_pos += len;
        Ok(ByteSlice::new(
            Arc::clone(&self.node.packed),
            begin,
            begin + len,
        ))
    }

    fn next_large_slice(&mut self) -> Result<ByteSlice> {
        if self.large_pos == self.node.large.len() {
            // The writer's flush ordering guarantees a pending handle is the
            // first entry of the very next node.
            self.advance_node();
            ensure!(
                !self.node.large.is_empty(),
                "dense storage corrupted: premature end of large-cell stream"
            );
        }
        let buffer = Arc::clone(&self.node.large[self.large_pos]);
        self.large_pos += 1;
        let len = buffer.len();
        Ok(ByteSlice::new(buffer, 0, len))
    }

    /// Move to the successor node, blocking until it is published.
    fn advance_node(&mut self) {
        let next = self.node.wait_next(&self.flow);
        self.node = next;
        self.packed_pos = 0;
        self.large_pos = 0;
    }
}
