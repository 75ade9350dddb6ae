//! # Dense Cell Storage
//!
//! The [`DenseStorageWriter`] and [`DenseStorageReader`] work in tandem as a
//! per-column FIFO queue: the tokenizer thread writes every cell of a column
//! here, and the column's typing engine reads them back, possibly twice.
//!
//! ## Why not one heap object per cell?
//!
//! Storing each cell as its own `String` costs an allocation, a pointer, and
//! a length per cell; for typical short cells (`"hello"`, `"12345.6789"`)
//! the overhead approaches or exceeds the payload. The access pattern here
//! needs none of that generality:
//!
//! 1. Cells are consumed sequentially, once per reader pass. No random
//!    access.
//! 2. Consumers only ever see a *view* of the current cell, invalidated by
//!    moving on (the typing engine holds at most one cell at a time).
//!
//! So cells are packed into shared byte blocks: a 32-bit little-endian
//! control word, inlined ahead of each small cell's payload, says how many
//! payload bytes follow. Two sentinel words at the top of the `u32` range
//! mark large cells and end-of-stream. Cells of
//! [`LARGE_CELL_THRESHOLD`](crate::config::LARGE_CELL_THRESHOLD) bytes or
//! more get their own owned buffer and only a handle in the block, so one
//! oversized cell cannot strand the tail of a packed block.
//!
//! ## Queue model
//!
//! Published blocks form a singly-linked list of [`node::QueueNode`]s.
//! Synchronization happens at block granularity, not cell granularity: a
//! reader that catches up blocks on the node's condition variable until the
//! writer links a successor. Multiple independent readers may consume the
//! same data — cloning a reader snapshots its position — which is how the
//! typing engine takes a second pass without any rewind interface. Nodes
//! that every reader has moved past are freed automatically by dropping the
//! last `Arc`.
//!
//! A counting semaphore with
//! [`MAX_UNOBSERVED_BLOCKS`](crate::config::MAX_UNOBSERVED_BLOCKS) permits
//! bounds how far the writer runs ahead of the *slowest* reader: the writer
//! takes a permit per published node, and the first reader to observe a
//! node's `next` transition returns one. Once a column is down to a single
//! reader that keeps up, the queue buffers roughly one block, not the file.

mod flow;
mod iterator;
mod node;
mod reader;
mod writer;

pub use iterator::IteratorHolder;
pub use reader::DenseStorageReader;
pub use writer::DenseStorageWriter;

use crate::config::MAX_UNOBSERVED_BLOCKS;
use flow::FlowSemaphore;
use node::QueueNode;
use std::sync::Arc;

/// Create a connected writer/reader pair for one column.
///
/// With `concurrent = false` the flow-control semaphore is effectively
/// unbounded: the single-threaded driver runs the writer to completion
/// before any reader starts, so blocking would deadlock.
pub fn create(concurrent: bool) -> (DenseStorageWriter, DenseStorageReader) {
    let permits = if concurrent {
        MAX_UNOBSERVED_BLOCKS
    } else {
        usize::MAX / 2
    };
    let flow = Arc::new(FlowSemaphore::new(permits));
    let head = QueueNode::sentinel();
    let writer = DenseStorageWriter::new(Arc::clone(&head), Arc::clone(&flow));
    let reader = DenseStorageReader::new(head, flow);
    (writer, reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LARGE_CELL_THRESHOLD, PACKED_BLOCK_CAPACITY};

    fn drain(mut reader: DenseStorageReader) -> Vec<Vec<u8>> {
        let mut cells = Vec::new();
        while let Some(slice) = reader.try_get_next_slice().unwrap() {
            cells.push(slice.as_bytes().to_vec());
        }
        cells
    }

    #[test]
    fn roundtrip_small_cells() {
        let (mut writer, reader) = create(false);
        writer.append(b"alpha").unwrap();
        writer.append(b"").unwrap();
        writer.append(b"beta").unwrap();
        writer.finish().unwrap();

        assert_eq!(drain(reader), vec![b"alpha".to_vec(), b"".to_vec(), b"beta".to_vec()]);
    }

    #[test]
    fn roundtrip_large_cells() {
        let big = vec![b'x'; LARGE_CELL_THRESHOLD + 17];
        let (mut writer, reader) = create(false);
        writer.append(b"small").unwrap();
        writer.append(&big).unwrap();
        writer.append(b"after").unwrap();
        writer.finish().unwrap();

        let cells = drain(reader);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[1], big);
        assert_eq!(cells[2], b"after");
    }

    #[test]
    fn threshold_boundary_categorization() {
        // One byte under the threshold is small, exactly at it is large;
        // both must read back byte-identical.
        let under = vec![b'u'; LARGE_CELL_THRESHOLD - 1];
        let at = vec![b'a'; LARGE_CELL_THRESHOLD];
        let (mut writer, reader) = create(false);
        writer.append(&under).unwrap();
        writer.append(&at).unwrap();
        writer.finish().unwrap();

        assert_eq!(drain(reader), vec![under, at]);
    }

    #[test]
    fn cells_spanning_many_blocks() {
        let (mut writer, reader) = create(false);
        let cell = vec![b'q'; 700];
        let count = 3 * PACKED_BLOCK_CAPACITY / (cell.len() + 4);
        for _ in 0..count {
            writer.append(&cell).unwrap();
        }
        writer.finish().unwrap();

        let cells = drain(reader);
        assert_eq!(cells.len(), count);
        assert!(cells.iter().all(|c| *c == cell));
    }

    #[test]
    fn exactly_full_block_boundary() {
        // Craft a cell whose encoding lands exactly on the block's last
        // byte, then keep writing; the reader must see identical output.
        let first_len = PACKED_BLOCK_CAPACITY - 2 * 4 - 10;
        let (mut writer, reader) = create(false);
        writer.append(&vec![b'a'; 10]).unwrap();
        writer.append(&vec![b'b'; first_len]).unwrap();
        writer.append(b"next-block").unwrap();
        writer.finish().unwrap();

        let cells = drain(reader);
        assert_eq!(cells[0].len(), 10);
        assert_eq!(cells[1].len(), first_len);
        assert_eq!(cells[2], b"next-block");
    }

    #[test]
    fn cloned_readers_are_independent() {
        let (mut writer, reader) = create(false);
        for word in [&b"one"[..], b"two", b"three"] {
            writer.append(word).unwrap();
        }
        writer.finish().unwrap();

        let mut first = reader.clone();
        let got = first.try_get_next_slice().unwrap().unwrap();
        assert_eq!(got.as_bytes(), b"one");

        // A clone taken mid-stream continues from the snapshot position.
        let mid = first.clone();
        assert_eq!(drain(mid), vec![b"two".to_vec(), b"three".to_vec()]);
        // The original clone still sees the full stream.
        assert_eq!(
            drain(reader),
            vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
        );
    }

    #[test]
    fn end_of_stream_is_sticky() {
        let (mut writer, mut reader) = create(false);
        writer.append(b"only").unwrap();
        writer.finish().unwrap();

        assert!(reader.try_get_next_slice().unwrap().is_some());
        assert!(reader.try_get_next_slice().unwrap().is_none());
        assert!(reader.try_get_next_slice().unwrap().is_none());
    }

    #[test]
    fn concurrent_writer_reader() {
        let (mut writer, mut reader) = create(true);
        let rows: u32 = 50_000;
        std::thread::scope(|scope| {
            scope.spawn(move || {
                for i in 0..rows {
                    writer.append(format!("cell-{i}").as_bytes()).unwrap();
                }
                writer.finish().unwrap();
            });
            let mut seen = 0u32;
            while let Some(slice) = reader.try_get_next_slice().unwrap() {
                assert_eq!(slice.as_bytes(), format!("cell-{seen}").as_bytes());
                seen += 1;
            }
            assert_eq!(seen, rows);
        });
    }
}
