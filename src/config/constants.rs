//! # turcsv Configuration Constants
//!
//! This module centralizes the tunables of the reader. Constants that depend
//! on each other are co-located and their relationships documented, so a
//! change to one cannot silently invalidate another.
//!
//! ## Dependency Graph
//!
//! ```text
//! PACKED_BLOCK_CAPACITY (64 KiB)
//!       │
//!       ├─> LARGE_CELL_THRESHOLD (must satisfy
//!       │     CONTROL_WORD_SIZE + LARGE_CELL_THRESHOLD <= PACKED_BLOCK_CAPACITY,
//!       │     otherwise a maximal small cell could never fit in an empty
//!       │     packed block and the writer would loop flushing forever)
//!       │
//!       └─> CONTROL_WORD_SIZE (4 bytes, little-endian u32, inlined in the
//!             packed block ahead of each small cell's payload)
//!
//! LARGE_CELL_SENTINEL / END_OF_STREAM_SENTINEL
//!       │
//!       └─> Reserved at the high end of the u32 control-word space.
//!           LARGE_CELL_THRESHOLD must stay below both so a small-cell
//!           length can never collide with a sentinel.
//!
//! MAX_UNOBSERVED_BLOCKS (1000)
//!       │
//!       └─> Bounds how many published blocks the writer may be ahead of
//!           the slowest reader. Worst-case buffered bytes per column is
//!           roughly MAX_UNOBSERVED_BLOCKS * PACKED_BLOCK_CAPACITY.
//! ```
//!
//! ## Critical Invariants
//!
//! Enforced by the compile-time assertions at the bottom of this file:
//!
//! 1. `CONTROL_WORD_SIZE + LARGE_CELL_THRESHOLD <= PACKED_BLOCK_CAPACITY`
//! 2. `(LARGE_CELL_THRESHOLD as u32) < LARGE_CELL_SENTINEL`
//! 3. `LARGE_CELL_SENTINEL != END_OF_STREAM_SENTINEL`

/// Size in bytes of one inlined control word (little-endian `u32`).
pub const CONTROL_WORD_SIZE: usize = 4;

/// Cells at or above this byte length get their own owned buffer instead of
/// being packed. Large cells would pack poorly (a big cell that does not fit
/// the current block would strand the block's tail), and their bookkeeping
/// overhead is negligible relative to their payload.
pub const LARGE_CELL_THRESHOLD: usize = 1024;

/// Capacity of one packed block: control words plus small-cell payloads.
pub const PACKED_BLOCK_CAPACITY: usize = 64 * 1024;

/// Capacity of one large-handle block (number of owned-buffer handles).
pub const LARGE_BLOCK_CAPACITY: usize = 128;

/// Control-word sentinel: the next cell is the next large-buffer handle.
pub const LARGE_CELL_SENTINEL: u32 = u32::MAX - 1;

/// Control-word sentinel: no more cells in this column.
pub const END_OF_STREAM_SENTINEL: u32 = u32::MAX;

/// How many published blocks the writer may run ahead of the slowest reader
/// before `acquire` blocks. Higher values smooth out bursty consumers at the
/// cost of buffered memory.
pub const MAX_UNOBSERVED_BLOCKS: usize = 1000;

/// Number of entries in a parser's value chunk and null-flag chunk. Sinks
/// receive writes in runs of at most this many rows.
pub const PARSER_CHUNK_SIZE: usize = 64 * 1024;

/// Size of the delimited cell grabber's fixed read buffer.
pub const GRABBER_BUFFER_SIZE: usize = 64 * 1024;

/// Byte that can never begin a UTF-8 sequence. The line grabber uses it as
/// both delimiter and quote so that only row terminators split the input.
pub const ILLEGAL_UTF8_BYTE: u8 = 0xFF;

const _: () = assert!(
    CONTROL_WORD_SIZE + LARGE_CELL_THRESHOLD <= PACKED_BLOCK_CAPACITY,
    "a maximal small cell (control word + payload) must fit in an empty packed block"
);

const _: () = assert!(
    (LARGE_CELL_THRESHOLD as u32) < LARGE_CELL_SENTINEL,
    "small-cell lengths must not collide with the reserved control-word sentinels"
);

const _: () = assert!(
    LARGE_CELL_SENTINEL != END_OF_STREAM_SENTINEL,
    "control-word sentinels must be distinct"
);
