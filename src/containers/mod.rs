//! # Byte Containers
//!
//! This module provides [`ByteSlice`], the zero-copy cell carrier used on the
//! consumer side of the dense storage queue.
//!
//! A `ByteSlice` is a `(block handle, begin, end)` triple viewing a
//! contiguous range of a published queue-node block. The block is promised
//! immutable for the life of the handle, so a slice stays valid for as long
//! as any reader still references the node that published it. Cloning a
//! slice clones only the `Arc` handle, never the bytes.
//!
//! Producer-side cell views are plain `&[u8]` borrows of grabber-internal
//! buffers; the dense storage writer copies on append, so shared ownership
//! is only needed once cells have been published to readers.

use eyre::{Result, WrapErr};
use std::sync::Arc;

/// View of an immutable byte range inside a shared block.
///
/// Never owns growable storage. Equality compares the viewed bytes, not the
/// identity of the underlying block.
#[derive(Clone)]
pub struct ByteSlice {
    data: Arc<[u8]>,
    begin: usize,
    end: usize,
}

impl ByteSlice {
    /// Create a slice viewing `data[begin..end]`.
    ///
    /// Callers must uphold `begin <= end <= data.len()`; the accessors
    /// index-check on use.
    pub fn new(data: Arc<[u8]>, begin: usize, end: usize) -> Self {
        debug_assert!(begin <= end && end <= data.len());
        Self { data, begin, end }
    }

    /// A slice viewing no bytes.
    pub fn empty() -> Self {
        Self {
            data: Arc::from(&[][..]),
            begin: 0,
            end: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// The viewed bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.begin..self.end]
    }

    /// UTF-8-checked view of the cell text.
    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(self.as_bytes()).wrap_err("cell text is not valid UTF-8")
    }

    /// UTF-8-checked conversion to an owned string.
    pub fn to_utf8_string(&self) -> Result<String> {
        Ok(self.as_str()?.to_owned())
    }
}

impl PartialEq for ByteSlice {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ByteSlice {}

impl PartialEq<[u8]> for ByteSlice {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl std::fmt::Debug for ByteSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match std::str::from_utf8(self.as_bytes()) {
            Ok(s) => write!(f, "ByteSlice({:?})", s),
            Err(_) => write!(f, "ByteSlice({:?})", self.as_bytes()),
        }
    }
}

impl Default for ByteSlice {
    fn default() -> Self {
        Self::empty()
    }
}
