//! # Custom Parsers
//!
//! Caller-supplied parsers slot into a column's parser ladder between the
//! probed built-in group and the char/string fallbacks, in configured order.
//! A custom parser owns its element type end to end: it builds its own
//! context (usually holding a sink obtained from caller-side state), parses
//! cells from the iterator under the same contract as the built-ins, and
//! finally surrenders a type-erased sink handle for the result.

use super::GlobalContext;
use crate::densestorage::IteratorHolder;
use crate::sinks::{DataType, TypedSink};
use eyre::Result;
use std::any::Any;

/// Opaque per-column scratch of a [`CustomParser`]. Implementations
/// downcast through [`as_any_mut`](CustomParserContext::as_any_mut) inside
/// their own `try_parse`.
pub trait CustomParserContext: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Hand the finished column back to the caller.
    fn into_sink(self: Box<Self>) -> TypedSink;
}

/// A user parser participating in type inference.
///
/// The `try_parse` contract matches the built-in parsers: consume cells
/// from `iter` for logical positions `[begin, end)`, write values and null
/// flags to the context's sink in chunks, and return the position one past
/// the last cell written. On the first unacceptable non-null cell, return
/// without advancing further so the engine can fall back. A parser that
/// accepts a cell during the first phase must also accept every cell it
/// skipped as part of the leading null run, or the second phase fails with
/// a logic error.
pub trait CustomParser: Send + Sync {
    /// Identifier used in configuration errors and inference failures.
    fn name(&self) -> &str;

    fn data_type(&self) -> DataType {
        DataType::Custom
    }

    fn make_context(
        &self,
        gctx: &GlobalContext,
        chunk_size: usize,
    ) -> Result<Box<dyn CustomParserContext>>;

    fn try_parse(
        &self,
        gctx: &GlobalContext,
        ctx: &mut dyn CustomParserContext,
        iter: &mut IteratorHolder,
        begin: u64,
        end: u64,
        appending: bool,
    ) -> Result<u64>;
}
