//! # Column Parsers
//!
//! A [`Parser`] turns a column's cell text into typed values flowing into a
//! caller-supplied sink. Parsers are candidates in a per-column ladder; the
//! typing engine ([`crate::reading::column`]) tries them in order and may
//! re-parse a column from the beginning with a wider candidate after a
//! narrower one rejects a cell.
//!
//! ## The parse contract
//!
//! `try_parse(gctx, ctx, iter, begin, end, appending)` consumes cells from
//! `iter` for logical positions `[begin, end)`:
//!
//! - null-literal cells set the null flag and need no valid value,
//! - on the first unacceptable non-null cell the parser returns the current
//!   position *without advancing further*, so the caller can observe
//!   non-exhaustion and fall back,
//! - values and null flags reach the sink in chunks of at most
//!   `chunk_size` rows; `appending` distinguishes extension of the logical
//!   column from backfill of earlier ranges.
//!
//! All built-in parsers share one chunked drive loop and differ only in
//! their per-cell accept function, so the contract is implemented exactly
//! once. Custom parsers implement it themselves via [`CustomParser`].

pub mod custom;

pub use custom::{CustomParser, CustomParserContext};

use crate::config::PARSER_CHUNK_SIZE;
use crate::densestorage::IteratorHolder;
use crate::sinks::{DataType, Sink, SinkFactory, TypedSink};
use crate::tokenization::Tokenizer;
use eyre::{bail, Result};
use std::cell::RefCell;
use std::sync::Arc;

/// Number of value entries a parser buffers between sink writes.
pub const CHUNK_SIZE: usize = PARSER_CHUNK_SIZE;

/// Shared per-column parsing state handed to every parser.
pub struct GlobalContext<'a> {
    /// Index of the column being parsed; passed through to the sink factory.
    pub col_index: usize,
    pub tokenizer: Tokenizer,
    pub sink_factory: &'a dyn SinkFactory,
    null_literals: Vec<Vec<u8>>,
    null_scratch: RefCell<Vec<bool>>,
}

impl<'a> GlobalContext<'a> {
    pub fn new(
        col_index: usize,
        tokenizer: Tokenizer,
        sink_factory: &'a dyn SinkFactory,
        null_literals: &[String],
    ) -> Self {
        Self {
            col_index,
            tokenizer,
            sink_factory,
            null_literals: null_literals.iter().map(|s| s.clone().into_bytes()).collect(),
            null_scratch: RefCell::new(Vec::new()),
        }
    }

    /// Is the iterator's current cell one of the column's null literals?
    pub fn is_null_cell(&self, iter: &IteratorHolder) -> bool {
        self.is_null_text(iter.current().as_bytes())
    }

    pub fn is_null_text(&self, bytes: &[u8]) -> bool {
        self.null_literals.iter().any(|lit| lit.as_slice() == bytes)
    }
}

/// The candidate parsers.
///
/// Equality (used for order-preserving set dedup) is variant identity;
/// custom parsers compare by pointer.
#[derive(Clone)]
pub enum Parser {
    Byte,
    Short,
    Int,
    Long,
    /// `f32` by parsing as `f64` and narrowing. Fast, may lose one ulp.
    FloatFast,
    /// `f32` parsed exactly.
    FloatStrict,
    Double,
    TimestampSeconds,
    TimestampMillis,
    TimestampMicros,
    TimestampNanos,
    DateTime,
    Bool,
    Char,
    String,
    Custom(Arc<dyn CustomParser>),
}

impl Parser {
    /// The ladder used when the caller does not configure one.
    pub fn default_ladder() -> Vec<Parser> {
        vec![
            Parser::Bool,
            Parser::DateTime,
            Parser::Long,
            Parser::Double,
            Parser::String,
        ]
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Parser::Byte => DataType::Byte,
            Parser::Short => DataType::Short,
            Parser::Int => DataType::Int,
            Parser::Long => DataType::Long,
            Parser::FloatFast | Parser::FloatStrict => DataType::Float,
            Parser::Double => DataType::Double,
            Parser::TimestampSeconds
            | Parser::TimestampMillis
            | Parser::TimestampMicros
            | Parser::TimestampNanos => DataType::TimestampNanos,
            Parser::DateTime => DataType::DateTimeNanos,
            Parser::Bool => DataType::Bool,
            Parser::Char => DataType::Char,
            Parser::String => DataType::String,
            Parser::Custom(p) => p.data_type(),
        }
    }

    pub(crate) fn make_context(
        &self,
        gctx: &GlobalContext,
        chunk_size: usize,
    ) -> Result<ParserContext> {
        let factory = gctx.sink_factory;
        let col = gctx.col_index;
        Ok(match self {
            Parser::Byte => {
                ParserContext::Byte(TypedContext::new(factory.make_byte_sink(col), chunk_size, DataType::Byte))
            }
            Parser::Short => {
                ParserContext::Short(TypedContext::new(factory.make_short_sink(col), chunk_size, DataType::Short))
            }
            Parser::Int => {
                ParserContext::Int(TypedContext::new(factory.make_int_sink(col), chunk_size, DataType::Int))
            }
            Parser::Long => {
                ParserContext::Long(TypedContext::new(factory.make_long_sink(col), chunk_size, DataType::Long))
            }
            Parser::FloatFast | Parser::FloatStrict => {
                ParserContext::Float(TypedContext::new(factory.make_float_sink(col), chunk_size, DataType::Float))
            }
            Parser::Double => {
                ParserContext::Double(TypedContext::new(factory.make_double_sink(col), chunk_size, DataType::Double))
            }
            Parser::TimestampSeconds
            | Parser::TimestampMillis
            | Parser::TimestampMicros
            | Parser::TimestampNanos => ParserContext::Timestamp(TypedContext::new(
                factory.make_timestamp_sink(col),
                chunk_size,
                DataType::TimestampNanos,
            )),
            Parser::DateTime => ParserContext::DateTime(TypedContext::new(
                factory.make_datetime_sink(col),
                chunk_size,
                DataType::DateTimeNanos,
            )),
            Parser::Bool => {
                ParserContext::Bool(TypedContext::new(factory.make_bool_sink(col), chunk_size, DataType::Bool))
            }
            Parser::Char => {
                ParserContext::Char(TypedContext::new(factory.make_char_sink(col), chunk_size, DataType::Char))
            }
            Parser::String => {
                ParserContext::String(TypedContext::new(factory.make_string_sink(col), chunk_size, DataType::String))
            }
            Parser::Custom(p) => ParserContext::Custom {
                data_type: p.data_type(),
                ctx: p.make_context(gctx, chunk_size)?,
            },
        })
    }

    pub(crate) fn try_parse(
        &self,
        gctx: &GlobalContext,
        pctx: &mut ParserContext,
        iter: &mut IteratorHolder,
        begin: u64,
        end: u64,
        appending: bool,
    ) -> Result<u64> {
        match (self, pctx) {
            (Parser::Byte, ParserContext::Byte(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_long(bytes).and_then(|v| i8::try_from(v).ok())
                })
            }
            (Parser::Short, ParserContext::Short(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_long(bytes).and_then(|v| i16::try_from(v).ok())
                })
            }
            (Parser::Int, ParserContext::Int(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_long(bytes).and_then(|v| i32::try_from(v).ok())
                })
            }
            (Parser::Long, ParserContext::Long(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_long(bytes)
                })
            }
            (Parser::FloatFast, ParserContext::Float(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_double(bytes).map(|d| d as f32)
                })
            }
            (Parser::FloatStrict, ParserContext::Float(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |_, bytes| {
                    std::str::from_utf8(bytes).ok()?.parse::<f32>().ok()
                })
            }
            (Parser::Double, ParserContext::Double(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_double(bytes)
                })
            }
            (Parser::TimestampSeconds, ParserContext::Timestamp(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_long(bytes)?.checked_mul(1_000_000_000)
                })
            }
            (Parser::TimestampMillis, ParserContext::Timestamp(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_long(bytes)?.checked_mul(1_000_000)
                })
            }
            (Parser::TimestampMicros, ParserContext::Timestamp(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_long(bytes)?.checked_mul(1_000)
                })
            }
            (Parser::TimestampNanos, ParserContext::Timestamp(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_long(bytes)
                })
            }
            (Parser::DateTime, ParserContext::DateTime(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_datetime(bytes)
                })
            }
            (Parser::Bool, ParserContext::Bool(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |g, bytes| {
                    g.tokenizer.try_parse_bool(bytes)
                })
            }
            (Parser::Char, ParserContext::Char(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |_, bytes| {
                    let mut chars = std::str::from_utf8(bytes).ok()?.chars();
                    let c = chars.next()?;
                    if chars.next().is_some() {
                        return None;
                    }
                    Some(c)
                })
            }
            (Parser::String, ParserContext::String(ctx)) => {
                drive_parse(gctx, ctx, iter, begin, end, appending, |_, bytes| {
                    std::str::from_utf8(bytes).ok().map(str::to_owned)
                })
            }
            (Parser::Custom(p), ParserContext::Custom { ctx, .. }) => {
                p.try_parse(gctx, ctx.as_mut(), iter, begin, end, appending)
            }
            _ => bail!("logic error: parser and parser context disagree"),
        }
    }
}

impl PartialEq for Parser {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Parser::Custom(a), Parser::Custom(b)) => Arc::ptr_eq(a, b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl std::fmt::Display for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Parser::Byte => "Byte",
            Parser::Short => "Short",
            Parser::Int => "Int",
            Parser::Long => "Long",
            Parser::FloatFast => "FloatFast",
            Parser::FloatStrict => "FloatStrict",
            Parser::Double => "Double",
            Parser::TimestampSeconds => "TimestampSeconds",
            Parser::TimestampMillis => "TimestampMillis",
            Parser::TimestampMicros => "TimestampMicros",
            Parser::TimestampNanos => "TimestampNanos",
            Parser::DateTime => "DateTime",
            Parser::Bool => "Bool",
            Parser::Char => "Char",
            Parser::String => "String",
            Parser::Custom(p) => return write!(f, "Custom({})", p.name()),
        };
        f.write_str(name)
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Per-parser scratch: the sink, a value chunk, and a parallel null chunk.
pub(crate) struct TypedContext<T> {
    sink: Box<dyn Sink<T>>,
    values: Vec<T>,
    nulls: Vec<bool>,
    chunk_size: usize,
    data_type: DataType,
}

impl<T: Clone + Default> TypedContext<T> {
    fn new(sink: Box<dyn Sink<T>>, chunk_size: usize, data_type: DataType) -> Self {
        Self {
            sink,
            values: Vec::with_capacity(chunk_size),
            nulls: Vec::with_capacity(chunk_size),
            chunk_size,
            data_type,
        }
    }

    fn flush_chunk(&mut self, dest_begin: u64, dest_end: u64, appending: bool) {
        self.sink
            .write(&self.values, &self.nulls, dest_begin, dest_end, appending);
        self.values.clear();
        self.nulls.clear();
    }
}

/// Type-erased parser context; variants mirror the sink element types.
pub(crate) enum ParserContext {
    Byte(TypedContext<i8>),
    Short(TypedContext<i16>),
    Int(TypedContext<i32>),
    Long(TypedContext<i64>),
    Float(TypedContext<f32>),
    Double(TypedContext<f64>),
    Bool(TypedContext<bool>),
    Char(TypedContext<char>),
    String(TypedContext<String>),
    DateTime(TypedContext<i64>),
    Timestamp(TypedContext<i64>),
    Custom {
        data_type: DataType,
        ctx: Box<dyn CustomParserContext>,
    },
}

impl ParserContext {
    pub fn data_type(&self) -> DataType {
        match self {
            ParserContext::Byte(c) => c.data_type,
            ParserContext::Short(c) => c.data_type,
            ParserContext::Int(c) => c.data_type,
            ParserContext::Long(c) => c.data_type,
            ParserContext::Float(c) => c.data_type,
            ParserContext::Double(c) => c.data_type,
            ParserContext::Bool(c) => c.data_type,
            ParserContext::Char(c) => c.data_type,
            ParserContext::String(c) => c.data_type,
            ParserContext::DateTime(c) => c.data_type,
            ParserContext::Timestamp(c) => c.data_type,
            ParserContext::Custom { data_type, .. } => *data_type,
        }
    }

    /// Does this context's sink expose a readable side? Decides whether
    /// numeric unification can copy instead of reparse.
    pub fn has_source(&self) -> bool {
        match self {
            ParserContext::Byte(c) => c.sink.as_source().is_some(),
            ParserContext::Short(c) => c.sink.as_source().is_some(),
            ParserContext::Int(c) => c.sink.as_source().is_some(),
            ParserContext::Long(c) => c.sink.as_source().is_some(),
            ParserContext::Float(c) => c.sink.as_source().is_some(),
            ParserContext::Double(c) => c.sink.as_source().is_some(),
            _ => false,
        }
    }

    /// Surrender the sink as the column result.
    pub fn into_result(self) -> (DataType, TypedSink) {
        match self {
            ParserContext::Byte(c) => (c.data_type, TypedSink::Byte(c.sink)),
            ParserContext::Short(c) => (c.data_type, TypedSink::Short(c.sink)),
            ParserContext::Int(c) => (c.data_type, TypedSink::Int(c.sink)),
            ParserContext::Long(c) => (c.data_type, TypedSink::Long(c.sink)),
            ParserContext::Float(c) => (c.data_type, TypedSink::Float(c.sink)),
            ParserContext::Double(c) => (c.data_type, TypedSink::Double(c.sink)),
            ParserContext::Bool(c) => (c.data_type, TypedSink::Bool(c.sink)),
            ParserContext::Char(c) => (c.data_type, TypedSink::Char(c.sink)),
            ParserContext::String(c) => (c.data_type, TypedSink::String(c.sink)),
            ParserContext::DateTime(c) => (c.data_type, TypedSink::DateTime(c.sink)),
            ParserContext::Timestamp(c) => (c.data_type, TypedSink::Timestamp(c.sink)),
            ParserContext::Custom { data_type, ctx } => (data_type, ctx.into_sink()),
        }
    }
}

/// The one chunked parse loop all built-in parsers share.
///
/// Entry condition: `iter` is positioned on the cell at logical index
/// `begin` (unless the range is empty). Exit: the returned position is one
/// past the last cell written; `iter` is left on the first rejected cell,
/// or exhausted.
fn drive_parse<T: Clone + Default>(
    gctx: &GlobalContext,
    ctx: &mut TypedContext<T>,
    iter: &mut IteratorHolder,
    begin: u64,
    end: u64,
    appending: bool,
    mut accept: impl FnMut(&GlobalContext, &[u8]) -> Option<T>,
) -> Result<u64> {
    let mut current = begin;
    let mut chunk_begin = begin;
    while current < end && !iter.is_exhausted() {
        let bytes = iter.current().as_bytes();
        let entry = if gctx.is_null_text(bytes) {
            Some((T::default(), true))
        } else {
            accept(gctx, bytes).map(|value| (value, false))
        };
        let Some((value, is_null)) = entry else {
            break;
        };
        ctx.values.push(value);
        ctx.nulls.push(is_null);
        current += 1;
        if ctx.values.len() == ctx.chunk_size {
            ctx.flush_chunk(chunk_begin, current, appending);
            chunk_begin = current;
        }
        iter.try_move_next()?;
    }
    if !ctx.values.is_empty() {
        ctx.flush_chunk(chunk_begin, current, appending);
    }
    Ok(current)
}

/// Write null flags (values unspecified) for rows `[begin, end)`.
pub(crate) fn fill_nulls(gctx: &GlobalContext, pctx: &mut ParserContext, begin: u64, end: u64) -> Result<()> {
    match pctx {
        ParserContext::Byte(c) => fill_nulls_typed(gctx, c, begin, end),
        ParserContext::Short(c) => fill_nulls_typed(gctx, c, begin, end),
        ParserContext::Int(c) => fill_nulls_typed(gctx, c, begin, end),
        ParserContext::Long(c) => fill_nulls_typed(gctx, c, begin, end),
        ParserContext::Float(c) => fill_nulls_typed(gctx, c, begin, end),
        ParserContext::Double(c) => fill_nulls_typed(gctx, c, begin, end),
        _ => bail!("logic error: null fill on a non-numeric parser context"),
    }
    Ok(())
}

fn fill_nulls_typed<T: Clone + Default>(
    gctx: &GlobalContext,
    ctx: &mut TypedContext<T>,
    begin: u64,
    end: u64,
) {
    if begin == end {
        return;
    }
    let step = ctx.chunk_size.min((end - begin) as usize);
    let mut scratch = gctx.null_scratch.borrow_mut();
    scratch.clear();
    scratch.resize(step, true);
    let values = vec![T::default(); step];

    let mut current = begin;
    while current != end {
        let run = step.min((end - current) as usize);
        ctx.sink
            .write(&values[..run], &scratch[..run], current, current + run as u64, false);
        current += run as u64;
    }
}

/// Copy rows `[src_begin, src_end)` from a narrower numeric context's source
/// into `dst` starting at `dest_begin`, widening element by element.
pub(crate) fn copy_numeric(
    src: &ParserContext,
    dst: &mut ParserContext,
    src_begin: u64,
    src_end: u64,
    dest_begin: u64,
) -> Result<()> {
    use ParserContext as P;
    match (src, dst) {
        (P::Byte(s), P::Short(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, i16::from),
        (P::Byte(s), P::Int(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, i32::from),
        (P::Byte(s), P::Long(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, i64::from),
        (P::Byte(s), P::Float(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, f32::from),
        (P::Byte(s), P::Double(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, f64::from),
        (P::Short(s), P::Int(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, i32::from),
        (P::Short(s), P::Long(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, i64::from),
        (P::Short(s), P::Float(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, f32::from),
        (P::Short(s), P::Double(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, f64::from),
        (P::Int(s), P::Long(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, i64::from),
        (P::Int(s), P::Float(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, |v| v as f32),
        (P::Int(s), P::Double(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, f64::from),
        (P::Long(s), P::Float(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, |v| v as f32),
        (P::Long(s), P::Double(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, |v| v as f64),
        (P::Float(s), P::Double(d)) => copy_typed(s, d, src_begin, src_end, dest_begin, f64::from),
        _ => bail!("logic error: unsupported numeric widening copy"),
    }
}

fn copy_typed<S: Clone + Default, D: Clone + Default>(
    src: &TypedContext<S>,
    dst: &mut TypedContext<D>,
    src_begin: u64,
    src_end: u64,
    dest_begin: u64,
    convert: impl Fn(S) -> D,
) -> Result<()> {
    let Some(source) = src.sink.as_source() else {
        bail!("logic error: widening copy from a sink with no readable side");
    };
    let step = dst.chunk_size.min((src_end - src_begin).max(1) as usize);
    let mut src_values = vec![S::default(); step];
    let mut nulls = vec![false; step];
    let mut dst_values = vec![D::default(); step];

    let mut src_pos = src_begin;
    let mut dst_pos = dest_begin;
    while src_pos != src_end {
        let run = step.min((src_end - src_pos) as usize);
        source.read(&mut src_values[..run], &mut nulls[..run], src_pos, src_pos + run as u64);
        for i in 0..run {
            dst_values[i] = convert(src_values[i].clone());
        }
        dst.sink
            .write(&dst_values[..run], &nulls[..run], dst_pos, dst_pos + run as u64, false);
        src_pos += run as u64;
        dst_pos += run as u64;
    }
    Ok(())
}
