//! # turcsv - Typed-Column CSV Reader
//!
//! turcsv turns a byte stream of character-separated (or fixed-width)
//! values into a set of typed columns. It solves two problems at once, and
//! the coupling between them is where the design lives:
//!
//! - **Streaming tokenization**, UTF-8 aware, with quoting and embedded
//!   newlines, keeping every cell as a byte slice rather than a per-cell
//!   heap object.
//! - **Two-pass type inference per column**: a ladder of candidate parsers
//!   (narrow integer → wider integer → float → date-time → boolean → char →
//!   string, plus user parsers) is tried in order, and when a narrower
//!   parser rejects a cell, the column is re-parsed from the beginning with
//!   a wider one. The cell text outlives the first pass because a compact
//!   dense byte store is populated by one thread and consumed by a separate
//!   thread per column.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              read() coordinator              │
//! ├──────────────────────────────────────────────┤
//! │ Header Resolvers (delimited / fixed width)   │
//! ├──────────────────────────────────────────────┤
//! │ Cell Grabbers (state machines over bytes)    │
//! ├──────────────────────────────────────────────┤
//! │ Dense Storage (per-column FIFO, N readers)   │
//! ├──────────────────────────────────────────────┤
//! │ Typing Engine (parser ladder, two cursors)   │
//! ├──────────────────────────────────────────────┤
//! │ Parsers / Tokenizer │ Sinks (caller supplied)│
//! └──────────────────────────────────────────────┘
//! ```
//!
//! One producer thread owns the grabber and fans cells out to every
//! column's dense storage writer; one consumer thread per column runs the
//! typing engine over one or two independent readers of the same stored
//! cells. A counting semaphore bounds how far the producer outruns the
//! slowest reader, so memory stays proportional to a few blocks per
//! column, not the file.
//!
//! ## Quick start
//!
//! ```ignore
//! use turcsv::{read, CsvSpecs, VecSinkFactory};
//!
//! let specs = CsvSpecs::builder().build()?;
//! let factory = VecSinkFactory::readable();
//! let result = read(&specs, std::fs::File::open("data.csv")?, &factory)?;
//!
//! for column in result.columns() {
//!     println!("{}: {:?}", column.name(), column.data_type());
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: centralized constants with compile-time invariants
//! - [`containers`]: the zero-copy [`ByteSlice`] cell carrier
//! - [`densestorage`]: the writer/reader FIFO queue and iterator cursors
//! - [`tokenization`]: primitive-value scanning over cell bytes
//! - [`parsers`]: the parser ladder and the chunked parse driver
//! - [`sinks`]: caller-facing sink/source traits and the vec-backed factory
//! - [`reading`]: grabbers, header resolution, producer, typing engine
//! - [`specs`]: the [`CsvSpecs`] configuration builder

pub mod config;
pub mod containers;
pub mod densestorage;
pub mod parsers;
pub mod reading;
pub mod sinks;
pub mod specs;
pub mod tokenization;

pub use containers::ByteSlice;
pub use parsers::{CustomParser, CustomParserContext, Parser};
pub use reading::{read, CsvColumn, CsvReadResult};
pub use sinks::{DataType, Sink, SinkFactory, Source, TypedSink, VecSinkFactory};
pub use specs::CsvSpecs;
pub use tokenization::{CustomDoubleParser, CustomTimeZoneParser};
