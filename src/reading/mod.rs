//! # Reading Pipeline
//!
//! The coordinator behind [`read`]: resolve headers, then run one producer
//! (tokenizer feeding every column's dense storage writer) against one
//! consumer per column (the typing engine).
//!
//! ```text
//! raw bytes ──> cell grabber ──> writer col 0 ──> typing engine ──> sink
//!                          ├───> writer col 1 ──> typing engine ──> sink
//!                          └───> writer col N ──> typing engine ──> sink
//! ```
//!
//! With `concurrent` enabled the producer and all consumers run as scoped
//! threads; otherwise the producer runs to completion first and the
//! consumers follow on the calling thread (the flow-control semaphore is
//! unbounded in that mode, so nothing blocks).
//!
//! ## Failure propagation
//!
//! A consumer that fails closes its column's flow-control semaphore, so a
//! producer blocked on that column unblocks with an error. A producer that
//! fails still finishes every writer, so consumers terminate on truncated
//! streams. The coordinator reports the first failing column's error if
//! any, else the producer's.

pub mod cells;
pub(crate) mod column;
pub(crate) mod headers;
pub(crate) mod populate;

use crate::densestorage;
use crate::sinks::{DataType, SinkFactory, TypedSink};
use crate::specs::CsvSpecs;
use cells::{CellGrabber, DelimitedCellGrabber, FixedCellGrabber};
use eyre::{Result, WrapErr};
use std::io::Read;

/// One produced column: resolved name, inferred type, and the sink handle
/// the caller's factory supplied for it.
pub struct CsvColumn {
    name: String,
    data_type: DataType,
    sink: TypedSink,
}

impl std::fmt::Debug for CsvColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvColumn")
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .finish_non_exhaustive()
    }
}

impl CsvColumn {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn sink(&self) -> &TypedSink {
        &self.sink
    }

    pub fn into_sink(self) -> TypedSink {
        self.sink
    }
}

/// Result of a read: row count plus one typed column per header, in header
/// order.
pub struct CsvReadResult {
    num_rows: u64,
    columns: Vec<CsvColumn>,
}

impl std::fmt::Debug for CsvReadResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvReadResult")
            .field("num_rows", &self.num_rows)
            .field("columns", &self.columns)
            .finish()
    }
}

impl CsvReadResult {
    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn columns(&self) -> &[CsvColumn] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<CsvColumn> {
        self.columns
    }
}

/// Read delimited or fixed-width UTF-8 input into typed columns.
pub fn read(
    specs: &CsvSpecs,
    input: impl Read + Send,
    sink_factory: &dyn SinkFactory,
) -> Result<CsvReadResult> {
    if specs.fixed_width_mode() {
        let mut line_grabber = DelimitedCellGrabber::line_grabber(input);
        let (resolved_headers, widths) = headers::fixed::determine_headers(specs, &mut line_grabber)?;
        let grabber = FixedCellGrabber::new(
            line_grabber,
            widths,
            specs.use_utf32_counting_convention(),
        );
        run_engine(specs, grabber, resolved_headers, None, sink_factory)
    } else {
        let mut grabber = DelimitedCellGrabber::new(
            input,
            specs.quote(),
            specs.delimiter(),
            specs.ignore_surrounding_spaces(),
            specs.trim(),
        );
        let resolved = headers::delimited::determine_headers(specs, &mut grabber)?;
        run_engine(
            specs,
            grabber,
            resolved.headers,
            resolved.first_data_row,
            sink_factory,
        )
    }
}

fn run_engine<G: CellGrabber + Send>(
    specs: &CsvSpecs,
    mut grabber: G,
    resolved_headers: Vec<String>,
    first_data_row: Option<Vec<Vec<u8>>>,
    sink_factory: &dyn SinkFactory,
) -> Result<CsvReadResult> {
    let num_cols = resolved_headers.len();
    let concurrent = specs.concurrent();

    let mut writers = Vec::with_capacity(num_cols);
    let mut readers = Vec::with_capacity(num_cols);
    for _ in 0..num_cols {
        let (writer, reader) = densestorage::create(concurrent);
        writers.push(writer);
        readers.push(reader);
    }

    let run_column = |col: usize, reader: densestorage::DenseStorageReader| {
        let name = resolved_headers[col].as_str();
        let flow_handle = reader.clone();
        let result = column::run_column(
            col,
            reader,
            specs.parsers_for_column(col, name),
            specs.null_parser(),
            specs.null_literals_for_column(col, name),
            specs.tokenizer(),
            sink_factory,
        );
        if result.is_err() {
            // Unblock a producer waiting on this column's flow control.
            flow_handle.poison_flow();
        }
        result.wrap_err_with(|| format!("while parsing column {} ({})", col, name))
    };

    // Shared by reference so every spawned consumer can call it.
    let run_column = &run_column;

    let (produced, column_results) = if concurrent {
        std::thread::scope(|scope| {
            let producer = scope.spawn(move || {
                populate::populate(specs, &mut grabber, first_data_row, writers)
            });
            let consumers: Vec<_> = readers
                .into_iter()
                .enumerate()
                .map(|(col, reader)| scope.spawn(move || run_column(col, reader)))
                .collect();

            let produced = match producer.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            };
            let column_results: Vec<_> = consumers
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect();
            (produced, column_results)
        })
    } else {
        let produced = populate::populate(specs, &mut grabber, first_data_row, writers);
        let column_results = readers
            .into_iter()
            .enumerate()
            .map(|(col, reader)| run_column(col, reader))
            .collect::<Vec<_>>();
        (produced, column_results)
    };

    // A failed consumer poisons the producer, so consumer errors are the
    // root cause and win; a genuine producer failure leaves consumers
    // successful on the truncated (but finished) streams.
    let mut typed_columns = Vec::with_capacity(num_cols);
    let mut first_column_error = None;
    for result in column_results {
        match result {
            Ok(column) => typed_columns.push(column),
            Err(e) => {
                first_column_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_column_error {
        return Err(e);
    }
    let num_rows = produced?;

    let columns = resolved_headers
        .into_iter()
        .zip(typed_columns)
        .map(|(name, (data_type, sink))| CsvColumn {
            name,
            data_type,
            sink,
        })
        .collect();
    Ok(CsvReadResult { num_rows, columns })
}
