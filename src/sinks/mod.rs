//! # Column Sinks
//!
//! Sinks are the caller-supplied consumers of typed column data. The typing
//! engine pushes values in chunks of
//! [`PARSER_CHUNK_SIZE`](crate::config::PARSER_CHUNK_SIZE) rows, each chunk
//! a parallel pair of a value slice and a null-flag slice.
//!
//! ## Write contract
//!
//! With `appending = true` a sink receives strictly increasing
//! `[dest_begin, dest_end)` ranges extending the logical column; with
//! `appending = false` it receives arbitrary earlier ranges (backfill of a
//! null prefix, or the second inference pass rewriting from row zero).
//! Where a null flag is set the paired value slot is unspecified.
//!
//! ## Sink/Source duality
//!
//! A sink may optionally expose a readable side through
//! [`Sink::as_source`]. The typing engine probes for it when unifying
//! numeric results: if every intermediate numeric sink can be read back,
//! widening is a typed copy instead of a second pass over the cell text.
//!
//! [`VecSinkFactory`] is a ready-made factory storing every column as
//! `Vec<Option<T>>`, used by the test suites and simple callers.

use hashbrown::HashMap;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

/// Type tag of a produced column.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Byte = 0,
    Short = 1,
    Int = 2,
    Long = 3,
    Float = 4,
    Double = 5,
    Bool = 6,
    Char = 7,
    String = 8,
    /// Date-time text parsed to epoch nanoseconds.
    DateTimeNanos = 9,
    /// Integer epoch timestamps scaled to nanoseconds.
    TimestampNanos = 10,
    /// Produced by a caller-supplied custom parser.
    Custom = 11,
}

/// Chunk-oriented consumer of typed column values.
pub trait Sink<T>: Send {
    /// Write one chunk. `values[i]` and `is_null[i]` describe logical row
    /// `dest_begin + i`; the slices are exactly `dest_end - dest_begin`
    /// entries long.
    fn write(&mut self, values: &[T], is_null: &[bool], dest_begin: u64, dest_end: u64, appending: bool);

    /// The readable side of this sink, if it has one.
    fn as_source(&self) -> Option<&dyn Source<T>> {
        None
    }
}

/// Readable side of a sink, used for numeric unification.
pub trait Source<T> {
    /// Read rows `[src_begin, src_end)` back into the chunk slices.
    fn read(&self, values: &mut [T], is_null: &mut [bool], src_begin: u64, src_end: u64);
}

/// Supplies a sink per recognized primitive group. The column index is
/// passed through so factories can address caller-side storage.
pub trait SinkFactory: Send + Sync {
    fn make_byte_sink(&self, col: usize) -> Box<dyn Sink<i8>>;
    fn make_short_sink(&self, col: usize) -> Box<dyn Sink<i16>>;
    fn make_int_sink(&self, col: usize) -> Box<dyn Sink<i32>>;
    fn make_long_sink(&self, col: usize) -> Box<dyn Sink<i64>>;
    fn make_float_sink(&self, col: usize) -> Box<dyn Sink<f32>>;
    fn make_double_sink(&self, col: usize) -> Box<dyn Sink<f64>>;
    fn make_bool_sink(&self, col: usize) -> Box<dyn Sink<bool>>;
    fn make_char_sink(&self, col: usize) -> Box<dyn Sink<char>>;
    fn make_string_sink(&self, col: usize) -> Box<dyn Sink<String>>;
    fn make_datetime_sink(&self, col: usize) -> Box<dyn Sink<i64>>;
    fn make_timestamp_sink(&self, col: usize) -> Box<dyn Sink<i64>>;
}

/// Type-tagged sink handle returned to the caller for each column.
pub enum TypedSink {
    Byte(Box<dyn Sink<i8>>),
    Short(Box<dyn Sink<i16>>),
    Int(Box<dyn Sink<i32>>),
    Long(Box<dyn Sink<i64>>),
    Float(Box<dyn Sink<f32>>),
    Double(Box<dyn Sink<f64>>),
    Bool(Box<dyn Sink<bool>>),
    Char(Box<dyn Sink<char>>),
    String(Box<dyn Sink<String>>),
    DateTime(Box<dyn Sink<i64>>),
    Timestamp(Box<dyn Sink<i64>>),
    Custom(Box<dyn Any + Send>),
}

type SharedColumn<T> = Arc<Mutex<Vec<Option<T>>>>;
type ColumnTable<T> = Mutex<HashMap<usize, SharedColumn<T>>>;

/// Sink over shared `Vec<Option<T>>` storage.
pub struct VecSink<T> {
    data: SharedColumn<T>,
    readable: bool,
}

impl<T: Clone + Default + Send> Sink<T> for VecSink<T> {
    fn write(&mut self, values: &[T], is_null: &[bool], dest_begin: u64, dest_end: u64, _appending: bool) {
        let mut data = self.data.lock();
        let (begin, end) = (dest_begin as usize, dest_end as usize);
        if data.len() < end {
            data.resize(end, None);
        }
        for (i, row) in (begin..end).enumerate() {
            data[row] = if is_null[i] {
                None
            } else {
                Some(values[i].clone())
            };
        }
    }

    fn as_source(&self) -> Option<&dyn Source<T>> {
        if self.readable {
            Some(self)
        } else {
            None
        }
    }
}

impl<T: Clone + Default + Send> Source<T> for VecSink<T> {
    fn read(&self, values: &mut [T], is_null: &mut [bool], src_begin: u64, src_end: u64) {
        let data = self.data.lock();
        for (i, row) in (src_begin as usize..src_end as usize).enumerate() {
            match &data[row] {
                Some(value) => {
                    values[i] = value.clone();
                    is_null[i] = false;
                }
                None => {
                    values[i] = T::default();
                    is_null[i] = true;
                }
            }
        }
    }
}

macro_rules! vec_sink_group {
    ($field:ident, $make:ident, $get:ident, $ty:ty) => {
        fn $make(&self, col: usize) -> Box<dyn Sink<$ty>> {
            Box::new(self.create(&self.$field, col))
        }

        /// Snapshot of the named column's contents, if a sink of this group
        /// was ever created for it.
        pub fn $get(&self, col: usize) -> Option<Vec<Option<$ty>>> {
            self.$field.lock().get(&col).map(|c| c.lock().clone())
        }
    };
}

/// A [`SinkFactory`] backed by `Vec<Option<T>>` per column.
///
/// `readable` controls whether the numeric sinks expose their [`Source`]
/// side; turning it off forces the typing engine onto the second-pass
/// reparse path, which the test suites use to compare both paths.
#[derive(Default)]
pub struct VecSinkFactory {
    readable: bool,
    bytes: ColumnTable<i8>,
    shorts: ColumnTable<i16>,
    ints: ColumnTable<i32>,
    longs: ColumnTable<i64>,
    floats: ColumnTable<f32>,
    doubles: ColumnTable<f64>,
    bools: ColumnTable<bool>,
    chars: ColumnTable<char>,
    strings: ColumnTable<String>,
    datetimes: ColumnTable<i64>,
    timestamps: ColumnTable<i64>,
}

impl VecSinkFactory {
    /// Factory whose numeric sinks are readable (unification path).
    pub fn readable() -> Self {
        Self {
            readable: true,
            ..Self::default()
        }
    }

    /// Factory whose sinks are write-only (second-pass path).
    pub fn write_only() -> Self {
        Self::default()
    }

    fn create<T: Clone + Default + Send>(
        &self,
        table: &ColumnTable<T>,
        col: usize,
    ) -> VecSink<T> {
        let shared: SharedColumn<T> = Arc::new(Mutex::new(Vec::new()));
        table.lock().insert(col, Arc::clone(&shared));
        VecSink {
            data: shared,
            readable: self.readable,
        }
    }
}

impl VecSinkFactory {
    vec_sink_group!(bytes, factory_byte_sink, byte_column, i8);
    vec_sink_group!(shorts, factory_short_sink, short_column, i16);
    vec_sink_group!(ints, factory_int_sink, int_column, i32);
    vec_sink_group!(longs, factory_long_sink, long_column, i64);
    vec_sink_group!(floats, factory_float_sink, float_column, f32);
    vec_sink_group!(doubles, factory_double_sink, double_column, f64);
    vec_sink_group!(bools, factory_bool_sink, bool_column, bool);
    vec_sink_group!(chars, factory_char_sink, char_column, char);
    vec_sink_group!(strings, factory_string_sink, string_column, String);
    vec_sink_group!(datetimes, factory_datetime_sink, datetime_column, i64);
    vec_sink_group!(timestamps, factory_timestamp_sink, timestamp_column, i64);
}

impl SinkFactory for VecSinkFactory {
    fn make_byte_sink(&self, col: usize) -> Box<dyn Sink<i8>> {
        self.factory_byte_sink(col)
    }
    fn make_short_sink(&self, col: usize) -> Box<dyn Sink<i16>> {
        self.factory_short_sink(col)
    }
    fn make_int_sink(&self, col: usize) -> Box<dyn Sink<i32>> {
        self.factory_int_sink(col)
    }
    fn make_long_sink(&self, col: usize) -> Box<dyn Sink<i64>> {
        self.factory_long_sink(col)
    }
    fn make_float_sink(&self, col: usize) -> Box<dyn Sink<f32>> {
        self.factory_float_sink(col)
    }
    fn make_double_sink(&self, col: usize) -> Box<dyn Sink<f64>> {
        self.factory_double_sink(col)
    }
    fn make_bool_sink(&self, col: usize) -> Box<dyn Sink<bool>> {
        self.factory_bool_sink(col)
    }
    fn make_char_sink(&self, col: usize) -> Box<dyn Sink<char>> {
        self.factory_char_sink(col)
    }
    fn make_string_sink(&self, col: usize) -> Box<dyn Sink<String>> {
        self.factory_string_sink(col)
    }
    fn make_datetime_sink(&self, col: usize) -> Box<dyn Sink<i64>> {
        self.factory_datetime_sink(col)
    }
    fn make_timestamp_sink(&self, col: usize) -> Box<dyn Sink<i64>> {
        self.factory_timestamp_sink(col)
    }
}
