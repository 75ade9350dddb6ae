//! # Reader Configuration
//!
//! [`CsvSpecs`] is the immutable configuration of a read, built through
//! [`CsvSpecsBuilder`]. Validation happens once in
//! [`build`](CsvSpecsBuilder::build), so a constructed `CsvSpecs` is always
//! internally consistent.
//!
//! ## Option summary
//!
//! | group | options |
//! |-------|---------|
//! | tokenization | `delimiter`, `quote`, `ignore_surrounding_spaces`, `trim` |
//! | row shape | `has_header_row`, `skip_header_rows`, `skip_rows`, `num_rows`, `ignore_empty_lines`, `allow_missing_columns`, `ignore_excess_columns` |
//! | naming | `headers`, `header_for_index` |
//! | typing | `parsers`, `parser_for_name`, `parser_for_index`, `null_value_literals` (+ per-column forms), `null_parser` |
//! | leaf hooks | `custom_double_parser`, `custom_time_zone_parser` |
//! | execution | `concurrent` |
//! | fixed width | `fixed_width`, `fixed_column_widths`, `use_utf32_counting_convention` |
//!
//! In fixed-width mode the `delimiter` doubles as the padding byte that
//! separates (and is trimmed from) columns.

use crate::parsers::Parser;
use crate::tokenization::{CustomDoubleParser, CustomTimeZoneParser, StandardDoubleParser, Tokenizer};
use eyre::{ensure, Result};
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Fixed-width column widths, in character units.
pub type ColumnWidths = SmallVec<[usize; 8]>;

#[derive(Clone)]
pub struct CsvSpecs {
    delimiter: u8,
    quote: u8,
    ignore_surrounding_spaces: bool,
    trim: bool,
    has_header_row: bool,
    skip_header_rows: u64,
    skip_rows: u64,
    num_rows: u64,
    ignore_empty_lines: bool,
    allow_missing_columns: bool,
    ignore_excess_columns: bool,
    headers: Vec<String>,
    header_for_index: HashMap<usize, String>,
    parsers: Vec<Parser>,
    parser_for_name: HashMap<String, Vec<Parser>>,
    parser_for_index: HashMap<usize, Vec<Parser>>,
    null_value_literals: Vec<String>,
    null_literals_for_name: HashMap<String, Vec<String>>,
    null_literals_for_index: HashMap<usize, Vec<String>>,
    null_parser: Option<Parser>,
    custom_double_parser: Arc<dyn CustomDoubleParser>,
    custom_time_zone_parser: Option<Arc<dyn CustomTimeZoneParser>>,
    concurrent: bool,
    fixed_width: bool,
    fixed_column_widths: ColumnWidths,
    use_utf32_counting_convention: bool,
}

impl CsvSpecs {
    pub fn builder() -> CsvSpecsBuilder {
        CsvSpecsBuilder::default()
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn quote(&self) -> u8 {
        self.quote
    }

    pub fn ignore_surrounding_spaces(&self) -> bool {
        self.ignore_surrounding_spaces
    }

    pub fn trim(&self) -> bool {
        self.trim
    }

    pub fn has_header_row(&self) -> bool {
        self.has_header_row
    }

    pub fn skip_header_rows(&self) -> u64 {
        self.skip_header_rows
    }

    pub fn skip_rows(&self) -> u64 {
        self.skip_rows
    }

    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    pub fn ignore_empty_lines(&self) -> bool {
        self.ignore_empty_lines
    }

    pub fn allow_missing_columns(&self) -> bool {
        self.allow_missing_columns
    }

    pub fn ignore_excess_columns(&self) -> bool {
        self.ignore_excess_columns
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn header_for_index(&self) -> &HashMap<usize, String> {
        &self.header_for_index
    }

    pub fn null_parser(&self) -> Option<&Parser> {
        self.null_parser.as_ref()
    }

    pub fn concurrent(&self) -> bool {
        self.concurrent
    }

    pub fn fixed_column_widths(&self) -> &[usize] {
        &self.fixed_column_widths
    }

    /// Fixed-width mode is enabled explicitly or by supplying widths.
    pub fn fixed_width_mode(&self) -> bool {
        self.fixed_width || !self.fixed_column_widths.is_empty()
    }

    pub fn use_utf32_counting_convention(&self) -> bool {
        self.use_utf32_counting_convention
    }

    /// The parser ladder for a column: per-index override, then per-name,
    /// then the shared default.
    pub fn parsers_for_column(&self, index: usize, name: &str) -> &[Parser] {
        if let Some(p) = self.parser_for_index.get(&index) {
            return p;
        }
        if let Some(p) = self.parser_for_name.get(name) {
            return p;
        }
        &self.parsers
    }

    /// Null literals for a column, same precedence as parsers.
    pub fn null_literals_for_column(&self, index: usize, name: &str) -> &[String] {
        if let Some(l) = self.null_literals_for_index.get(&index) {
            return l;
        }
        if let Some(l) = self.null_literals_for_name.get(name) {
            return l;
        }
        &self.null_value_literals
    }

    /// A fresh tokenizer carrying the configured leaf hooks.
    pub fn tokenizer(&self) -> Tokenizer {
        Tokenizer::new(
            Arc::clone(&self.custom_double_parser),
            self.custom_time_zone_parser.clone(),
        )
    }
}

pub struct CsvSpecsBuilder {
    specs: CsvSpecs,
}

impl Default for CsvSpecsBuilder {
    fn default() -> Self {
        Self {
            specs: CsvSpecs {
                delimiter: b',',
                quote: b'"',
                ignore_surrounding_spaces: true,
                trim: false,
                has_header_row: true,
                skip_header_rows: 0,
                skip_rows: 0,
                num_rows: u64::MAX,
                ignore_empty_lines: false,
                allow_missing_columns: false,
                ignore_excess_columns: false,
                headers: Vec::new(),
                header_for_index: HashMap::new(),
                parsers: Parser::default_ladder(),
                parser_for_name: HashMap::new(),
                parser_for_index: HashMap::new(),
                null_value_literals: vec![String::new()],
                null_literals_for_name: HashMap::new(),
                null_literals_for_index: HashMap::new(),
                null_parser: Some(Parser::String),
                custom_double_parser: Arc::new(StandardDoubleParser),
                custom_time_zone_parser: None,
                concurrent: true,
                fixed_width: false,
                fixed_column_widths: ColumnWidths::new(),
                use_utf32_counting_convention: false,
            },
        }
    }
}

impl CsvSpecsBuilder {
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.specs.delimiter = delimiter;
        self
    }

    pub fn quote(mut self, quote: u8) -> Self {
        self.specs.quote = quote;
        self
    }

    pub fn ignore_surrounding_spaces(mut self, yes: bool) -> Self {
        self.specs.ignore_surrounding_spaces = yes;
        self
    }

    pub fn trim(mut self, yes: bool) -> Self {
        self.specs.trim = yes;
        self
    }

    pub fn has_header_row(mut self, yes: bool) -> Self {
        self.specs.has_header_row = yes;
        self
    }

    pub fn skip_header_rows(mut self, rows: u64) -> Self {
        self.specs.skip_header_rows = rows;
        self
    }

    pub fn skip_rows(mut self, rows: u64) -> Self {
        self.specs.skip_rows = rows;
        self
    }

    pub fn num_rows(mut self, rows: u64) -> Self {
        self.specs.num_rows = rows;
        self
    }

    pub fn ignore_empty_lines(mut self, yes: bool) -> Self {
        self.specs.ignore_empty_lines = yes;
        self
    }

    pub fn allow_missing_columns(mut self, yes: bool) -> Self {
        self.specs.allow_missing_columns = yes;
        self
    }

    pub fn ignore_excess_columns(mut self, yes: bool) -> Self {
        self.specs.ignore_excess_columns = yes;
        self
    }

    pub fn headers(mut self, headers: Vec<String>) -> Self {
        self.specs.headers = headers;
        self
    }

    pub fn header_for_index(mut self, index: usize, name: impl Into<String>) -> Self {
        self.specs.header_for_index.insert(index, name.into());
        self
    }

    pub fn parsers(mut self, parsers: Vec<Parser>) -> Self {
        self.specs.parsers = parsers;
        self
    }

    pub fn parser_for_name(mut self, name: impl Into<String>, parsers: Vec<Parser>) -> Self {
        self.specs.parser_for_name.insert(name.into(), parsers);
        self
    }

    pub fn parser_for_index(mut self, index: usize, parsers: Vec<Parser>) -> Self {
        self.specs.parser_for_index.insert(index, parsers);
        self
    }

    pub fn null_value_literals(mut self, literals: Vec<String>) -> Self {
        self.specs.null_value_literals = literals;
        self
    }

    pub fn null_value_literals_for_name(
        mut self,
        name: impl Into<String>,
        literals: Vec<String>,
    ) -> Self {
        self.specs.null_literals_for_name.insert(name.into(), literals);
        self
    }

    pub fn null_value_literals_for_index(mut self, index: usize, literals: Vec<String>) -> Self {
        self.specs.null_literals_for_index.insert(index, literals);
        self
    }

    pub fn null_parser(mut self, parser: Parser) -> Self {
        self.specs.null_parser = Some(parser);
        self
    }

    /// Remove the null parser (the default is [`Parser::String`]), so
    /// all-null and empty columns become inference errors.
    pub fn clear_null_parser(mut self) -> Self {
        self.specs.null_parser = None;
        self
    }

    pub fn custom_double_parser(mut self, parser: Arc<dyn CustomDoubleParser>) -> Self {
        self.specs.custom_double_parser = parser;
        self
    }

    pub fn custom_time_zone_parser(mut self, parser: Arc<dyn CustomTimeZoneParser>) -> Self {
        self.specs.custom_time_zone_parser = Some(parser);
        self
    }

    pub fn concurrent(mut self, yes: bool) -> Self {
        self.specs.concurrent = yes;
        self
    }

    pub fn fixed_width(mut self, yes: bool) -> Self {
        self.specs.fixed_width = yes;
        self
    }

    pub fn fixed_column_widths(mut self, widths: Vec<usize>) -> Self {
        self.specs.fixed_column_widths = ColumnWidths::from_vec(widths);
        self.specs.fixed_width = true;
        self
    }

    pub fn use_utf32_counting_convention(mut self, yes: bool) -> Self {
        self.specs.use_utf32_counting_convention = yes;
        self
    }

    pub fn build(self) -> Result<CsvSpecs> {
        let specs = self.specs;
        ensure!(specs.delimiter.is_ascii(), "delimiter must be a 7-bit ASCII byte");
        ensure!(
            specs.delimiter != b'\n' && specs.delimiter != b'\r',
            "delimiter must not be a line terminator"
        );
        if !specs.fixed_width_mode() {
            ensure!(specs.quote.is_ascii(), "quote must be a 7-bit ASCII byte");
            ensure!(
                specs.quote != b'\n' && specs.quote != b'\r',
                "quote must not be a line terminator"
            );
            ensure!(
                specs.delimiter != specs.quote,
                "delimiter and quote must differ"
            );
        }
        ensure!(
            specs.skip_header_rows == 0 || specs.has_header_row,
            "skip_header_rows requires has_header_row"
        );
        ensure!(
            specs.fixed_column_widths.iter().all(|&w| w > 0),
            "fixed column widths must be positive"
        );
        Ok(specs)
    }
}
