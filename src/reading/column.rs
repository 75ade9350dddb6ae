//! # Per-Column Typing Engine
//!
//! Takes one column of cell text from dense storage, runs type inference
//! over the configured parser ladder, and produces a typed column through
//! the caller's sink factory.
//!
//! ## Two cursors
//!
//! Two [`IteratorHolder`]s start at the column's first cell. The primary
//! cursor advances through trial parses; the reserve cursor stays at the
//! beginning to permit a second pass. Because dense storage readers are
//! append-only cursors over a shared linked list, "rewinding" is simply
//! using the other cursor.
//!
//! ## Decision procedure
//!
//! 1. Empty column: run the null parser (error if none is configured).
//! 2. Single-parser ladder: one-phase parse, no inference.
//! 3. All-null column: one-phase parse with the null parser.
//! 4. Otherwise probe the first non-null cell: a numeric-looking cell
//!    enters the numeric fast path; else the first applicable of
//!    timestamp / boolean / date-time is promoted, followed by custom
//!    parsers and the char/string fallbacks.
//!
//! ## Numeric fast path
//!
//! Each numeric parser in widening precedence order parses forward until
//! it rejects a cell or the input is exhausted, recording the range it
//! consumed. If every intermediate sink is readable, the ranges are
//! unified into the widest sink by typed copy; otherwise the widest
//! parser takes a full second pass over the text.

use crate::densestorage::{DenseStorageReader, IteratorHolder};
use crate::parsers::{copy_numeric, fill_nulls, GlobalContext, Parser, ParserContext, CHUNK_SIZE};
use crate::sinks::{DataType, SinkFactory, TypedSink};
use crate::tokenization::Tokenizer;
use eyre::{bail, ensure, Result};

/// Infer and parse one column. `reader` is the column's dense storage;
/// the two-cursor structure is built from it and a clone.
pub(crate) fn parse_dense_storage_to_column(
    reader: DenseStorageReader,
    parsers: &[Parser],
    null_parser: Option<&Parser>,
    gctx: &GlobalContext,
) -> Result<(DataType, TypedSink)> {
    // Canonicalize: drop duplicates, preserve first-seen order.
    let mut parser_set: Vec<Parser> = Vec::new();
    for p in parsers {
        if !parser_set.contains(p) {
            parser_set.push(p.clone());
        }
    }

    let mut ih_alt = IteratorHolder::new(reader.clone());
    let mut ih = IteratorHolder::new(reader);

    let null_parser_to_use = if parser_set.len() == 1 {
        Some(parser_set[0].clone())
    } else {
        null_parser.cloned()
    };

    if !ih.try_move_next()? {
        // The column produced no cells at all.
        let Some(null_parser) = null_parser_to_use else {
            bail!("column is empty, so its type cannot be inferred, and no null parser is configured");
        };
        return empty_parse(&null_parser, gctx);
    }

    if parser_set.len() == 1 {
        return one_phase_parse(&parser_set[0], gctx, &mut ih_alt);
    }

    // Skip over the leading null run to find the probe cell.
    let mut column_is_all_nulls = true;
    loop {
        if !gctx.is_null_cell(&ih) {
            column_is_all_nulls = false;
            break;
        }
        if !ih.try_move_next()? {
            break;
        }
    }

    if column_is_all_nulls {
        let Some(null_parser) = null_parser_to_use else {
            bail!("column contains only null cells, so its type cannot be inferred, and no null parser is configured");
        };
        return one_phase_parse(&null_parser, gctx, &mut ih_alt);
    }

    let cats = CategorizedParsers::create(&parser_set)?;

    // Numerics get a fast path that widens through sinks and sources
    // instead of reparsing text.
    if !cats.numeric_parsers.is_empty()
        && gctx.tokenizer.try_parse_double(ih.current().as_bytes()).is_some()
    {
        return parse_numerics(&cats, gctx, ih, ih_alt);
    }

    let mut before_custom: Vec<Parser> = Vec::new();
    let probe = ih.current().as_bytes();
    if let Some(ts) = &cats.timestamp_parser {
        if gctx.tokenizer.try_parse_long(probe).is_some() {
            before_custom.push(ts.clone());
        }
    }
    if before_custom.is_empty() {
        if let Some(b) = &cats.boolean_parser {
            if gctx.tokenizer.try_parse_bool(probe).is_some() {
                before_custom.push(b.clone());
            }
        }
    }
    if before_custom.is_empty() {
        if let Some(dt) = &cats.datetime_parser {
            if gctx.tokenizer.try_parse_datetime(probe).is_some() {
                before_custom.push(dt.clone());
            }
        }
    }
    parse_from_curated_selections(
        before_custom,
        cats.custom_parsers.clone(),
        cats.char_and_string_parsers.clone(),
        gctx,
        ih,
        ih_alt,
    )
}

struct ParserResultWrapper {
    parser: Parser,
    pctx: ParserContext,
    begin: u64,
    end: u64,
}

fn parse_numerics(
    cats: &CategorizedParsers,
    gctx: &GlobalContext,
    mut ih: IteratorHolder,
    mut ih_alt: IteratorHolder,
) -> Result<(DataType, TypedSink)> {
    let mut wrappers: Vec<ParserResultWrapper> = Vec::new();
    for parser in &cats.numeric_parsers {
        wrappers.push(parse_numerics_helper(parser, gctx, &mut ih)?);
        if ih.is_exhausted() {
            break;
        }
    }

    if !ih.is_exhausted() {
        if cats.custom_parsers.is_empty() && cats.char_and_string_parsers.is_empty() {
            bail!(
                "consumed {} numeric items, then encountered a non-numeric item, but there are no custom or char/string parsers available",
                ih.num_consumed() - 1
            );
        }
        // The numeric ladder could not consume the input; fall back to the
        // custom and char/string groups.
        wrappers.clear();
        return parse_from_curated_selections(
            Vec::new(),
            cats.custom_parsers.clone(),
            cats.char_and_string_parsers.clone(),
            gctx,
            ih,
            ih_alt,
        );
    }
    drop(ih);

    if can_unify(&wrappers) {
        return unify_numeric_results(gctx, wrappers);
    }
    // Some intermediate sink is write-only: reparse with the widest parser.
    let Some(last) = wrappers.pop() else {
        bail!("logic error: no numeric parser results");
    };
    drop(wrappers);
    perform_second_parse_phase(gctx, last, &mut ih_alt)
}

fn parse_numerics_helper(
    parser: &Parser,
    gctx: &GlobalContext,
    ih: &mut IteratorHolder,
) -> Result<ParserResultWrapper> {
    let mut pctx = parser.make_context(gctx, CHUNK_SIZE)?;
    let begin = ih.num_consumed() - 1;
    let end = parser.try_parse(gctx, &mut pctx, ih, begin, u64::MAX, true)?;
    Ok(ParserResultWrapper {
        parser: parser.clone(),
        pctx,
        begin,
        end,
    })
}

/// All intermediate results must be readable for widening by copy; the
/// last (widest) sink never needs to be read back.
fn can_unify(wrappers: &[ParserResultWrapper]) -> bool {
    wrappers
        .iter()
        .take(wrappers.len().saturating_sub(1))
        .all(|w| w.pctx.has_source())
}

fn unify_numeric_results(
    gctx: &GlobalContext,
    mut wrappers: Vec<ParserResultWrapper>,
) -> Result<(DataType, TypedSink)> {
    let Some(mut dest) = wrappers.pop() else {
        bail!("logic error: no parser results to unify");
    };
    // When only one numeric parser ran, it is its own destination and the
    // only work left is backfilling the leading null run.
    let first_begin = wrappers.first().map_or(dest.begin, |w| w.begin);
    fill_nulls(gctx, &mut dest.pctx, 0, first_begin)?;

    let mut dest_begin = first_begin;
    for wrapper in &wrappers {
        copy_numeric(&wrapper.pctx, &mut dest.pctx, wrapper.begin, wrapper.end, dest_begin)?;
        dest_begin += wrapper.end - wrapper.begin;
    }
    Ok(dest.pctx.into_result())
}

fn parse_from_curated_selections(
    before_custom: Vec<Parser>,
    custom: Vec<Parser>,
    after_custom: Vec<Parser>,
    gctx: &GlobalContext,
    mut ih: IteratorHolder,
    mut ih_alt: IteratorHolder,
) -> Result<(DataType, TypedSink)> {
    let mut parsers = before_custom;
    let custom_begin = parsers.len();
    parsers.extend(custom);
    let custom_end = parsers.len();
    parsers.extend(after_custom);

    ensure!(!parsers.is_empty(), "no available parsers");

    for i in 0..parsers.len() - 1 {
        let result = if i >= custom_begin && i < custom_end {
            // Custom parsers may accept null cells in their own way, so
            // their first phase covers the full range on a fresh cursor.
            let mut full = IteratorHolder::new(ih_alt.reader().clone());
            full.try_move_next()?; // input is known non-empty
            try_two_phase_parse(&parsers[i], gctx, &mut full, &mut ih_alt)?
        } else {
            try_two_phase_parse(&parsers[i], gctx, &mut ih, &mut ih_alt)?
        };
        if let Some(done) = result {
            return Ok(done);
        }
    }

    // The final parser gets the more efficient single pass; there is
    // nothing left to fall back to.
    drop(ih);
    one_phase_parse(&parsers[parsers.len() - 1], gctx, &mut ih_alt)
}

/// First phase from the cursor's position; `None` means the parser
/// rejected a cell and the next candidate should run. On success with a
/// non-zero start, the second phase backfills `[0, begin)` from the
/// reserve cursor.
fn try_two_phase_parse(
    parser: &Parser,
    gctx: &GlobalContext,
    ih: &mut IteratorHolder,
    ih_alt: &mut IteratorHolder,
) -> Result<Option<(DataType, TypedSink)>> {
    let phase_one_start = ih.num_consumed() - 1;
    let mut pctx = parser.make_context(gctx, CHUNK_SIZE)?;
    let end = parser.try_parse(gctx, &mut pctx, ih, phase_one_start, u64::MAX, true)?;
    if !ih.is_exhausted() {
        // `ih` now rests on the failing cell; the reserve cursor is
        // untouched for the next candidate.
        return Ok(None);
    }
    if phase_one_start == 0 {
        return Ok(Some(pctx.into_result()));
    }
    let wrapper = ParserResultWrapper {
        parser: parser.clone(),
        pctx,
        begin: phase_one_start,
        end,
    };
    perform_second_parse_phase(gctx, wrapper, ih_alt).map(Some)
}

/// Phase two: the parser that succeeded on `[begin, EOF)` must also accept
/// the leading cells `[0, begin)`. A parser that cannot is misbehaving
/// (it skipped cells in phase one that it now rejects), which is an
/// internal contract violation, not an input error.
fn perform_second_parse_phase(
    gctx: &GlobalContext,
    mut wrapper: ParserResultWrapper,
    ih_alt: &mut IteratorHolder,
) -> Result<(DataType, TypedSink)> {
    ih_alt.try_move_next()?; // input is known non-empty
    let end = wrapper
        .parser
        .try_parse(gctx, &mut wrapper.pctx, ih_alt, 0, wrapper.begin, false)?;
    ensure!(
        end == wrapper.begin,
        "logic error: second parse phase failed on input; parser was {}",
        wrapper.parser
    );
    Ok(wrapper.pctx.into_result())
}

/// Parse the whole column with one parser; failure is fatal.
fn one_phase_parse(
    parser: &Parser,
    gctx: &GlobalContext,
    ih_alt: &mut IteratorHolder,
) -> Result<(DataType, TypedSink)> {
    let mut pctx = parser.make_context(gctx, CHUNK_SIZE)?;
    ih_alt.try_move_next()?;
    parser.try_parse(gctx, &mut pctx, ih_alt, 0, u64::MAX, true)?;
    if ih_alt.is_exhausted() {
        return Ok(pctx.into_result());
    }
    bail!(
        "parsing failed with nothing left to fall back to; parser {} successfully parsed {} items before failure",
        parser,
        ih_alt.num_consumed() - 1
    )
}

/// The column is empty; the parser only creates its sink.
fn empty_parse(parser: &Parser, gctx: &GlobalContext) -> Result<(DataType, TypedSink)> {
    let pctx = parser.make_context(gctx, CHUNK_SIZE)?;
    Ok(pctx.into_result())
}

/// The parser set split by group, with configuration conflicts rejected.
struct CategorizedParsers {
    boolean_parser: Option<Parser>,
    /// Precedence-ordered: Byte, Short, Int, Long, float, Double.
    numeric_parsers: Vec<Parser>,
    datetime_parser: Option<Parser>,
    /// Precedence-ordered: Char then String.
    char_and_string_parsers: Vec<Parser>,
    timestamp_parser: Option<Parser>,
    /// Configured order preserved.
    custom_parsers: Vec<Parser>,
}

impl CategorizedParsers {
    fn create(parser_set: &[Parser]) -> Result<Self> {
        let mut boolean_parser = None;
        let mut datetime_parser = None;
        let mut specified_numeric: Vec<Parser> = Vec::new();
        let mut specified_floating: Vec<Parser> = Vec::new();
        let mut specified_char_string: Vec<Parser> = Vec::new();
        let mut specified_timestamps: Vec<Parser> = Vec::new();
        let mut custom_parsers: Vec<Parser> = Vec::new();

        for p in parser_set {
            match p {
                Parser::Byte | Parser::Short | Parser::Int | Parser::Long => {
                    specified_numeric.push(p.clone());
                }
                Parser::FloatFast | Parser::FloatStrict | Parser::Double => {
                    specified_numeric.push(p.clone());
                    specified_floating.push(p.clone());
                }
                Parser::TimestampSeconds
                | Parser::TimestampMillis
                | Parser::TimestampMicros
                | Parser::TimestampNanos => specified_timestamps.push(p.clone()),
                Parser::Char | Parser::String => specified_char_string.push(p.clone()),
                Parser::Bool => boolean_parser = Some(p.clone()),
                Parser::DateTime => datetime_parser = Some(p.clone()),
                Parser::Custom(_) => custom_parsers.push(p.clone()),
            }
        }

        ensure!(
            specified_floating.len() <= 1,
            "there is more than one floating-point parser in the parser set"
        );
        ensure!(
            specified_timestamps.len() <= 1,
            "there is more than one timestamp parser in the parser set"
        );
        ensure!(
            specified_numeric.is_empty() || specified_timestamps.is_empty(),
            "the parser set must not contain both numeric and timestamp parsers"
        );

        let numeric_precedence = [
            Parser::Byte,
            Parser::Short,
            Parser::Int,
            Parser::Long,
            Parser::FloatFast,
            Parser::FloatStrict,
            Parser::Double,
        ];
        let char_string_precedence = [Parser::Char, Parser::String];

        let numeric_parsers = limit_to_specified(&numeric_precedence, &specified_numeric);
        let char_and_string_parsers =
            limit_to_specified(&char_string_precedence, &specified_char_string);
        let timestamp_parser = specified_timestamps.into_iter().next();

        Ok(Self {
            boolean_parser,
            numeric_parsers,
            datetime_parser,
            char_and_string_parsers,
            timestamp_parser,
            custom_parsers,
        })
    }
}

fn limit_to_specified(ordered: &[Parser], specified: &[Parser]) -> Vec<Parser> {
    ordered
        .iter()
        .filter(|p| specified.contains(p))
        .cloned()
        .collect()
}

/// Build the per-column global context and run the engine. The small
/// wrapper keeps thread spawning in the coordinator tidy.
pub(crate) fn run_column(
    col_index: usize,
    reader: DenseStorageReader,
    parsers: &[Parser],
    null_parser: Option<&Parser>,
    null_literals: &[String],
    tokenizer: Tokenizer,
    sink_factory: &dyn SinkFactory,
) -> Result<(DataType, TypedSink)> {
    let gctx = GlobalContext::new(col_index, tokenizer, sink_factory, null_literals);
    parse_dense_storage_to_column(reader, parsers, null_parser, &gctx)
}
