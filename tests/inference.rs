//! # Type Inference Test Suite
//!
//! Exercises the per-column typing engine: parser-ladder precedence, the
//! numeric fast path (unification vs second-pass reparse), null handling,
//! probe-driven parser promotion, custom parsers, and configuration
//! conflicts.
//!
//! ## Test Categories
//!
//! 1. **Numeric ladder**: narrowest accepting parser wins; widening
//! 2. **Null handling**: leading runs, all-null columns, custom literals
//! 3. **Unify vs reparse**: both paths produce identical columns
//! 4. **Probes**: timestamp/boolean/date-time promotion, char/string
//! 5. **Custom parsers**: ordering, fallback
//! 6. **Configuration conflicts**: rejected parser sets

use std::any::Any;
use std::sync::{Arc, Mutex};
use turcsv::parsers::{CustomParser, CustomParserContext, GlobalContext};
use turcsv::densestorage::IteratorHolder;
use turcsv::{read, CsvSpecs, DataType, Parser, TypedSink, VecSinkFactory};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn numeric_ladder() -> Vec<Parser> {
    vec![
        Parser::Byte,
        Parser::Short,
        Parser::Int,
        Parser::Long,
        Parser::Double,
    ]
}

fn read_with(input: &str, parsers: Vec<Parser>) -> (turcsv::CsvReadResult, VecSinkFactory) {
    let specs = CsvSpecs::builder().parsers(parsers).build().unwrap();
    let factory = VecSinkFactory::readable();
    let result = read(&specs, input.as_bytes(), &factory).expect("read should succeed");
    (result, factory)
}

// ============================================================================
// NUMERIC LADDER
// ============================================================================

#[test]
fn narrowest_parser_wins_byte() {
    let (result, factory) = read_with("N\n1\n2\n3\n", numeric_ladder());
    assert_eq!(result.columns()[0].data_type(), DataType::Byte);
    assert_eq!(
        factory.byte_column(0).unwrap(),
        vec![Some(1), Some(2), Some(3)]
    );
}

#[test]
fn widening_to_short() {
    let (result, factory) = read_with("N\n1\n2\n300\n", numeric_ladder());
    assert_eq!(result.columns()[0].data_type(), DataType::Short);
    assert_eq!(
        factory.short_column(0).unwrap(),
        vec![Some(1), Some(2), Some(300)]
    );
}

#[test]
fn widening_to_int_long_double() {
    let (result, _) = read_with("N\n1\n70000\n", numeric_ladder());
    assert_eq!(result.columns()[0].data_type(), DataType::Int);

    let (result, _) = read_with("N\n1\n5000000000\n", numeric_ladder());
    assert_eq!(result.columns()[0].data_type(), DataType::Long);

    let (result, factory) = read_with("N\n1\n2.5\n", numeric_ladder());
    assert_eq!(result.columns()[0].data_type(), DataType::Double);
    assert_eq!(
        factory.double_column(0).unwrap(),
        vec![Some(1.0), Some(2.5)]
    );
}

#[test]
fn widening_preserves_earlier_values() {
    // The byte run [1, 2] is copied through the type converter into the
    // wider sink after the short parser finishes the tail.
    let (result, factory) = read_with("N\n1\n2\n300\n-300\n7\n", numeric_ladder());
    assert_eq!(result.columns()[0].data_type(), DataType::Short);
    assert_eq!(
        factory.short_column(0).unwrap(),
        vec![Some(1), Some(2), Some(300), Some(-300), Some(7)]
    );
}

#[test]
fn numeric_fallback_to_string() {
    let mut ladder = numeric_ladder();
    ladder.push(Parser::String);
    let (result, factory) = read_with("N\nhello\n", ladder.clone());
    assert_eq!(result.columns()[0].data_type(), DataType::String);
    assert_eq!(
        factory.string_column(0).unwrap(),
        vec![Some("hello".to_string())]
    );

    // Numeric prefix consumed before the non-numeric cell appears.
    let (result, factory) = read_with("N\n1\n2\nhello\n", ladder);
    assert_eq!(result.columns()[0].data_type(), DataType::String);
    assert_eq!(
        factory.string_column(0).unwrap(),
        vec![
            Some("1".to_string()),
            Some("2".to_string()),
            Some("hello".to_string())
        ]
    );
}

#[test]
fn numeric_dead_end_is_an_error() {
    let specs = CsvSpecs::builder().parsers(numeric_ladder()).build().unwrap();
    let err = read(&specs, &b"N\n1\nhello\n"[..], &VecSinkFactory::readable()).unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("non-numeric"), "got: {chain}");
}

#[test]
fn float_ladder_unifies_through_byte() {
    let (result, factory) = read_with("N\n1\n1.5\n", vec![Parser::Byte, Parser::FloatFast]);
    assert_eq!(result.columns()[0].data_type(), DataType::Float);
    assert_eq!(
        factory.float_column(0).unwrap(),
        vec![Some(1.0), Some(1.5)]
    );
}

// ============================================================================
// NULL HANDLING
// ============================================================================

#[test]
fn null_cells_inside_numeric_run() {
    let (result, factory) = read_with("N\n1\n\n2\n", numeric_ladder());
    assert_eq!(result.columns()[0].data_type(), DataType::Byte);
    assert_eq!(
        factory.byte_column(0).unwrap(),
        vec![Some(1), None, Some(2)]
    );
}

#[test]
fn leading_null_run_backfilled_by_unify() {
    let (result, factory) = read_with("N\n\n\n5\n300\n", numeric_ladder());
    assert_eq!(result.columns()[0].data_type(), DataType::Short);
    assert_eq!(
        factory.short_column(0).unwrap(),
        vec![None, None, Some(5), Some(300)]
    );
}

#[test]
fn leading_null_run_backfilled_by_second_phase() {
    // Boolean goes through the two-phase path: phase one parses from the
    // first non-null cell, phase two backfills the null prefix.
    let (result, factory) = read_with(
        "N\n\n\ntrue\nfalse\n",
        vec![Parser::Bool, Parser::String],
    );
    assert_eq!(result.columns()[0].data_type(), DataType::Bool);
    assert_eq!(
        factory.bool_column(0).unwrap(),
        vec![None, None, Some(true), Some(false)]
    );
}

#[test]
fn all_null_column_uses_null_parser() {
    let specs = CsvSpecs::builder()
        .parsers(numeric_ladder())
        .null_parser(Parser::Long)
        .build()
        .unwrap();
    let factory = VecSinkFactory::readable();
    let result = read(&specs, &b"N\n\n\n\n"[..], &factory).unwrap();
    assert_eq!(result.columns()[0].data_type(), DataType::Long);
    assert_eq!(factory.long_column(0).unwrap(), vec![None, None, None]);
}

#[test]
fn all_null_column_without_null_parser_fails() {
    let specs = CsvSpecs::builder()
        .parsers(numeric_ladder())
        .clear_null_parser()
        .build()
        .unwrap();
    let err = read(&specs, &b"N\n\n\n"[..], &VecSinkFactory::readable()).unwrap_err();
    assert!(
        format!("{err:#}").contains("only null cells"),
        "got: {err:#}"
    );
}

#[test]
fn empty_column_without_null_parser_fails() {
    let specs = CsvSpecs::builder()
        .has_header_row(false)
        .headers(vec!["a".into()])
        .clear_null_parser()
        .build()
        .unwrap();
    let err = read(&specs, &b""[..], &VecSinkFactory::readable()).unwrap_err();
    assert!(format!("{err:#}").contains("empty"), "got: {err:#}");
}

#[test]
fn custom_null_literals() {
    let specs = CsvSpecs::builder()
        .parsers(numeric_ladder())
        .null_value_literals(vec!["NA".into(), "".into()])
        .build()
        .unwrap();
    let factory = VecSinkFactory::readable();
    let result = read(&specs, &b"N\n1\nNA\n2\n"[..], &factory).unwrap();
    assert_eq!(result.columns()[0].data_type(), DataType::Byte);
    assert_eq!(
        factory.byte_column(0).unwrap(),
        vec![Some(1), None, Some(2)]
    );
}

#[test]
fn per_column_null_literals() {
    let specs = CsvSpecs::builder()
        .parsers(numeric_ladder())
        .null_value_literals_for_name("b", vec!["-".into()])
        .build()
        .unwrap();
    let factory = VecSinkFactory::readable();
    let result = read(&specs, &b"a,b\n1,2\n,-\n"[..], &factory).unwrap();
    assert_eq!(result.num_rows(), 2);
    assert_eq!(factory.byte_column(0).unwrap(), vec![Some(1), None]);
    assert_eq!(factory.byte_column(1).unwrap(), vec![Some(2), None]);
}

#[test]
fn single_parser_ladder_handles_all_nulls_itself() {
    let specs = CsvSpecs::builder()
        .parsers(vec![Parser::Long])
        .clear_null_parser()
        .build()
        .unwrap();
    let factory = VecSinkFactory::readable();
    let result = read(&specs, &b"N\n\n\n"[..], &factory).unwrap();
    assert_eq!(result.columns()[0].data_type(), DataType::Long);
    assert_eq!(factory.long_column(0).unwrap(), vec![None, None]);
}

// ============================================================================
// UNIFY VS REPARSE
// ============================================================================

#[test]
fn unify_and_reparse_produce_identical_columns() {
    let input = "N\n\n1\n2\n300\n\n70000\n";
    let specs = CsvSpecs::builder().parsers(numeric_ladder()).build().unwrap();

    // Readable sinks: the engine unifies by typed copy.
    let readable = VecSinkFactory::readable();
    let r1 = read(&specs, input.as_bytes(), &readable).unwrap();

    // Write-only sinks: the engine reparses with the widest parser.
    let write_only = VecSinkFactory::write_only();
    let r2 = read(&specs, input.as_bytes(), &write_only).unwrap();

    assert_eq!(r1.columns()[0].data_type(), DataType::Int);
    assert_eq!(r2.columns()[0].data_type(), DataType::Int);
    assert_eq!(
        readable.int_column(0).unwrap(),
        write_only.int_column(0).unwrap()
    );
    assert_eq!(
        readable.int_column(0).unwrap(),
        vec![None, Some(1), Some(2), Some(300), None, Some(70000)]
    );
}

// ============================================================================
// PROBES AND PROMOTION
// ============================================================================

#[test]
fn timestamp_promoted_when_cell_is_integral() {
    let (result, factory) = read_with(
        "T\n1609459200\n1609459201\n",
        vec![Parser::TimestampSeconds, Parser::String],
    );
    assert_eq!(result.columns()[0].data_type(), DataType::TimestampNanos);
    assert_eq!(
        factory.timestamp_column(0).unwrap(),
        vec![
            Some(1_609_459_200_000_000_000),
            Some(1_609_459_201_000_000_000)
        ]
    );
}

#[test]
fn timestamp_falls_back_when_tail_is_not_integral() {
    let (result, factory) = read_with(
        "T\n1609459200\nnot-a-number\n",
        vec![Parser::TimestampSeconds, Parser::String],
    );
    assert_eq!(result.columns()[0].data_type(), DataType::String);
    assert_eq!(
        factory.string_column(0).unwrap(),
        vec![
            Some("1609459200".to_string()),
            Some("not-a-number".to_string())
        ]
    );
}

#[test]
fn datetime_inference() {
    let (result, factory) = read_with(
        "D\n2021-01-02T03:04:05Z\n2021-01-02T03:04:06.5Z\n",
        vec![Parser::DateTime, Parser::String],
    );
    assert_eq!(result.columns()[0].data_type(), DataType::DateTimeNanos);
    let column = factory.datetime_column(0).unwrap();
    assert_eq!(column[1].unwrap() - column[0].unwrap(), 1_500_000_000);
}

#[test]
fn char_parser_when_opted_in() {
    let (result, factory) = read_with("C\na\nb\n", vec![Parser::Char, Parser::String]);
    assert_eq!(result.columns()[0].data_type(), DataType::Char);
    assert_eq!(
        factory.char_column(0).unwrap(),
        vec![Some('a'), Some('b')]
    );

    // A multi-character cell pushes the column to String.
    let (result, factory) = read_with("C\na\nbc\n", vec![Parser::Char, Parser::String]);
    assert_eq!(result.columns()[0].data_type(), DataType::String);
    assert_eq!(
        factory.string_column(0).unwrap(),
        vec![Some("a".to_string()), Some("bc".to_string())]
    );
}

#[test]
fn boolean_beats_string_on_boolean_cells() {
    let (result, _) = read_with("B\nTRUE\nfalse\nTrue\n", vec![Parser::Bool, Parser::String]);
    assert_eq!(result.columns()[0].data_type(), DataType::Bool);
}

// ============================================================================
// CUSTOM PARSERS
// ============================================================================

/// Accepts cells with a given prefix, stripping it; stores strings.
struct PrefixParser {
    name: &'static str,
    prefix: &'static str,
    seen: Arc<Mutex<Vec<Option<String>>>>,
}

struct PrefixContext {
    values: Vec<Option<String>>,
    shared: Arc<Mutex<Vec<Option<String>>>>,
}

impl CustomParserContext for PrefixContext {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_sink(self: Box<Self>) -> TypedSink {
        *self.shared.lock().unwrap() = self.values.clone();
        TypedSink::Custom(Box::new(self.values))
    }
}

impl CustomParser for PrefixParser {
    fn name(&self) -> &str {
        self.name
    }

    fn make_context(
        &self,
        _gctx: &GlobalContext,
        _chunk_size: usize,
    ) -> eyre::Result<Box<dyn CustomParserContext>> {
        Ok(Box::new(PrefixContext {
            values: Vec::new(),
            shared: Arc::clone(&self.seen),
        }))
    }

    fn try_parse(
        &self,
        gctx: &GlobalContext,
        ctx: &mut dyn CustomParserContext,
        iter: &mut IteratorHolder,
        begin: u64,
        end: u64,
        _appending: bool,
    ) -> eyre::Result<u64> {
        let ctx = ctx
            .as_any_mut()
            .downcast_mut::<PrefixContext>()
            .expect("context type");
        let mut current = begin;
        while current < end && !iter.is_exhausted() {
            let bytes = iter.current().as_bytes().to_vec();
            if gctx.is_null_text(&bytes) {
                ctx.values.push(None);
            } else {
                let text = String::from_utf8(bytes)?;
                let Some(stripped) = text.strip_prefix(self.prefix) else {
                    break;
                };
                ctx.values.push(Some(stripped.to_string()));
            }
            current += 1;
            iter.try_move_next()?;
        }
        Ok(current)
    }
}

#[test]
fn custom_parser_participates_in_inference() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let custom = Parser::Custom(Arc::new(PrefixParser {
        name: "prefix#",
        prefix: "#",
        seen: Arc::clone(&seen),
    }));
    let (result, _) = read_with("ids\n#a\n\n#b\n", vec![custom, Parser::String]);
    assert_eq!(result.columns()[0].data_type(), DataType::Custom);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some("a".to_string()), None, Some("b".to_string())]
    );
}

#[test]
fn custom_parsers_try_in_configured_order() {
    let first_seen = Arc::new(Mutex::new(Vec::new()));
    let second_seen = Arc::new(Mutex::new(Vec::new()));
    let first = Parser::Custom(Arc::new(PrefixParser {
        name: "prefix#",
        prefix: "#",
        seen: Arc::clone(&first_seen),
    }));
    let second = Parser::Custom(Arc::new(PrefixParser {
        name: "prefix@",
        prefix: "@",
        seen: Arc::clone(&second_seen),
    }));
    // The '#' parser rejects '@x', so the '@' parser wins.
    let (result, _) = read_with("ids\n@x\n@y\n", vec![first, second, Parser::String]);
    assert_eq!(result.columns()[0].data_type(), DataType::Custom);
    assert!(first_seen.lock().unwrap().is_empty());
    assert_eq!(
        *second_seen.lock().unwrap(),
        vec![Some("x".to_string()), Some("y".to_string())]
    );
}

#[test]
fn custom_parser_falls_back_to_string() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let custom = Parser::Custom(Arc::new(PrefixParser {
        name: "prefix#",
        prefix: "#",
        seen,
    }));
    let (result, factory) = read_with("ids\n#a\nplain\n", vec![custom, Parser::String]);
    assert_eq!(result.columns()[0].data_type(), DataType::String);
    assert_eq!(
        factory.string_column(0).unwrap(),
        vec![Some("#a".to_string()), Some("plain".to_string())]
    );
}

// ============================================================================
// CONFIGURATION CONFLICTS
// ============================================================================

#[test]
fn two_floating_parsers_rejected() {
    let specs = CsvSpecs::builder()
        .parsers(vec![Parser::FloatFast, Parser::Double, Parser::String])
        .build()
        .unwrap();
    let err = read(&specs, &b"N\n1.5\n"[..], &VecSinkFactory::readable()).unwrap_err();
    assert!(
        format!("{err:#}").contains("floating-point"),
        "got: {err:#}"
    );
}

#[test]
fn numeric_and_timestamp_parsers_rejected() {
    let specs = CsvSpecs::builder()
        .parsers(vec![Parser::Long, Parser::TimestampSeconds, Parser::String])
        .build()
        .unwrap();
    let err = read(&specs, &b"N\n1\n"[..], &VecSinkFactory::readable()).unwrap_err();
    assert!(
        format!("{err:#}").contains("numeric and timestamp"),
        "got: {err:#}"
    );
}

#[test]
fn two_timestamp_parsers_rejected() {
    let specs = CsvSpecs::builder()
        .parsers(vec![
            Parser::TimestampSeconds,
            Parser::TimestampMillis,
            Parser::String,
        ])
        .build()
        .unwrap();
    let err = read(&specs, &b"N\n1\n"[..], &VecSinkFactory::readable()).unwrap_err();
    assert!(
        format!("{err:#}").contains("timestamp parser"),
        "got: {err:#}"
    );
}

#[test]
fn duplicate_parsers_deduplicate() {
    let (result, _) = read_with(
        "N\n1\n",
        vec![Parser::Long, Parser::Long, Parser::String, Parser::Long],
    );
    assert_eq!(result.columns()[0].data_type(), DataType::Long);
}
