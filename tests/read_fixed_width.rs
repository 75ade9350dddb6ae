//! # Fixed-Width Reading Test Suite
//!
//! End-to-end tests of `read()` in fixed-width mode: width inference from
//! the header row, explicit widths, character-counting conventions, and
//! the final column's trailing-content absorption.
//!
//! In fixed-width mode the configured delimiter is the padding byte; these
//! suites use space padding throughout.

use turcsv::{read, CsvSpecs, DataType, Parser, VecSinkFactory};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn fixed_builder() -> turcsv::specs::CsvSpecsBuilder {
    CsvSpecs::builder().delimiter(b' ').fixed_width(true)
}

fn read_ok(input: &str, specs: &CsvSpecs) -> (turcsv::CsvReadResult, VecSinkFactory) {
    let factory = VecSinkFactory::readable();
    let result = read(specs, input.as_bytes(), &factory).expect("read should succeed");
    (result, factory)
}

fn strings(values: &[&str]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

// ============================================================================
// WIDTH INFERENCE
// ============================================================================

#[test]
fn widths_inferred_from_header_row() {
    let specs = fixed_builder()
        .parsers(vec![Parser::String])
        .build()
        .unwrap();
    let (result, factory) = read_ok("AAA BBB\n111 222\n", &specs);
    assert_eq!(result.headers(), vec!["AAA", "BBB"]);
    assert_eq!(result.num_rows(), 1);
    // Inferred widths are [4, 3]: padding belongs to the preceding column
    // and the final column absorbs the rest.
    assert_eq!(factory.string_column(0).unwrap(), strings(&["111 "]));
    assert_eq!(factory.string_column(1).unwrap(), strings(&["222"]));
}

#[test]
fn inferred_columns_type_independently() {
    let specs = fixed_builder().build().unwrap();
    let (result, factory) = read_ok("num txt\n111 abc\n222 def\n", &specs);
    assert_eq!(result.columns()[0].data_type(), DataType::Long);
    assert_eq!(result.columns()[1].data_type(), DataType::String);
    assert_eq!(factory.long_column(0).unwrap(), vec![Some(111), Some(222)]);
    assert_eq!(factory.string_column(1).unwrap(), strings(&["abc", "def"]));
}

#[test]
fn final_column_absorbs_trailing_content() {
    let specs = fixed_builder()
        .parsers(vec![Parser::String])
        .build()
        .unwrap();
    let (_, factory) = read_ok("AA BB\n11 22-and-the-rest\n", &specs);
    assert_eq!(
        factory.string_column(1).unwrap(),
        strings(&["22-and-the-rest"])
    );
}

// ============================================================================
// EXPLICIT WIDTHS
// ============================================================================

#[test]
fn explicit_widths_with_header_row() {
    let specs = fixed_builder()
        .fixed_column_widths(vec![4, 3])
        .parsers(vec![Parser::String])
        .build()
        .unwrap();
    let (result, factory) = read_ok("abc def\n123 456\n", &specs);
    assert_eq!(result.headers(), vec!["abc", "def"]);
    assert_eq!(factory.string_column(0).unwrap(), strings(&["123 "]));
    assert_eq!(factory.string_column(1).unwrap(), strings(&["456"]));
}

#[test]
fn explicit_widths_without_header_row() {
    let specs = fixed_builder()
        .has_header_row(false)
        .fixed_column_widths(vec![3, 3])
        .build()
        .unwrap();
    let (result, factory) = read_ok("12 34 \n56 78 \n", &specs);
    assert_eq!(result.headers(), vec!["Column1", "Column2"]);
    // Cells keep their padding as text, but the numeric tokenizer tolerates
    // surrounding padding, so the columns still infer as integers.
    assert_eq!(result.columns()[0].data_type(), DataType::Long);
    assert_eq!(factory.long_column(0).unwrap(), vec![Some(12), Some(56)]);
    assert_eq!(factory.long_column(1).unwrap(), vec![Some(34), Some(78)]);
    assert_eq!(result.num_rows(), 2);
}

#[test]
fn short_rows_pad_with_empty_cells() {
    let specs = fixed_builder()
        .fixed_column_widths(vec![3, 3, 3])
        .parsers(vec![Parser::String])
        .build()
        .unwrap();
    let (result, factory) = read_ok("aa bb cc\n11\n", &specs);
    assert_eq!(result.num_rows(), 1);
    assert_eq!(factory.string_column(0).unwrap(), strings(&["11"]));
    assert_eq!(factory.string_column(1).unwrap(), vec![None]);
    assert_eq!(factory.string_column(2).unwrap(), vec![None]);
}

// ============================================================================
// CHARACTER COUNTING
// ============================================================================

#[test]
fn multibyte_characters_count_per_code_point() {
    let specs = fixed_builder()
        .use_utf32_counting_convention(true)
        .parsers(vec![Parser::String])
        .build()
        .unwrap();
    // Header "né ag" infers widths [3, 2]; the data row's accented
    // characters occupy more bytes than characters.
    let (result, factory) = read_ok("né ag\nçà 42\n", &specs);
    assert_eq!(result.headers(), vec!["né", "ag"]);
    assert_eq!(factory.string_column(0).unwrap(), strings(&["çà "]));
    assert_eq!(factory.string_column(1).unwrap(), strings(&["42"]));
}

#[test]
fn utf16_counting_rejects_split_surrogates() {
    let specs = fixed_builder()
        .has_header_row(false)
        .fixed_column_widths(vec![1, 2])
        .parsers(vec![Parser::String])
        .build()
        .unwrap();
    // '😀' counts as two UTF-16 units and cannot fit a width-1 column.
    let err = read(&specs, "😀ab\n".as_bytes(), &VecSinkFactory::readable()).unwrap_err();
    assert!(format!("{err:#}").contains("surrogate"), "got: {err:#}");
}

#[test]
fn utf16_counting_accepts_aligned_non_bmp() {
    let specs = fixed_builder()
        .has_header_row(false)
        .fixed_column_widths(vec![2, 2])
        .parsers(vec![Parser::String])
        .build()
        .unwrap();
    let (_, factory) = read_ok("😀ab\n", &specs);
    assert_eq!(factory.string_column(0).unwrap(), strings(&["😀"]));
    assert_eq!(factory.string_column(1).unwrap(), strings(&["ab"]));
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn padding_at_header_start_fails() {
    let specs = fixed_builder().build().unwrap();
    let err = read(&specs, &b" AAA BBB\n1 2\n"[..], &VecSinkFactory::readable()).unwrap_err();
    assert!(
        format!("{err:#}").contains("padding character"),
        "got: {err:#}"
    );
}

#[test]
fn no_header_and_no_widths_fails() {
    let specs = fixed_builder().has_header_row(false).build().unwrap();
    let err = read(&specs, &b"11 22\n"[..], &VecSinkFactory::readable()).unwrap_err();
    assert!(
        format!("{err:#}").contains("fixed_column_widths"),
        "got: {err:#}"
    );
}
