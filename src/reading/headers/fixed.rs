//! # Fixed-Width Header Resolution
//!
//! Determines column names and widths for fixed-width input. Widths come
//! from the configuration or are inferred from the header row: a column
//! starts at a non-padding character preceded by a padding character (or
//! start of row), and its width is the character distance to the next
//! start. The padding byte is the configured delimiter, and it is trimmed
//! from both ends of each header name. The final column owns any excess
//! characters of the row.

use super::{apply_overrides, synthetic_headers};
use crate::reading::cells::{utf8_lengths, CellGrabber, GrabResult};
use crate::specs::CsvSpecs;
use eyre::{bail, ensure, Result};

pub(crate) fn determine_headers(
    specs: &CsvSpecs,
    line_grabber: &mut dyn CellGrabber,
) -> Result<(Vec<String>, Vec<usize>)> {
    let mut widths = specs.fixed_column_widths().to_vec();
    let padding = specs.delimiter();
    let utf32_mode = specs.use_utf32_counting_convention();

    let mut headers;
    if specs.has_header_row() {
        let mut skip = specs.skip_header_rows();
        let header_row: Vec<u8> = loop {
            match line_grabber.grab_next()? {
                GrabResult::EndOfInput => bail!(
                    "has_header_row is set but the input is empty or shorter than skip_header_rows"
                ),
                GrabResult::Cell { text, .. } => {
                    if skip == 0 {
                        break text.to_vec();
                    }
                    skip -= 1;
                }
            }
        };
        if widths.is_empty() {
            widths = infer_column_widths(&header_row, padding, utf32_mode)?;
        }
        headers = extract_headers(&header_row, &widths, padding, utf32_mode)?;
    } else {
        ensure!(
            !widths.is_empty(),
            "has_header_row is false but fixed_column_widths is unspecified"
        );
        headers = synthetic_headers(widths.len());
    }

    apply_overrides(specs, &mut headers)?;
    Ok((headers, widths))
}

/// Infer widths (in character units) from the header row.
fn infer_column_widths(row: &[u8], padding: u8, utf32_mode: bool) -> Result<Vec<usize>> {
    let mut widths = Vec::new();
    let mut prev_is_padding = false;
    let mut num_chars = 0usize;
    let mut pos = 0usize;
    while pos < row.len() {
        let b = row[pos];
        let this_is_padding = b == padding;
        if pos == 0 && this_is_padding {
            bail!(
                "header row cannot start with the padding character {:?}",
                padding as char
            );
        }
        if !this_is_padding && prev_is_padding {
            widths.push(num_chars);
            num_chars = 0;
        }
        prev_is_padding = this_is_padding;
        let (byte_len, char_len) = utf8_lengths(b, utf32_mode)?;
        pos += byte_len;
        num_chars += char_len;
    }
    widths.push(num_chars);
    Ok(widths)
}

/// Slice the header row by widths, absorb excess bytes into the final
/// column, and trim the padding byte from each name.
fn extract_headers(
    row: &[u8],
    widths: &[usize],
    padding: u8,
    utf32_mode: bool,
) -> Result<Vec<String>> {
    let num_cols = widths.len();
    if num_cols == 0 {
        return Ok(Vec::new());
    }
    let (mut byte_widths, excess) = char_widths_to_byte_widths(row, widths, utf32_mode)?;
    byte_widths[num_cols - 1] += excess;

    let mut headers = Vec::with_capacity(num_cols);
    let mut begin = 0usize;
    for &width in &byte_widths {
        let end = (begin + width).min(row.len());
        headers.push(String::from_utf8(trim_padding(&row[begin..end], padding).to_vec())?);
        begin = end;
    }
    Ok(headers)
}

fn trim_padding(mut bytes: &[u8], padding: u8) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if *first != padding {
            break;
        }
        bytes = rest;
    }
    while let [rest @ .., last] = bytes {
        if *last != padding {
            break;
        }
        bytes = rest;
    }
    bytes
}

/// Convert per-column character widths to byte widths over this row.
/// Returns the byte widths and the count of excess bytes no column claimed.
fn char_widths_to_byte_widths(
    row: &[u8],
    char_widths: &[usize],
    utf32_mode: bool,
) -> Result<(Vec<usize>, usize)> {
    let num_cols = char_widths.len();
    let mut byte_widths = vec![0usize; num_cols];
    let mut pos = 0usize;
    let mut col_start = 0usize;
    let mut col = 0usize;
    let mut chars = 0usize;
    loop {
        if col == num_cols {
            return Ok((byte_widths, row.len() - pos));
        }
        if chars >= char_widths[col] || pos == row.len() {
            byte_widths[col] = pos - col_start;
            col_start = pos;
            chars = 0;
            col += 1;
            continue;
        }
        let (byte_len, char_len) = utf8_lengths(row[pos], utf32_mode)?;
        pos += byte_len;
        chars += char_len;
    }
}
