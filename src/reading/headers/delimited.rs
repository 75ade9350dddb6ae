//! # Delimited Header Resolution
//!
//! Reads the header row (after any skipped prefix rows), or, when the input
//! has no header row, peeks the first data row to learn the column count
//! and synthesizes `Column1..ColumnN`. The peeked row is handed back to the
//! producer so it is not lost.

use super::{apply_overrides, synthetic_headers};
use crate::reading::cells::{CellGrabber, GrabResult};
use crate::specs::CsvSpecs;
use eyre::{bail, Result};

pub(crate) struct HeaderResult {
    pub headers: Vec<String>,
    /// Set when the first data row was consumed to count columns.
    pub first_data_row: Option<Vec<Vec<u8>>>,
}

/// One full row of owned cells, or `None` at end of input.
fn grab_row(grabber: &mut dyn CellGrabber) -> Result<Option<Vec<Vec<u8>>>> {
    let mut cells: Vec<Vec<u8>> = Vec::new();
    loop {
        match grabber.grab_next()? {
            GrabResult::EndOfInput => {
                return Ok(if cells.is_empty() { None } else { Some(cells) })
            }
            GrabResult::Cell { text, last_in_row } => {
                cells.push(text.to_vec());
                if last_in_row {
                    return Ok(Some(cells));
                }
            }
        }
    }
}

pub(crate) fn determine_headers(
    specs: &CsvSpecs,
    grabber: &mut dyn CellGrabber,
) -> Result<HeaderResult> {
    if specs.has_header_row() {
        let mut skip = specs.skip_header_rows();
        let header_row = loop {
            let Some(row) = grab_row(grabber)? else {
                bail!(
                    "has_header_row is set but the input is empty or shorter than skip_header_rows"
                );
            };
            if skip == 0 {
                break row;
            }
            skip -= 1;
        };
        let mut headers = header_row
            .iter()
            .map(|cell| String::from_utf8(cell.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        apply_overrides(specs, &mut headers)?;
        return Ok(HeaderResult {
            headers,
            first_data_row: None,
        });
    }

    // No header row: the first data row determines the column count.
    let first_data_row = grab_row(grabber)?;
    let count = match &first_data_row {
        Some(row) => row.len(),
        // Empty input: columns come only from an explicit override.
        None => specs.headers().len(),
    };
    let mut headers = synthetic_headers(count);
    apply_overrides(specs, &mut headers)?;
    Ok(HeaderResult {
        headers,
        first_data_row,
    })
}
