//! # Fixed-Width Cell Grabber
//!
//! Splits whole physical rows into cells by column widths measured in
//! character units. Rows come from a line-mode [`DelimitedCellGrabber`],
//! reusing its buffering and newline handling; each row is copied into an
//! owned row buffer so cell views stay valid across the underlying
//! grabber's refills.
//!
//! ## Character counting
//!
//! Widths are counted per code point (UTF-32 convention) or per UTF-16
//! code unit, where code points outside the BMP, 4-byte UTF-8 sequences,
//! count as two. In UTF-16 mode a column boundary that would fall between
//! the two halves of a surrogate pair is an error.
//!
//! The final column absorbs all trailing bytes of the row. Short rows are
//! padded with empty cells.

use super::{utf8_lengths, CellGrabber, DelimitedCellGrabber, GrabResult};
use eyre::{bail, ensure, Result};
use std::io::Read;

pub struct FixedCellGrabber<R> {
    line_grabber: DelimitedCellGrabber<R>,
    /// Column widths in character units.
    widths: Vec<usize>,
    utf32_mode: bool,
    /// The current physical row, owned.
    row: Vec<u8>,
    col_index: usize,
    /// Byte offset of the next cell within `row`.
    col_offset: usize,
}

impl<R: Read> FixedCellGrabber<R> {
    pub fn new(line_grabber: DelimitedCellGrabber<R>, widths: Vec<usize>, utf32_mode: bool) -> Self {
        let col_index = widths.len();
        Self {
            line_grabber,
            widths,
            utf32_mode,
            row: Vec::new(),
            // Start "past" an empty row so the first grab fetches a line.
            col_index,
            col_offset: 0,
        }
    }
}

impl<R: Read> CellGrabber for FixedCellGrabber<R> {
    fn grab_next(&mut self) -> Result<GrabResult<'_>> {
        loop {
            if self.col_offset == self.row.len() {
                if self.col_index < self.widths.len() {
                    // Row ran out before providing every column: pad.
                    self.col_index += 1;
                    return Ok(GrabResult::Cell {
                        text: &[],
                        last_in_row: self.col_index == self.widths.len(),
                    });
                }
                match self.line_grabber.grab_next()? {
                    GrabResult::EndOfInput => return Ok(GrabResult::EndOfInput),
                    GrabResult::Cell { text, .. } => {
                        self.row.clear();
                        self.row.extend_from_slice(text);
                    }
                }
                self.col_index = 0;
                self.col_offset = 0;
                continue;
            }

            let begin = self.col_offset;
            let is_last_col = self.col_index + 1 == self.widths.len();
            let end = if is_last_col {
                // The final column absorbs any trailing content.
                self.row.len()
            } else {
                begin
                    + take_chars(
                        &self.row[begin..],
                        self.widths[self.col_index],
                        self.utf32_mode,
                    )?
            };
            self.col_index += 1;
            self.col_offset = end;
            return Ok(GrabResult::Cell {
                text: &self.row[begin..end],
                last_in_row: self.col_index == self.widths.len(),
            });
        }
    }

    fn physical_row_num(&self) -> u64 {
        self.line_grabber.physical_row_num()
    }
}

/// Byte length of the first `width` character units of `bytes`, stopping
/// early when the row runs out.
fn take_chars(bytes: &[u8], width: usize, utf32_mode: bool) -> Result<usize> {
    let mut pos = 0;
    let mut chars = 0;
    while pos < bytes.len() && chars < width {
        let (byte_len, char_len) = utf8_lengths(bytes[pos], utf32_mode)?;
        if chars + char_len > width {
            bail!(
                "column boundary with width {} would split a surrogate pair; \
                 use the UTF-32 counting convention or adjust the widths",
                width
            );
        }
        pos += byte_len;
        chars += char_len;
        ensure!(pos <= bytes.len(), "truncated UTF-8 sequence in fixed-width row");
    }
    Ok(pos)
}
