//! # Cell Grabbers
//!
//! A cell grabber consumes the raw input stream and yields one cell per
//! call, flagging end-of-row and end-of-input. Two variants exist:
//!
//! - [`DelimitedCellGrabber`]: the streaming CSV state machine.
//! - [`FixedCellGrabber`]: splits whole physical rows by character widths,
//!   reusing the delimited grabber in line mode for the buffering and
//!   newline handling.
//!
//! Returned cell text borrows grabber-internal storage and is invalidated
//! by the next call; the dense storage writer copies on append, so nothing
//! downstream holds onto these views.

mod delimited;
mod fixed;

pub use delimited::DelimitedCellGrabber;
pub use fixed::FixedCellGrabber;

use eyre::{bail, Result};

/// Outcome of one grab.
pub enum GrabResult<'a> {
    /// One cell. `last_in_row` is set when the cell was terminated by a row
    /// terminator or end of input.
    Cell { text: &'a [u8], last_in_row: bool },
    /// No cells remain.
    EndOfInput,
}

pub trait CellGrabber {
    fn grab_next(&mut self) -> Result<GrabResult<'_>>;

    /// Count of completed physical rows, monotonically increasing.
    fn physical_row_num(&self) -> u64;
}

/// Byte and character length of the UTF-8 sequence starting with
/// `first_byte`. In UTF-16 counting mode (`utf32_mode = false`) code points
/// outside the BMP, i.e. 4-byte sequences, count as two characters.
pub(crate) fn utf8_lengths(first_byte: u8, utf32_mode: bool) -> Result<(usize, usize)> {
    let byte_len = match first_byte {
        b if b & 0x80 == 0 => 1,
        b if b & 0xE0 == 0xC0 => 2,
        b if b & 0xF0 == 0xE0 => 3,
        b if b & 0xF8 == 0xF0 => 4,
        b => bail!("0x{b:02x} is not a valid starting byte for a UTF-8 sequence"),
    };
    let char_len = if byte_len == 4 && !utf32_mode { 2 } else { 1 };
    Ok((byte_len, char_len))
}
