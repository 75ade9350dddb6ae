//! # Delimited Cell Grabber
//!
//! Streaming state machine over UTF-8 bytes. Per call it yields one cell as
//! a view into grabber-internal storage, plus the end-of-row flag.
//!
//! ## Buffering
//!
//! Input is read through a fixed buffer. A cell normally stays a contiguous
//! range of that buffer and is returned without copying. Two things force a
//! copy into the growable spill buffer: a cell spanning a buffer refill, and
//! a quoted cell containing collapsed `""` pairs. Unquoted scanning uses
//! `memchr3` over (delimiter, `\n`, `\r`); quoted scanning uses `memchr`
//! over the quote byte.
//!
//! ## Row terminators
//!
//! `\n`, `\r\n`, and lone `\r` all terminate a row. A cell ending exactly
//! at end of input without a terminator is a valid last cell.
//!
//! ## Line mode
//!
//! [`DelimitedCellGrabber::line_grabber`] uses a byte that cannot begin a
//! UTF-8 sequence as both delimiter and quote, so the machine degenerates
//! into returning whole physical rows. The fixed-width grabber builds on
//! this rather than duplicating the buffering and newline logic.

use super::{CellGrabber, GrabResult};
use crate::config::{GRABBER_BUFFER_SIZE, ILLEGAL_UTF8_BYTE};
use crate::tokenization::{is_space_or_tab, trim_spaces};
use eyre::{bail, Result, WrapErr};
use memchr::{memchr2, memchr3};
use std::io::{ErrorKind, Read};

/// Where the just-grabbed cell's bytes live.
enum CellLoc {
    Buffer { begin: usize, end: usize },
    Spill,
}

pub struct DelimitedCellGrabber<R> {
    input: R,
    buffer: Box<[u8]>,
    /// Valid bytes in `buffer`.
    size: usize,
    /// Next unread byte.
    offset: usize,
    /// Overflow storage for cells that cannot stay in `buffer`.
    spill: Vec<u8>,
    physical_row_num: u64,
    quote: u8,
    delimiter: u8,
    /// Trim spaces around unquoted cells (and allow them around quotes).
    trim_unquoted: bool,
    /// Trim spaces inside quoted cells too.
    trim_quoted: bool,
    /// Whether the previously returned cell ended its row. Distinguishes a
    /// clean end of input from a dangling empty cell after a trailing
    /// delimiter.
    last_cell_ended_row: bool,
}

impl<R: Read> DelimitedCellGrabber<R> {
    pub fn new(input: R, quote: u8, delimiter: u8, trim_unquoted: bool, trim_quoted: bool) -> Self {
        Self::with_buffer_capacity(
            input,
            quote,
            delimiter,
            trim_unquoted,
            trim_quoted,
            GRABBER_BUFFER_SIZE,
        )
    }

    /// Degenerate grabber returning whole physical rows: delimiter and
    /// quote are a byte that never occurs in UTF-8 input.
    pub fn line_grabber(input: R) -> Self {
        Self::new(input, ILLEGAL_UTF8_BYTE, ILLEGAL_UTF8_BYTE, false, false)
    }

    pub(crate) fn with_buffer_capacity(
        input: R,
        quote: u8,
        delimiter: u8,
        trim_unquoted: bool,
        trim_quoted: bool,
        capacity: usize,
    ) -> Self {
        Self {
            input,
            buffer: vec![0; capacity].into_boxed_slice(),
            size: 0,
            offset: 0,
            spill: Vec::new(),
            physical_row_num: 0,
            quote,
            delimiter,
            trim_unquoted,
            trim_quoted,
            last_cell_ended_row: true,
        }
    }

    /// Refill the buffer from the input. Only valid when fully consumed;
    /// any cell bytes still needed must have been spilled first.
    fn refill(&mut self) -> Result<bool> {
        debug_assert_eq!(self.offset, self.size);
        let n = loop {
            match self.input.read(&mut self.buffer) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).wrap_err("failed reading input stream"),
            }
        };
        self.size = n;
        self.offset = 0;
        Ok(n > 0)
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        if self.offset == self.size && !self.refill()? {
            return Ok(None);
        }
        Ok(Some(self.buffer[self.offset]))
    }

    fn spill_segment(&mut self, begin: usize, end: usize) {
        if end > begin {
            self.spill.extend_from_slice(&self.buffer[begin..end]);
        }
    }

    /// Close the current cell over `buffer[begin..end]`, keeping it in
    /// place unless earlier segments were already spilled.
    fn seal(&mut self, begin: usize, end: usize) -> CellLoc {
        if self.spill.is_empty() {
            CellLoc::Buffer { begin, end }
        } else {
            self.spill_segment(begin, end);
            CellLoc::Spill
        }
    }

    /// Make `loc` survive a buffer refill.
    fn secure(&mut self, loc: CellLoc) -> CellLoc {
        match loc {
            CellLoc::Buffer { begin, end } => {
                self.spill_segment(begin, end);
                CellLoc::Spill
            }
            CellLoc::Spill => CellLoc::Spill,
        }
    }

    /// A `\r` was consumed; absorb a following `\n` if there is one.
    fn consume_lf_after_cr(&mut self, loc: CellLoc) -> Result<CellLoc> {
        if self.offset == self.size {
            let secured = self.secure(loc);
            if !self.refill()? {
                return Ok(secured);
            }
            if self.buffer[self.offset] == b'\n' {
                self.offset += 1;
            }
            return Ok(secured);
        }
        if self.buffer[self.offset] == b'\n' {
            self.offset += 1;
        }
        Ok(loc)
    }

    /// Consume leading spaces ahead of a cell. A space that is itself the
    /// delimiter still terminates the (empty) cell.
    fn skip_leading_spaces(&mut self) -> Result<()> {
        while let Some(b) = self.peek()? {
            if b == self.delimiter || !is_space_or_tab(b) {
                break;
            }
            self.offset += 1;
        }
        Ok(())
    }

    fn process_unquoted(&mut self) -> Result<(CellLoc, bool)> {
        let mut begin = self.offset;
        loop {
            if self.offset == self.size {
                self.spill_segment(begin, self.offset);
                if !self.refill()? {
                    // End of input terminates the final cell and its row.
                    self.physical_row_num += 1;
                    return Ok((CellLoc::Spill, true));
                }
                begin = 0;
                continue;
            }
            match memchr3(
                self.delimiter,
                b'\n',
                b'\r',
                &self.buffer[self.offset..self.size],
            ) {
                None => self.offset = self.size,
                Some(rel) => {
                    let pos = self.offset + rel;
                    let found = self.buffer[pos];
                    let loc = self.seal(begin, pos);
                    self.offset = pos + 1;
                    if found == self.delimiter {
                        return Ok((loc, false));
                    }
                    let loc = if found == b'\r' {
                        self.consume_lf_after_cr(loc)?
                    } else {
                        loc
                    };
                    self.physical_row_num += 1;
                    return Ok((loc, true));
                }
            }
        }
    }

    /// Opening quote already consumed. Scan content, collapsing `""`.
    fn process_quoted(&mut self) -> Result<(CellLoc, bool)> {
        let mut begin = self.offset;
        loop {
            if self.offset == self.size {
                self.spill_segment(begin, self.offset);
                if !self.refill()? {
                    bail!(
                        "cell opened with a quote that is never closed (row {})",
                        self.physical_row_num + 1
                    );
                }
                begin = 0;
                continue;
            }
            match memchr2(self.quote, b'\n', &self.buffer[self.offset..self.size]) {
                None => self.offset = self.size,
                Some(rel) => {
                    let pos = self.offset + rel;
                    self.offset = pos + 1;
                    if self.buffer[pos] == b'\n' {
                        // Embedded newline: content, but still a physical row.
                        self.physical_row_num += 1;
                        continue;
                    }
                    if self.offset == self.size {
                        // The byte after the quote decides escaped vs
                        // closing; it may live in the next buffer fill.
                        self.spill_segment(begin, pos);
                        match self.peek()? {
                            Some(b) if b == self.quote => {
                                self.spill.push(self.quote);
                                self.offset += 1;
                                begin = self.offset;
                                continue;
                            }
                            _ => return self.after_closing_quote(CellLoc::Spill),
                        }
                    }
                    if self.buffer[self.offset] == self.quote {
                        // Escaped pair: keep one literal quote.
                        self.spill_segment(begin, pos + 1);
                        self.offset += 1;
                        begin = self.offset;
                        continue;
                    }
                    let loc = self.seal(begin, pos);
                    return self.after_closing_quote(loc);
                }
            }
        }
    }

    /// Content is complete; only a delimiter, a row terminator, or end of
    /// input may follow (plus surrounding spaces when trimming is on).
    fn after_closing_quote(&mut self, mut loc: CellLoc) -> Result<(CellLoc, bool)> {
        loop {
            if self.offset == self.size {
                loc = self.secure(loc);
                if !self.refill()? {
                    self.physical_row_num += 1;
                    return Ok((loc, true));
                }
            }
            let b = self.buffer[self.offset];
            if b == self.delimiter {
                self.offset += 1;
                return Ok((loc, false));
            }
            if b == b'\n' {
                self.offset += 1;
                self.physical_row_num += 1;
                return Ok((loc, true));
            }
            if b == b'\r' {
                self.offset += 1;
                let loc = self.consume_lf_after_cr(loc)?;
                self.physical_row_num += 1;
                return Ok((loc, true));
            }
            if self.trim_unquoted && is_space_or_tab(b) {
                self.offset += 1;
                continue;
            }
            bail!(
                "syntax error: unexpected character {:?} after closing quote (row {})",
                b as char,
                self.physical_row_num + 1
            );
        }
    }
}

impl<R: Read> CellGrabber for DelimitedCellGrabber<R> {
    fn grab_next(&mut self) -> Result<GrabResult<'_>> {
        self.spill.clear();
        if self.offset == self.size && !self.refill()? {
            if self.last_cell_ended_row {
                return Ok(GrabResult::EndOfInput);
            }
            // End of input right after a delimiter: one final empty cell.
            self.last_cell_ended_row = true;
            self.physical_row_num += 1;
            return Ok(GrabResult::Cell {
                text: &[],
                last_in_row: true,
            });
        }

        if self.trim_unquoted {
            self.skip_leading_spaces()?;
        }
        let quoted = self.peek()? == Some(self.quote);
        let (loc, last_in_row) = if quoted {
            self.offset += 1;
            self.process_quoted()?
        } else {
            self.process_unquoted()?
        };
        self.last_cell_ended_row = last_in_row;

        let bytes = match loc {
            CellLoc::Buffer { begin, end } => &self.buffer[begin..end],
            CellLoc::Spill => self.spill.as_slice(),
        };
        let trim = if quoted {
            self.trim_quoted
        } else {
            self.trim_unquoted
        };
        let text = if trim { trim_spaces(bytes) } else { bytes };
        Ok(GrabResult::Cell { text, last_in_row })
    }

    fn physical_row_num(&self) -> u64 {
        self.physical_row_num
    }
}
