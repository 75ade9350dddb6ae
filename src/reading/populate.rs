//! # Dense Storage Population
//!
//! The producer side of the reader: a single task that drains the cell
//! grabber and appends every cell to its column's dense storage writer.
//!
//! Row-shape handling per the configuration: short rows are padded with
//! empty cells or rejected; excess cells are dropped or rejected; rows
//! consisting of one empty cell can be skipped. `skip_rows` drops data
//! rows up front and `num_rows` caps how many are appended.
//!
//! Every writer is finished even when tokenization fails part-way, so the
//! per-column consumers always observe a terminated (if truncated) stream
//! and the producer's error wins at the coordinator.

use super::cells::{CellGrabber, GrabResult};
use crate::densestorage::DenseStorageWriter;
use crate::specs::CsvSpecs;
use eyre::{bail, Result};

/// Drain `grabber` into `writers`. Returns the number of data rows
/// appended to every column.
pub(crate) fn populate(
    specs: &CsvSpecs,
    grabber: &mut dyn CellGrabber,
    first_data_row: Option<Vec<Vec<u8>>>,
    mut writers: Vec<DenseStorageWriter>,
) -> Result<u64> {
    let result = populate_inner(specs, grabber, first_data_row, &mut writers);
    // Terminate every column stream regardless of how tokenization ended.
    let mut finish_result = Ok(());
    for writer in writers {
        if let Err(e) = writer.finish() {
            if finish_result.is_ok() {
                finish_result = Err(e);
            }
        }
    }
    match result {
        Err(e) => Err(e),
        Ok(rows) => finish_result.map(|()| rows),
    }
}

/// One row's worth of grabbing, as owned state so the first (pre-grabbed)
/// row and streamed rows share the append logic.
struct RowShape {
    num_cols: usize,
    allow_missing: bool,
    ignore_excess: bool,
}

impl RowShape {
    /// Append one complete row. `cells_seen` counts the cells the input
    /// actually provided.
    fn close_row(
        &self,
        writers: &mut [DenseStorageWriter],
        cells_seen: usize,
        physical_row: u64,
    ) -> Result<()> {
        if cells_seen < self.num_cols {
            if !self.allow_missing {
                bail!(
                    "row {} has too few columns: expected {}, got {}",
                    physical_row,
                    self.num_cols,
                    cells_seen
                );
            }
            for writer in writers.iter_mut().skip(cells_seen) {
                writer.append(&[])?;
            }
        }
        Ok(())
    }

    fn check_excess(&self, cells_seen: usize, physical_row: u64) -> Result<()> {
        if cells_seen >= self.num_cols && !self.ignore_excess {
            bail!(
                "row {} has too many columns: expected {}",
                physical_row,
                self.num_cols
            );
        }
        Ok(())
    }
}

fn populate_inner(
    specs: &CsvSpecs,
    grabber: &mut dyn CellGrabber,
    first_data_row: Option<Vec<Vec<u8>>>,
    writers: &mut Vec<DenseStorageWriter>,
) -> Result<u64> {
    let shape = RowShape {
        num_cols: writers.len(),
        allow_missing: specs.allow_missing_columns(),
        ignore_excess: specs.ignore_excess_columns(),
    };
    let mut rows_to_skip = specs.skip_rows();
    let cap = specs.num_rows();
    let mut row_count: u64 = 0;

    if let Some(cells) = first_data_row {
        let is_empty_line = cells.len() == 1 && cells[0].is_empty();
        let skip_this = rows_to_skip > 0 || (is_empty_line && specs.ignore_empty_lines());
        if rows_to_skip > 0 {
            rows_to_skip -= 1;
        }
        if !skip_this && cap > 0 {
            for (col, cell) in cells.iter().enumerate() {
                if col >= shape.num_cols {
                    shape.check_excess(col, grabber.physical_row_num())?;
                    break;
                }
                writers[col].append(cell)?;
            }
            shape.close_row(writers, cells.len().min(shape.num_cols), grabber.physical_row_num())?;
            row_count += 1;
        }
    }

    'rows: loop {
        if row_count == cap {
            break;
        }
        let mut col_index = 0usize;
        // Decisions that need the first cell: end of input, empty line.
        let mut skipping_row = rows_to_skip > 0;
        loop {
            let physical_row = grabber.physical_row_num() + 1;
            match grabber.grab_next()? {
                GrabResult::EndOfInput => {
                    if col_index != 0 {
                        bail!("logic error: input ended in the middle of row {}", physical_row);
                    }
                    break 'rows;
                }
                GrabResult::Cell { text, last_in_row } => {
                    if col_index == 0 && last_in_row && text.is_empty() {
                        // A row of a single empty cell. Inside the skip
                        // window it still counts as one skipped row, so
                        // fall through to the normal skip handling.
                        if !skipping_row && specs.ignore_empty_lines() {
                            continue 'rows;
                        }
                    }
                    if !skipping_row {
                        if col_index >= shape.num_cols {
                            shape.check_excess(col_index, physical_row)?;
                        } else {
                            writers[col_index].append(text)?;
                        }
                    }
                    col_index += 1;
                    if last_in_row {
                        if skipping_row {
                            rows_to_skip -= 1;
                        } else {
                            shape.close_row(
                                writers,
                                col_index.min(shape.num_cols),
                                physical_row,
                            )?;
                            row_count += 1;
                        }
                        continue 'rows;
                    }
                }
            }
        }
    }
    Ok(row_count)
}
