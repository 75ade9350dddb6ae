//! # Header Resolution
//!
//! Determines column names (and, in fixed-width mode, column widths) before
//! the producer starts tokenizing data rows. Shared helpers live here; the
//! per-mode logic is in [`delimited`] and [`fixed`].

pub mod delimited;
pub mod fixed;

use crate::specs::CsvSpecs;
use eyre::{ensure, Result};

/// `Column1..ColumnN`, used when the input supplies no names.
pub(crate) fn synthetic_headers(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("Column{i}")).collect()
}

/// Apply the caller's full-header override (length must match what the
/// input produced) and then any per-index overrides.
pub(crate) fn apply_overrides(specs: &CsvSpecs, headers: &mut Vec<String>) -> Result<()> {
    if !specs.headers().is_empty() {
        ensure!(
            specs.headers().len() == headers.len(),
            "input determined {} headers; caller overrode with {}",
            headers.len(),
            specs.headers().len()
        );
        *headers = specs.headers().to_vec();
    }
    for (&index, name) in specs.header_for_index() {
        ensure!(
            index < headers.len(),
            "header override for column index {} is out of range ({} columns)",
            index,
            headers.len()
        );
        headers[index] = name.clone();
    }
    Ok(())
}
