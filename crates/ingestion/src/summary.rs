//! Import run summaries.

use serde::Serialize;

/// Accumulated result of one import batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    /// Rows that parsed cleanly and were upserted. Rows recorded in
    /// `errors` are not counted here.
    pub total_rows: usize,
    /// Grid dimension records created on first reference.
    pub grids_created: usize,
    /// Fact/metric records newly created.
    pub records_created: usize,
    /// Fact/metric records that already existed and were overwritten.
    pub records_updated: usize,
    /// Row-level errors, formatted as "Row {n}: {message}".
    pub errors: Vec<String>,
}

impl ImportSummary {
    pub fn record_error(&mut self, row_num: usize, message: impl std::fmt::Display) {
        self.errors.push(format!("Row {}: {}", row_num, message));
    }
}
