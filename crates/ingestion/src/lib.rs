//! Import pipeline: mapped CSVs and metric tables into the store.
//!
//! Imports stream row by row and upsert against the store, so reruns are
//! safe and convergent. Row-level failures are collected into the import
//! summary and skipped; file-level failures abort and propagate.

pub mod import;
pub mod metrics;
pub mod summary;

pub use import::import_predictions_csv;
pub use metrics::{import_metrics_csv, parse_summary_table};
pub use summary::ImportSummary;
