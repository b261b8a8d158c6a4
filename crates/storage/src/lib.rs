//! Relational storage for the crime-grid pipeline.
//!
//! Provides the SQLite-backed store that holds the grid dimension table,
//! the three per-variant fact tables, and the model metrics, plus the
//! read queries used by the HTTP API.

pub mod store;

pub use store::{CrimeStore, PeriodDetail, PredictionInsert, PredictionRow};
