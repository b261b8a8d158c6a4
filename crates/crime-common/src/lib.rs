//! Common types and utilities shared across the crime-grid services.

pub mod comparison;
pub mod error;
pub mod grid;
pub mod period;
pub mod variant;

pub use comparison::{metrics_payload, MetricComparison, MetricFigure, MetricValues};
pub use error::{CrimeError, CrimeResult};
pub use grid::{GridCell, FEET_PER_DEGREE_LAT, GRID_EDGE_FEET};
pub use period::TargetPeriod;
pub use variant::ModelVariant;
