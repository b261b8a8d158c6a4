//! Mapping pipeline: ranking CSV extraction, coordinate joins, and
//! period-partitioned mapped outputs.
//!
//! The pipeline takes heterogeneous per-model ranking CSVs (different count
//! columns, different row orders), derives a consistent rank, joins each row
//! with its grid-cell coordinates and bounding box, coerces the ranking
//! columns to integers, and writes one `mapped_{model}.csv` per
//! (period, model) under the processed-data directory.

pub mod actual;
pub mod coordinates;
pub mod extract;
pub mod mapped;
pub mod pipeline;

pub use actual::{process_actual_export, ActualSplit};
pub use coordinates::load_coordinates;
pub use extract::{extract_model_rows, RankedCount};
pub use mapped::{read_mapped_rows, MappedRecord, MappedRow, FLOAT_COLUMNS};
pub use pipeline::{map_model, read_target_period, MappedOutput, DEFAULT_ROW_LIMIT};
