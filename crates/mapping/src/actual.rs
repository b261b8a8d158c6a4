//! Actual-crime preprocessor.
//!
//! Extracts ground-truth counts from an ML results export, reranks them,
//! and writes one `actual_crime_{period}.csv` per target period. These
//! files can later be mapped directly with [`crate::map_model`] and
//! [`crime_common::ModelVariant::Actual`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crime_common::{CrimeResult, ModelVariant};

use crate::extract::extract_model_rows;

/// One per-period output of [`process_actual_export`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActualSplit {
    pub period: i64,
    pub rows: usize,
    pub path: PathBuf,
}

/// Split the actual-crime columns of `csv_path` by target period.
///
/// Ranks are assigned over the whole export (descending count, stable
/// ties) before the split, so a cell's rank is comparable across the
/// per-period files.
pub fn process_actual_export(csv_path: &Path, output_dir: &Path) -> CrimeResult<Vec<ActualSplit>> {
    let rows = extract_model_rows(csv_path, ModelVariant::Actual, usize::MAX)?;
    fs::create_dir_all(output_dir)?;

    let mut periods: Vec<i64> = rows.iter().map(|r| r.target_period as i64).collect();
    periods.sort_unstable();
    periods.dedup();

    let mut splits = Vec::new();
    for period in periods {
        let path = output_dir.join(format!("actual_crime_{}.csv", period));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["Rank", "grid_id", "Actual_Crime_Count", "Target_Period"])?;

        let mut count = 0usize;
        for row in rows.iter().filter(|r| r.target_period as i64 == period) {
            writer.write_record(&[
                (row.rank as i64).to_string(),
                (row.grid_id as i64).to_string(),
                (row.count as i64).to_string(),
                period.to_string(),
            ])?;
            count += 1;
        }
        writer.flush()?;

        info!(period, rows = count, path = %path.display(), "Wrote actual-crime split");
        splits.push(ActualSplit {
            period,
            rows: count,
            path,
        });
    }

    Ok(splits)
}
