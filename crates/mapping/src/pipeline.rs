//! The mapping pipeline: extract, join, coerce, write.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crime_common::{CrimeError, CrimeResult, GridCell, ModelVariant};

use crate::coordinates::load_coordinates;
use crate::extract::{extract_model_rows, RankedCount};
use crate::mapped::{write_mapped_csv, MappedRow};

/// Maximum number of ranked rows carried into the mapped output.
pub const DEFAULT_ROW_LIMIT: usize = 100;

/// Summary of one mapped CSV produced by [`map_model`].
#[derive(Debug, Clone, PartialEq)]
pub struct MappedOutput {
    pub variant: ModelVariant,
    pub period: i64,
    pub rows: usize,
    pub path: PathBuf,
}

/// Map one ranking CSV against the coordinate table and write the
/// per-period output(s) under `processed_dir`.
///
/// An ML ranking export also carries the ground-truth counts, so mapping
/// with [`ModelVariant::Mlp`] additionally produces `mapped_actual.csv`
/// for the same period.
pub fn map_model(
    model_path: &Path,
    coordinate_path: &Path,
    variant: ModelVariant,
    processed_dir: &Path,
) -> CrimeResult<Vec<MappedOutput>> {
    let cells: HashMap<i64, GridCell> = load_coordinates(coordinate_path)?
        .into_iter()
        .map(|cell| (cell.grid_id, cell))
        .collect();

    let mut outputs = vec![map_one(
        model_path,
        &cells,
        variant,
        processed_dir,
    )?];

    if variant == ModelVariant::Mlp {
        outputs.push(map_one(
            model_path,
            &cells,
            ModelVariant::Actual,
            processed_dir,
        )?);
    }

    Ok(outputs)
}

fn map_one(
    model_path: &Path,
    cells: &HashMap<i64, GridCell>,
    variant: ModelVariant,
    processed_dir: &Path,
) -> CrimeResult<MappedOutput> {
    let extracted = extract_model_rows(model_path, variant, DEFAULT_ROW_LIMIT)?;
    let input_rows = extracted.len();

    // Inner join on grid id: rows without a matching coordinate are
    // silently dropped.
    let rows: Vec<MappedRow> = extracted
        .into_iter()
        .filter_map(|row| join_row(row, cells))
        .collect();

    debug!(
        model = %variant,
        input_rows,
        joined_rows = rows.len(),
        "Joined ranking rows with coordinates"
    );

    let first = rows.first().ok_or_else(|| CrimeError::InvalidValue {
        column: "grid_id".to_string(),
        message: format!(
            "no rows survived the coordinate join for {}",
            model_path.display()
        ),
    })?;

    let period = first.target_period;
    let period_dir = processed_dir.join(period.to_string());
    fs::create_dir_all(&period_dir)?;

    let path = period_dir.join(variant.mapped_filename());
    write_mapped_csv(&path, variant, &rows)?;

    info!(model = %variant, period, rows = rows.len(), path = %path.display(), "Wrote mapped CSV");

    Ok(MappedOutput {
        variant,
        period,
        rows: rows.len(),
        path,
    })
}

/// Coerce one extracted row and attach its grid cell.
///
/// Truncation toward zero is the documented integer-coercion rule; the
/// coordinate columns stay floating point (see
/// [`crate::mapped::FLOAT_COLUMNS`]).
fn join_row(row: RankedCount, cells: &HashMap<i64, GridCell>) -> Option<MappedRow> {
    let grid_id = row.grid_id as i64;
    let cell = cells.get(&grid_id)?;

    Some(MappedRow {
        rank: row.rank as i64,
        grid_id,
        count: row.count as i64,
        target_period: row.target_period as i64,
        cell: *cell,
    })
}

/// Read the target period from the first data row of a ranking CSV.
///
/// Returns None on any error; the caller only uses this to decide whether
/// mapped outputs already exist.
pub fn read_target_period(path: &Path) -> Option<String> {
    let mut reader = csv::Reader::from_path(path).ok()?;
    let headers = reader.headers().ok()?.clone();
    let idx = headers.iter().position(|h| h == "Target_Period")?;

    let record = reader.records().next()?.ok()?;
    record.get(idx).map(|v| v.trim().to_string())
}
