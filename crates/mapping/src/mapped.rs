//! Mapped CSV rows: writing and reading the per-period join output.

use std::path::Path;

use serde::Serialize;

use crime_common::{CrimeError, CrimeResult, GridCell, ModelVariant};

/// Columns that keep their floating-point values in mapped output.
///
/// Every other column (`Rank`, `grid_id`, `Target_Period`, and the variant
/// count column) is truncated toward zero when the join output is written.
/// This makes the lossy coercion rule inherited from the source data
/// explicit.
pub const FLOAT_COLUMNS: &[&str] = &[
    "center_longitude",
    "center_latitude",
    "southwest_lat",
    "southwest_lng",
    "northeast_lat",
    "northeast_lng",
];

/// One joined and coerced output row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedRow {
    pub rank: i64,
    pub grid_id: i64,
    pub count: i64,
    pub target_period: i64,
    pub cell: GridCell,
}

/// Write mapped rows to `path`, overwriting any previous output.
pub fn write_mapped_csv(path: &Path, variant: ModelVariant, rows: &[MappedRow]) -> CrimeResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["Rank", "grid_id", variant.count_column(), "Target_Period"];
    header.extend_from_slice(FLOAT_COLUMNS);
    writer.write_record(&header)?;

    for row in rows {
        writer.write_record(&[
            row.rank.to_string(),
            row.grid_id.to_string(),
            row.count.to_string(),
            row.target_period.to_string(),
            row.cell.center_longitude.to_string(),
            row.cell.center_latitude.to_string(),
            row.cell.southwest_lat.to_string(),
            row.cell.southwest_lng.to_string(),
            row.cell.northeast_lat.to_string(),
            row.cell.northeast_lng.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// One mapped row as read back for the static JSON snapshots.
///
/// Fields are optional because snapshot building tolerates sparse rows;
/// rows without a usable rank are dropped by [`read_mapped_rows`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedRecord {
    pub grid_id: Option<i64>,
    pub center_longitude: Option<f64>,
    pub center_latitude: Option<f64>,
    pub southwest_lat: Option<f64>,
    pub southwest_lng: Option<f64>,
    pub northeast_lat: Option<f64>,
    pub northeast_lng: Option<f64>,
    pub target_period: Option<i64>,
    pub count: Option<i64>,
    pub rank: i64,
}

/// Read a mapped CSV back, sorted ascending by rank and truncated to
/// `limit`. `count_column` selects the variant count column.
pub fn read_mapped_rows(
    path: &Path,
    count_column: &str,
    limit: usize,
) -> CrimeResult<Vec<MappedRecord>> {
    if !path.exists() {
        return Err(CrimeError::FileNotFound(path.display().to_string()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let index = |name: &str| headers.iter().position(|h| h == name);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |name: &str| index(name).and_then(|i| record.get(i));

        let Some(rank) = field("Rank").and_then(safe_int) else {
            continue;
        };

        rows.push(MappedRecord {
            grid_id: field("grid_id").and_then(safe_int),
            center_longitude: field("center_longitude").and_then(safe_float),
            center_latitude: field("center_latitude").and_then(safe_float),
            southwest_lat: field("southwest_lat").and_then(safe_float),
            southwest_lng: field("southwest_lng").and_then(safe_float),
            northeast_lat: field("northeast_lat").and_then(safe_float),
            northeast_lng: field("northeast_lng").and_then(safe_float),
            target_period: field("Target_Period").and_then(safe_int),
            count: field(count_column).and_then(safe_int),
            rank,
        });
    }

    rows.sort_by_key(|row| row.rank);
    rows.truncate(limit);
    Ok(rows)
}

fn safe_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn safe_int(raw: &str) -> Option<i64> {
    safe_float(raw).map(|v| v as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(grid_id: i64) -> GridCell {
        GridCell::from_centroid(grid_id, -82.5, 27.3)
    }

    #[test]
    fn test_write_then_read_sorted_by_rank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapped_mlp.csv");

        let rows = vec![
            MappedRow {
                rank: 2,
                grid_id: 7,
                count: 3,
                target_period: 202302,
                cell: cell(7),
            },
            MappedRow {
                rank: 1,
                grid_id: 9,
                count: 11,
                target_period: 202302,
                cell: cell(9),
            },
        ];
        write_mapped_csv(&path, ModelVariant::Mlp, &rows).unwrap();

        let records = read_mapped_rows(&path, "Predicted_Crime_Count", 20).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rank, 1);
        assert_eq!(records[0].grid_id, Some(9));
        assert_eq!(records[0].count, Some(11));
        assert_eq!(records[1].rank, 2);
    }

    #[test]
    fn test_rows_without_rank_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapped_lee.csv");
        std::fs::write(
            &path,
            "Rank,grid_id,Crime_T1,Target_Period\n1,5,2,202302\n,6,3,202302\n",
        )
        .unwrap();

        let records = read_mapped_rows(&path, "Crime_T1", 20).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].grid_id, Some(5));
    }
}
