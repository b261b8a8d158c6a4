//! Grid coordinate loading.

use std::path::Path;

use serde::Deserialize;

use crime_common::{CrimeError, CrimeResult, GridCell};

/// One row of the coordinate export: grid id plus centroid.
///
/// `xcentroid` is longitude, `ycentroid` is latitude.
#[derive(Debug, Deserialize)]
struct CoordinateRow {
    gridid: i64,
    xcentroid: f64,
    ycentroid: f64,
}

/// Load the grid-id -> centroid table and derive bounding-box corners
/// for every cell.
pub fn load_coordinates(path: &Path) -> CrimeResult<Vec<GridCell>> {
    if !path.exists() {
        return Err(CrimeError::FileNotFound(path.display().to_string()));
    }

    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    for required in ["gridid", "xcentroid", "ycentroid"] {
        if !headers.iter().any(|h| h == required) {
            return Err(CrimeError::MissingColumn(required.to_string()));
        }
    }

    let mut cells = Vec::new();
    for row in reader.deserialize::<CoordinateRow>() {
        let row = row?;
        cells.push(GridCell::from_centroid(
            row.gridid,
            row.xcentroid,
            row.ycentroid,
        ));
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{coordinate_csv, write_file};

    #[test]
    fn test_load_renames_and_derives_corners() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "coordinate.csv",
            &coordinate_csv(&[(1, -82.53, 27.33), (2, -82.52, 27.34)]),
        );

        let cells = load_coordinates(&path).unwrap();

        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].grid_id, 1);
        assert_eq!(cells[0].center_longitude, -82.53);
        assert_eq!(cells[0].center_latitude, 27.33);
        assert!(cells[0].southwest_lat < cells[0].northeast_lat);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.csv", "gridid,xcentroid\n1,-82.5\n");

        let err = load_coordinates(&path).unwrap_err();
        assert!(matches!(err, CrimeError::MissingColumn(c) if c == "ycentroid"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_coordinates(Path::new("/nonexistent/coordinate.csv")).unwrap_err();
        assert!(matches!(err, CrimeError::FileNotFound(_)));
    }
}
