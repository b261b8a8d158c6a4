//! Prediction importer: mapped CSV rows into the store.

use std::path::Path;

use tracing::{info, warn};

use crime_common::{CrimeError, CrimeResult, GridCell, ModelVariant};
use storage::{CrimeStore, PredictionInsert};

use crate::summary::ImportSummary;

/// Import a mapped CSV for one variant.
///
/// Per row: upsert the grid dimension record, then upsert the variant fact
/// record keyed by (grid, period). Rows with missing or unparsable fields
/// are recorded in the summary and skipped; database errors abort the
/// batch.
pub async fn import_predictions_csv(
    store: &CrimeStore,
    variant: ModelVariant,
    path: &Path,
    source_name: &str,
) -> CrimeResult<ImportSummary> {
    if !path.exists() {
        return Err(CrimeError::FileNotFound(path.display().to_string()));
    }

    let source_file = if source_name.is_empty() {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        source_name.to_string()
    };

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut summary = ImportSummary::default();

    for (row_num, record) in reader.records().enumerate() {
        let row_num = row_num + 1;
        let record = record?;

        let parsed = match parse_row(&headers, &record, variant) {
            Ok(parsed) => parsed,
            Err(message) => {
                summary.record_error(row_num, message);
                continue;
            }
        };
        summary.total_rows += 1;

        if store.upsert_grid(&parsed.cell).await? {
            summary.grids_created += 1;
        }

        let insert = PredictionInsert {
            grid_id: parsed.cell.grid_id,
            target_period: parsed.target_period,
            count: parsed.count,
            rank: parsed.rank,
            source_file: source_file.clone(),
        };

        if store.upsert_prediction(variant, &insert).await? {
            summary.records_created += 1;
        } else {
            summary.records_updated += 1;
        }
    }

    if summary.errors.is_empty() {
        info!(
            model = %variant,
            file = %path.display(),
            rows = summary.total_rows,
            created = summary.records_created,
            updated = summary.records_updated,
            "Import completed"
        );
    } else {
        warn!(
            model = %variant,
            file = %path.display(),
            errors = summary.errors.len(),
            "Import completed with row errors"
        );
    }

    Ok(summary)
}

struct ParsedRow {
    cell: GridCell,
    target_period: i64,
    count: f64,
    rank: Option<i64>,
}

fn parse_row(
    headers: &csv::StringRecord,
    record: &csv::StringRecord,
    variant: ModelVariant,
) -> Result<ParsedRow, String> {
    let field = |name: &str| -> Result<&str, String> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|i| record.get(i))
            .ok_or_else(|| format!("missing column '{}'", name))
    };

    let int_field = |name: &str| -> Result<i64, String> {
        let raw = field(name)?;
        raw.trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid integer '{}' in column '{}'", raw, name))
    };

    let float_field = |name: &str| -> Result<f64, String> {
        let raw = field(name)?;
        raw.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{}' in column '{}'", raw, name))
    };

    let cell = GridCell {
        grid_id: int_field("grid_id")?,
        center_longitude: float_field("center_longitude")?,
        center_latitude: float_field("center_latitude")?,
        southwest_lat: float_field("southwest_lat")?,
        southwest_lng: float_field("southwest_lng")?,
        northeast_lat: float_field("northeast_lat")?,
        northeast_lng: float_field("northeast_lng")?,
    };

    // Rank is optional: an empty cell means unranked.
    let rank = match field("Rank") {
        Ok(raw) if raw.trim().is_empty() => None,
        Ok(raw) => Some(
            raw.trim()
                .parse::<i64>()
                .map_err(|_| format!("invalid integer '{}' in column 'Rank'", raw))?,
        ),
        Err(_) => None,
    };

    Ok(ParsedRow {
        cell,
        target_period: int_field("Target_Period")?,
        count: float_field(variant.count_column())?,
        rank,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{mapped_csv, write_file};

    #[tokio::test]
    async fn test_import_then_reimport_is_idempotent() {
        let store = CrimeStore::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "mapped_mlp.csv",
            &mapped_csv(
                ModelVariant::Mlp,
                &[(1, 10, 7, 202302), (2, 11, 5, 202302), (3, 12, 2, 202302)],
            ),
        );

        let first = import_predictions_csv(&store, ModelVariant::Mlp, &path, "")
            .await
            .unwrap();
        assert_eq!(first.total_rows, 3);
        assert_eq!(first.grids_created, 3);
        assert_eq!(first.records_created, 3);
        assert_eq!(first.records_updated, 0);
        assert!(first.errors.is_empty());

        let second = import_predictions_csv(&store, ModelVariant::Mlp, &path, "")
            .await
            .unwrap();
        assert_eq!(second.records_created, 0);
        assert_eq!(second.records_updated, 3);
        assert_eq!(second.grids_created, 0);
    }

    #[tokio::test]
    async fn test_bad_rows_are_skipped_and_reported() {
        let store = CrimeStore::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut content = mapped_csv(ModelVariant::Actual, &[(1, 10, 7, 202302)]);
        content.push_str("2,eleven,5,202302,-82.4,27.3,27.29,-82.41,27.31,-82.39\n");
        let path = write_file(dir.path(), "mapped_actual.csv", &content);

        let summary = import_predictions_csv(&store, ModelVariant::Actual, &path, "")
            .await
            .unwrap();

        assert_eq!(summary.total_rows, 1);
        assert_eq!(summary.records_created, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("Row 2:"));
        assert!(summary.errors[0].contains("grid_id"));
    }

    #[tokio::test]
    async fn test_source_name_defaults_to_file_name() {
        let store = CrimeStore::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "mapped_lee.csv",
            &mapped_csv(ModelVariant::Baseline, &[(1, 10, 7, 202302)]),
        );

        let summary = import_predictions_csv(&store, ModelVariant::Baseline, &path, "")
            .await
            .unwrap();
        assert_eq!(summary.records_created, 1);
    }

    #[tokio::test]
    async fn test_missing_file_aborts() {
        let store = CrimeStore::in_memory().await.unwrap();
        let err = import_predictions_csv(
            &store,
            ModelVariant::Mlp,
            Path::new("/nonexistent/mapped_mlp.csv"),
            "",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CrimeError::FileNotFound(_)));
    }
}
