//! Metric importer: summary-statistics CSVs into per-(model, period) rows.

use std::path::Path;

use tracing::{info, warn};

use crime_common::{CrimeError, CrimeResult, MetricValues, TargetPeriod};
use storage::CrimeStore;

use crate::summary::ImportSummary;

/// Import a summary-statistics CSV.
///
/// Only `model`, `period`, `pei_percent`, and `accuracy_percent` are used;
/// the reporter writes several other columns that are ignored. The
/// `period` cell is a label like "1 Month": the leading integer is taken,
/// an empty label becomes period 0, and a non-numeric label falls back to
/// the row number.
pub async fn import_metrics_csv(store: &CrimeStore, path: &Path) -> CrimeResult<ImportSummary> {
    if !path.exists() {
        return Err(CrimeError::FileNotFound(path.display().to_string()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut summary = ImportSummary::default();

    for (row_num, record) in reader.records().enumerate() {
        let row_num = row_num + 1;
        let record = record?;

        let metric = match parse_metric_row(&headers, &record, row_num) {
            Ok(metric) => metric,
            Err(message) => {
                summary.record_error(row_num, message);
                continue;
            }
        };
        summary.total_rows += 1;

        if store.upsert_metric(&metric).await? {
            summary.records_created += 1;
        } else {
            summary.records_updated += 1;
        }
    }

    if summary.errors.is_empty() {
        info!(
            file = %path.display(),
            rows = summary.total_rows,
            created = summary.records_created,
            updated = summary.records_updated,
            "Metric import completed"
        );
    } else {
        warn!(
            file = %path.display(),
            errors = summary.errors.len(),
            "Metric import completed with row errors"
        );
    }

    Ok(summary)
}

fn parse_metric_row(
    headers: &csv::StringRecord,
    record: &csv::StringRecord,
    row_num: usize,
) -> Result<MetricValues, String> {
    let field = |name: &str| -> Option<&str> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|i| record.get(i))
    };

    // Missing or empty percentage cells default to 0; present but
    // unparsable cells are row errors.
    let percent_field = |name: &str| -> Result<f64, String> {
        match field(name) {
            None => Ok(0.0),
            Some(raw) if raw.trim().is_empty() => Ok(0.0),
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid number '{}' in column '{}'", raw, name)),
        }
    };

    let model = field("model").unwrap_or_default().trim().to_string();
    let label = field("period").unwrap_or_default().trim().to_string();

    let target_period = if label.is_empty() {
        0
    } else {
        TargetPeriod::from_label(&label)
            .map(|p| p.as_i64())
            .unwrap_or(row_num as i64)
    };

    Ok(MetricValues {
        model,
        target_period,
        pei_percent: percent_field("pei_percent")?,
        accuracy_percent: percent_field("accuracy_percent")?,
    })
}

/// Parse a summary table for the static snapshot builder.
///
/// Unlike the database importer, the snapshot builder keys metrics by the
/// `target_periods` column (YYYYMM), falling back to `Target_Period`;
/// rows without one are skipped.
pub fn parse_summary_table(path: &Path) -> CrimeResult<Vec<MetricValues>> {
    if !path.exists() {
        return Err(CrimeError::FileNotFound(path.display().to_string()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |name: &str| -> Option<&str> {
            headers
                .iter()
                .position(|h| h == name)
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let Some(period) = field("target_periods")
            .or_else(|| field("Target_Period"))
            .and_then(|v| v.parse::<f64>().ok())
        else {
            continue;
        };

        rows.push(MetricValues {
            model: field("model").unwrap_or_default().to_string(),
            target_period: period as i64,
            pei_percent: field("pei_percent")
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(0.0),
            accuracy_percent: field("accuracy_percent")
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(0.0),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{summary_table_csv, write_file};

    #[tokio::test]
    async fn test_metric_import_extracts_period_label() {
        let store = CrimeStore::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "summary_table.csv",
            &summary_table_csv(&[
                ("mlp_sarasota", "1 Month", 202302, 71.2, 64.0),
                ("lee_sarasota", "1 Month", 202302, 68.4, 66.5),
            ]),
        );

        let summary = import_metrics_csv(&store, &path).await.unwrap();
        assert_eq!(summary.records_created, 2);
        assert!(summary.errors.is_empty());

        let metrics = store.metrics_for_period(1).await.unwrap();
        assert_eq!(metrics.len(), 2);
    }

    #[tokio::test]
    async fn test_metric_reimport_updates() {
        let store = CrimeStore::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "summary_table.csv",
            &summary_table_csv(&[("mlp_sarasota", "1 Month", 202302, 71.2, 64.0)]),
        );

        import_metrics_csv(&store, &path).await.unwrap();
        let second = import_metrics_csv(&store, &path).await.unwrap();

        assert_eq!(second.records_created, 0);
        assert_eq!(second.records_updated, 1);
    }

    #[tokio::test]
    async fn test_non_numeric_label_falls_back_to_row_number() {
        let store = CrimeStore::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "summary_table.csv",
            &summary_table_csv(&[("mlp_sarasota", "quarterly", 202302, 50.0, 50.0)]),
        );

        import_metrics_csv(&store, &path).await.unwrap();

        // First row -> period 1.
        let metrics = store.metrics_for_period(1).await.unwrap();
        assert_eq!(metrics.len(), 1);
    }

    #[test]
    fn test_summary_table_uses_target_periods_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "summary_table.csv",
            &summary_table_csv(&[
                ("mlp_sarasota", "1 Month", 202302, 71.2, 64.0),
                ("lee_sarasota", "1 Month", 202302, 68.4, 66.5),
            ]),
        );

        let rows = parse_summary_table(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].target_period, 202302);
        assert_eq!(rows[0].model, "mlp_sarasota");
    }
}
