//! Per-model extraction from ranking CSVs.

use std::cmp::Ordering;
use std::path::Path;

use crime_common::{CrimeError, CrimeResult, ModelVariant};

/// One extracted ranking row, still in raw floating-point form.
///
/// Coercion to integers happens at the join stage so that the lossy
/// truncation rule lives in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCount {
    pub rank: f64,
    pub grid_id: f64,
    pub count: f64,
    pub target_period: f64,
}

/// Read a ranking CSV and select the columns for the given variant.
///
/// Baseline and ML rows keep the rank from the file. Actual rows re-derive
/// it: counts are sorted descending with a stable sort, so ties keep their
/// input order, and rank is the 1-based position. Rows are then ordered by
/// rank ascending and truncated to `limit`.
pub fn extract_model_rows(
    path: &Path,
    variant: ModelVariant,
    limit: usize,
) -> CrimeResult<Vec<RankedCount>> {
    if !path.exists() {
        return Err(CrimeError::FileNotFound(path.display().to_string()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let rank_idx = column_index(&headers, "Rank")?;
    let grid_idx = column_index(&headers, "grid_id")?;
    let count_idx = column_index(&headers, variant.count_column())?;
    let period_idx = column_index(&headers, "Target_Period")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(RankedCount {
            rank: parse_field(&record, rank_idx, "Rank")?,
            grid_id: parse_field(&record, grid_idx, "grid_id")?,
            count: parse_field(&record, count_idx, variant.count_column())?,
            target_period: parse_field(&record, period_idx, "Target_Period")?,
        });
    }

    if variant.rerank_from_counts() {
        // Stable sort: ties keep input order.
        rows.sort_by(|a, b| b.count.partial_cmp(&a.count).unwrap_or(Ordering::Equal));
        for (idx, row) in rows.iter_mut().enumerate() {
            row.rank = (idx + 1) as f64;
        }
    }

    rows.sort_by(|a, b| a.rank.partial_cmp(&b.rank).unwrap_or(Ordering::Equal));
    rows.truncate(limit);

    Ok(rows)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> CrimeResult<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| CrimeError::MissingColumn(name.to_string()))
}

fn parse_field(record: &csv::StringRecord, idx: usize, column: &str) -> CrimeResult<f64> {
    let raw = record.get(idx).ok_or_else(|| CrimeError::InvalidValue {
        column: column.to_string(),
        message: "row is shorter than the header".to_string(),
    })?;

    raw.trim()
        .parse::<f64>()
        .map_err(|_| CrimeError::InvalidValue {
            column: column.to_string(),
            message: format!("'{}' is not numeric", raw),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{ranking_csv, write_file, RankingRow};

    fn row(rank: i64, grid_id: i64, count: f64) -> RankingRow {
        RankingRow {
            rank,
            grid_id,
            count,
            target_period: 202302,
        }
    }

    #[test]
    fn test_baseline_keeps_file_rank() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "grid_ranking.csv",
            &ranking_csv(ModelVariant::Baseline, &[row(2, 10, 4.0), row(1, 11, 9.0)]),
        );

        let rows = extract_model_rows(&path, ModelVariant::Baseline, 100).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1.0);
        assert_eq!(rows[0].grid_id, 11.0);
        assert_eq!(rows[1].rank, 2.0);
    }

    #[test]
    fn test_actual_reranks_descending_with_stable_ties() {
        let dir = tempfile::tempdir().unwrap();
        // grid 20 and 30 tie on count; 20 comes first in the file.
        let path = write_file(
            dir.path(),
            "grid_ranking.csv",
            &ranking_csv(
                ModelVariant::Actual,
                &[row(99, 20, 5.0), row(98, 30, 5.0), row(97, 40, 8.0)],
            ),
        );

        let rows = extract_model_rows(&path, ModelVariant::Actual, 100).unwrap();

        assert_eq!(rows[0].grid_id, 40.0);
        assert_eq!(rows[0].rank, 1.0);
        assert_eq!(rows[1].grid_id, 20.0);
        assert_eq!(rows[1].rank, 2.0);
        assert_eq!(rows[2].grid_id, 30.0);
        assert_eq!(rows[2].rank, 3.0);
    }

    #[test]
    fn test_limit_truncates_after_rank_sort() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "grid_ranking.csv",
            &ranking_csv(
                ModelVariant::Mlp,
                &[row(3, 1, 1.0), row(1, 2, 7.0), row(2, 3, 5.0)],
            ),
        );

        let rows = extract_model_rows(&path, ModelVariant::Mlp, 2).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1.0);
        assert_eq!(rows[1].rank, 2.0);
    }

    #[test]
    fn test_missing_count_column() {
        let dir = tempfile::tempdir().unwrap();
        // A baseline file does not carry the ML count column.
        let path = write_file(
            dir.path(),
            "grid_ranking.csv",
            &ranking_csv(ModelVariant::Baseline, &[row(1, 1, 1.0)]),
        );

        let err = extract_model_rows(&path, ModelVariant::Mlp, 100).unwrap_err();
        assert!(matches!(err, CrimeError::MissingColumn(c) if c == "Predicted_Crime_Count"));
    }
}
