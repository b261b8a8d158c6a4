//! The `build-static` subcommand: JSON snapshots of the processed CSVs.
//!
//! Snapshots mirror the HTTP API payloads so a static file host can stand
//! in for the read API. Everything is derived from the mapped CSVs and the
//! summary tables; the database is not touched.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tracing::{info, warn};

use crime_common::{metrics_payload, CrimeResult, MetricValues, ModelVariant};
use ingestion::parse_summary_table;
use mapping::{read_mapped_rows, MappedRecord};

const SNAPSHOT_VARIANTS: [ModelVariant; 3] = [
    ModelVariant::Actual,
    ModelVariant::Mlp,
    ModelVariant::Baseline,
];

#[derive(Debug, Default)]
pub struct SnapshotReport {
    pub periods: Vec<i64>,
    pub files_written: usize,
}

pub fn build_static(
    data_dir: &Path,
    processed_dir: &Path,
    output_dir: &Path,
    limit: usize,
) -> CrimeResult<SnapshotReport> {
    fs::create_dir_all(output_dir)?;

    let metrics_by_period = collect_metrics(data_dir);
    let mut report = SnapshotReport::default();

    for period in period_dirs(processed_dir) {
        let period_dir = processed_dir.join(period.to_string());

        // A snapshot needs all three models; partial periods are skipped.
        let missing: Vec<String> = SNAPSHOT_VARIANTS
            .iter()
            .map(|v| v.mapped_filename())
            .filter(|name| !period_dir.join(name).exists())
            .collect();
        if !missing.is_empty() {
            warn!(period, missing = ?missing, "Skipping period with missing mapped files");
            continue;
        }

        let payload = top_predictions_payload(&period_dir, period, limit)?;
        write_snapshot(
            output_dir,
            &format!("top_predictions_{}.json", period),
            &payload,
            &mut report,
        )?;

        report.periods.push(period);
    }

    // Metric snapshots cover every period the summary tables report,
    // whether or not mapped CSVs exist for it.
    for (period, rows) in &metrics_by_period {
        write_snapshot(
            output_dir,
            &format!("metrics_{}.json", period),
            &metrics_payload(*period, rows),
            &mut report,
        )?;
    }

    let periods_payload = available_periods_payload(&metrics_by_period);
    write_snapshot(
        output_dir,
        "available_periods.json",
        &periods_payload,
        &mut report,
    )?;

    Ok(report)
}

fn top_predictions_payload(period_dir: &Path, period: i64, limit: usize) -> CrimeResult<Value> {
    let mut data = serde_json::Map::new();
    let mut counts = serde_json::Map::new();

    for variant in SNAPSHOT_VARIANTS {
        let path = period_dir.join(variant.mapped_filename());
        let records = read_mapped_rows(&path, variant.count_column(), limit)?;

        let key = match variant {
            ModelVariant::Actual => "actual",
            ModelVariant::Mlp => "mlp",
            ModelVariant::Baseline => "baseline",
        };
        counts.insert(key.to_string(), json!(records.len()));
        data.insert(
            key.to_string(),
            Value::Array(
                records
                    .iter()
                    .map(|record| record_to_json(variant, record))
                    .collect(),
            ),
        );
    }

    Ok(json!({
        "success": true,
        "period": period,
        "data": data,
        "counts": counts,
    }))
}

fn record_to_json(variant: ModelVariant, record: &MappedRecord) -> Value {
    json!({
        "grid_id": record.grid_id,
        "center_longitude": record.center_longitude,
        "center_latitude": record.center_latitude,
        "southwest_lat": record.southwest_lat,
        "southwest_lng": record.southwest_lng,
        "northeast_lat": record.northeast_lat,
        "northeast_lng": record.northeast_lng,
        "target_period": record.target_period,
        variant.output_count_field(): record.count,
        "rank": record.rank,
    })
}

/// The period index is derived from the summary tables: periods are the
/// metric periods, and the model list carries the metric model names as
/// reported (e.g. "lee_sarasota").
fn available_periods_payload(metrics_by_period: &BTreeMap<i64, Vec<MetricValues>>) -> Value {
    let periods: Vec<i64> = metrics_by_period.keys().copied().collect();

    let details: Vec<Value> = metrics_by_period
        .iter()
        .map(|(period, rows)| {
            let mut models: Vec<&str> = rows.iter().map(|r| r.model.as_str()).collect();
            models.sort_unstable();
            models.dedup();

            json!({
                "period": period,
                "available_models": models,
                "period_label": format!("Period {}", period),
            })
        })
        .collect();

    json!({
        "success": true,
        "periods": periods,
        "periods_detail": details,
        "count": periods.len(),
    })
}

/// Summary-table metric rows under the data directory, keyed by period.
fn collect_metrics(data_dir: &Path) -> BTreeMap<i64, Vec<MetricValues>> {
    let mut by_period: BTreeMap<i64, Vec<MetricValues>> = BTreeMap::new();

    for root in [data_dir.join("mlp/results"), data_dir.join("baseline")] {
        for path in crate::run::find_files(&root, "summary_table.csv") {
            match parse_summary_table(&path) {
                Ok(rows) => {
                    for row in rows {
                        by_period.entry(row.target_period).or_default().push(row);
                    }
                }
                Err(e) => warn!(file = %path.display(), error = %e, "Skipping summary table"),
            }
        }
    }

    by_period
}

/// Numeric period directories under the processed dir, sorted ascending.
fn period_dirs(processed_dir: &Path) -> Vec<i64> {
    let Ok(entries) = fs::read_dir(processed_dir) else {
        return Vec::new();
    };

    let mut periods: Vec<i64> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_string_lossy().parse::<i64>().ok())
        .collect();
    periods.sort_unstable();
    periods
}

fn write_snapshot(
    output_dir: &Path,
    name: &str,
    payload: &Value,
    report: &mut SnapshotReport,
) -> CrimeResult<()> {
    let path = output_dir.join(name);
    fs::write(&path, serde_json::to_vec_pretty(payload)?)?;
    report.files_written += 1;
    info!(file = %path.display(), "Wrote snapshot");
    Ok(())
}
