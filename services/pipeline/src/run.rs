//! The `run` subcommand: discover ranking CSVs, map them, and import
//! everything the mapping produced.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crime_common::{CrimeResult, ModelVariant};
use ingestion::ImportSummary;
use mapping::{map_model, read_target_period};
use storage::CrimeStore;

pub struct RunOptions {
    pub data_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub coordinate_path: PathBuf,
    pub force: bool,
    pub skip_mapping: bool,
}

/// Outcome of one full pipeline run. Errors are collected per phase so a
/// bad file never stops the batch.
#[derive(Debug, Default)]
pub struct RunReport {
    pub mapped_files: usize,
    pub skipped_files: usize,
    pub imported_files: usize,
    pub mapping_errors: Vec<String>,
    pub import_errors: Vec<String>,
}

impl RunReport {
    pub fn has_errors(&self) -> bool {
        !self.mapping_errors.is_empty() || !self.import_errors.is_empty()
    }

    pub fn log(&self) {
        info!(
            mapped = self.mapped_files,
            skipped = self.skipped_files,
            imported = self.imported_files,
            "Pipeline run summary"
        );
        for error in &self.mapping_errors {
            warn!(error = %error, "Mapping error");
        }
        for error in &self.import_errors {
            warn!(error = %error, "Import error");
        }
    }
}

pub async fn run_pipeline(store: &CrimeStore, options: &RunOptions) -> CrimeResult<RunReport> {
    let mut report = RunReport::default();

    if options.skip_mapping {
        info!("Skipping the mapping phase");
    } else {
        run_mapping_phase(options, &mut report);
    }

    run_import_phase(store, options, &mut report).await?;
    run_metric_phase(store, options, &mut report).await?;

    Ok(report)
}

fn run_mapping_phase(options: &RunOptions, report: &mut RunReport) {
    for (variant, root) in [
        (ModelVariant::Mlp, options.data_dir.join("mlp/results")),
        (ModelVariant::Baseline, options.data_dir.join("baseline")),
    ] {
        for path in find_files(&root, "grid_ranking.csv") {
            if !options.force && mapped_outputs_exist(&path, variant, &options.processed_dir) {
                info!(file = %path.display(), "Mapped outputs exist, skipping");
                report.skipped_files += 1;
                continue;
            }

            match map_model(&path, &options.coordinate_path, variant, &options.processed_dir) {
                Ok(outputs) => report.mapped_files += outputs.len(),
                Err(e) => {
                    report
                        .mapping_errors
                        .push(format!("{}: {}", path.display(), e));
                }
            }
        }
    }
}

/// True when every mapped output this ranking file would produce is
/// already on disk. An ML export produces the actual file as well.
fn mapped_outputs_exist(ranking_path: &Path, variant: ModelVariant, processed_dir: &Path) -> bool {
    let Some(period) = read_target_period(ranking_path) else {
        return false;
    };
    let period_dir = processed_dir.join(period);

    let mut expected = vec![variant.mapped_filename()];
    if variant == ModelVariant::Mlp {
        expected.push(ModelVariant::Actual.mapped_filename());
    }

    expected.iter().all(|name| period_dir.join(name).exists())
}

async fn run_import_phase(
    store: &CrimeStore,
    options: &RunOptions,
    report: &mut RunReport,
) -> CrimeResult<()> {
    for variant in [
        ModelVariant::Actual,
        ModelVariant::Mlp,
        ModelVariant::Baseline,
    ] {
        for path in find_files(&options.processed_dir, &variant.mapped_filename()) {
            let source = relative_name(&path, &options.processed_dir);

            match ingestion::import_predictions_csv(store, variant, &path, &source).await {
                Ok(summary) => {
                    report.imported_files += 1;
                    report
                        .import_errors
                        .extend(prefixed_errors(&path, &summary));
                    log_import(&path, &summary);
                }
                Err(e) => {
                    report
                        .import_errors
                        .push(format!("{}: {}", path.display(), e));
                }
            }
        }
    }

    Ok(())
}

async fn run_metric_phase(
    store: &CrimeStore,
    options: &RunOptions,
    report: &mut RunReport,
) -> CrimeResult<()> {
    for root in [
        options.data_dir.join("mlp/results"),
        options.data_dir.join("baseline"),
    ] {
        for path in find_files(&root, "summary_table.csv") {
            match ingestion::import_metrics_csv(store, &path).await {
                Ok(summary) => {
                    report.imported_files += 1;
                    report
                        .import_errors
                        .extend(prefixed_errors(&path, &summary));
                    log_import(&path, &summary);
                }
                Err(e) => {
                    report
                        .import_errors
                        .push(format!("{}: {}", path.display(), e));
                }
            }
        }
    }

    Ok(())
}

/// All files named `name` under `root`, sorted for a stable import order.
pub(crate) fn find_files(root: &Path, name: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == name)
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn relative_name(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn prefixed_errors(path: &Path, summary: &ImportSummary) -> Vec<String> {
    summary
        .errors
        .iter()
        .map(|e| format!("{}: {}", path.display(), e))
        .collect()
}

pub fn log_import(path: &Path, summary: &ImportSummary) {
    if summary.errors.is_empty() {
        info!(
            file = %path.display(),
            rows = summary.total_rows,
            created = summary.records_created,
            updated = summary.records_updated,
            grids_created = summary.grids_created,
            "Imported"
        );
    } else {
        warn!(
            file = %path.display(),
            rows = summary.total_rows,
            created = summary.records_created,
            updated = summary.records_updated,
            errors = summary.errors.len(),
            "Imported with row errors"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{coordinate_csv, ranking_csv, summary_table_csv, write_file, RankingRow};

    fn baseline_rows() -> Vec<RankingRow> {
        vec![
            RankingRow {
                rank: 1,
                grid_id: 1,
                count: 7.0,
                target_period: 202302,
            },
            RankingRow {
                rank: 2,
                grid_id: 2,
                count: 4.0,
                target_period: 202302,
            },
        ]
    }

    fn seed_data_dir(root: &Path) -> RunOptions {
        let baseline_dir = root.join("data/baseline");
        std::fs::create_dir_all(&baseline_dir).unwrap();
        write_file(
            &baseline_dir,
            "grid_ranking.csv",
            &ranking_csv(ModelVariant::Baseline, &baseline_rows()),
        );
        write_file(
            &baseline_dir,
            "summary_table.csv",
            &summary_table_csv(&[("lee_sarasota", "1 Month", 202302, 68.4, 66.5)]),
        );

        let coordinate_dir = root.join("coordinate");
        std::fs::create_dir_all(&coordinate_dir).unwrap();
        let coordinate_path = write_file(
            &coordinate_dir,
            "coordinate.csv",
            &coordinate_csv(&[(1, -82.53, 27.33), (2, -82.52, 27.34)]),
        );

        RunOptions {
            data_dir: root.join("data"),
            processed_dir: root.join("processed_data"),
            coordinate_path,
            force: false,
            skip_mapping: false,
        }
    }

    #[tokio::test]
    async fn test_run_maps_and_imports_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let options = seed_data_dir(dir.path());
        let store = CrimeStore::in_memory().await.unwrap();

        let report = run_pipeline(&store, &options).await.unwrap();

        assert!(!report.has_errors(), "{:?}", report);
        assert_eq!(report.mapped_files, 1);
        assert_eq!(report.imported_files, 2); // mapped_lee.csv + summary_table.csv
        assert!(options
            .processed_dir
            .join("202302/mapped_lee.csv")
            .exists());

        let rows = store
            .top_predictions(ModelVariant::Baseline, 202302, 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].grid_id, 1);
    }

    #[tokio::test]
    async fn test_rerun_skips_mapping_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let options = seed_data_dir(dir.path());
        let store = CrimeStore::in_memory().await.unwrap();

        run_pipeline(&store, &options).await.unwrap();
        let second = run_pipeline(&store, &options).await.unwrap();

        assert_eq!(second.mapped_files, 0);
        assert_eq!(second.skipped_files, 1);
    }

    #[tokio::test]
    async fn test_force_remaps() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = seed_data_dir(dir.path());
        let store = CrimeStore::in_memory().await.unwrap();

        run_pipeline(&store, &options).await.unwrap();

        options.force = true;
        let second = run_pipeline(&store, &options).await.unwrap();
        assert_eq!(second.mapped_files, 1);
        assert_eq!(second.skipped_files, 0);
    }

    #[tokio::test]
    async fn test_mapping_errors_are_collected_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let options = seed_data_dir(dir.path());
        // Break the coordinate file so mapping fails.
        std::fs::write(&options.coordinate_path, "wrong,header\n1,2\n").unwrap();
        let store = CrimeStore::in_memory().await.unwrap();

        let report = run_pipeline(&store, &options).await.unwrap();

        assert_eq!(report.mapped_files, 0);
        assert_eq!(report.mapping_errors.len(), 1);
        // The metric import still ran.
        assert_eq!(report.imported_files, 1);
    }
}
