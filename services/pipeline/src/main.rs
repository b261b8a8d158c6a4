//! Crime-grid pipeline CLI.
//!
//! Orchestrates the batch flow: map ranking CSVs against the coordinate
//! table, import the mapped outputs and metric summaries into the store,
//! build static JSON snapshots, and trigger on-demand mapping over HTTP.

mod run;
mod snapshot;
mod trigger;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crime_common::ModelVariant;
use storage::CrimeStore;

#[derive(Parser, Debug)]
#[command(name = "pipeline")]
#[command(about = "Crime-grid mapping and import pipeline")]
struct Args {
    /// Database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:crime_grids.db")]
    database_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline: map every ranking CSV, then import the
    /// mapped outputs and metric summaries
    Run {
        /// Root of the raw data directory tree
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Directory for per-period mapped outputs
        #[arg(long, default_value = "processed_data")]
        processed_dir: PathBuf,

        /// Grid coordinate table
        #[arg(long, default_value = "coordinate/coordinate.csv")]
        coordinate_path: PathBuf,

        /// Re-map even when the mapped outputs already exist
        #[arg(long)]
        force: bool,

        /// Import existing mapped outputs without re-mapping
        #[arg(long)]
        skip_mapping: bool,
    },

    /// Import a single mapped CSV into the store
    ImportPredictions {
        /// Mapped CSV to import
        file: PathBuf,

        /// Model variant (actual, mlp, lee)
        #[arg(long)]
        variant: ModelVariant,

        /// Source name recorded on each row (defaults to the file name)
        #[arg(long)]
        source: Option<String>,
    },

    /// Import a metric summary table into the store
    ImportMetrics {
        #[arg(long, default_value = "data/baseline/summary_table.csv")]
        path: PathBuf,
    },

    /// Build static JSON snapshots from the processed CSVs, without
    /// touching the database
    BuildStatic {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        #[arg(long, default_value = "processed_data")]
        processed_dir: PathBuf,

        /// Directory the JSON files are written to
        #[arg(long, default_value = "static_data")]
        output_dir: PathBuf,

        /// Rows per model in each snapshot
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Rerank an ML results CSV by actual counts and split it into
    /// per-period actual-crime CSVs
    SplitActual {
        /// ML results CSV carrying an Actual_Crime_Count column
        file: PathBuf,

        #[arg(long, default_value = "data/actual")]
        output_dir: PathBuf,
    },

    /// POST a mapping request to a running grid-api instance
    Trigger {
        #[arg(long, default_value = "http://localhost:8080/api/mapping/run")]
        endpoint: String,

        #[arg(long, default_value = "lee")]
        model: String,

        #[arg(long, default_value = "data/baseline/grid_ranking.csv")]
        model_data_path: String,

        #[arg(long, default_value = "coordinate/coordinate.csv")]
        coordinate_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Run {
            data_dir,
            processed_dir,
            coordinate_path,
            force,
            skip_mapping,
        } => {
            let store = CrimeStore::connect(&args.database_url).await?;
            let options = run::RunOptions {
                data_dir,
                processed_dir,
                coordinate_path,
                force,
                skip_mapping,
            };
            let report = run::run_pipeline(&store, &options).await?;
            report.log();

            if report.has_errors() {
                warn!("Pipeline completed with errors");
            } else {
                info!("Pipeline completed");
            }
        }

        Command::ImportPredictions {
            file,
            variant,
            source,
        } => {
            let store = CrimeStore::connect(&args.database_url).await?;
            let source = source.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

            let summary =
                ingestion::import_predictions_csv(&store, variant, &file, &source).await?;
            run::log_import(&file, &summary);
        }

        Command::ImportMetrics { path } => {
            let store = CrimeStore::connect(&args.database_url).await?;
            let summary = ingestion::import_metrics_csv(&store, &path).await?;
            run::log_import(&path, &summary);
        }

        Command::BuildStatic {
            data_dir,
            processed_dir,
            output_dir,
            limit,
        } => {
            let report = snapshot::build_static(&data_dir, &processed_dir, &output_dir, limit)?;
            info!(
                periods = report.periods.len(),
                files = report.files_written,
                output = %output_dir.display(),
                "Static snapshots built"
            );
        }

        Command::SplitActual { file, output_dir } => {
            let splits = mapping::process_actual_export(&file, &output_dir)?;
            for split in &splits {
                info!(
                    period = split.period,
                    rows = split.rows,
                    file = %split.path.display(),
                    "Wrote actual-crime split"
                );
            }
        }

        Command::Trigger {
            endpoint,
            model,
            model_data_path,
            coordinate_path,
        } => {
            trigger::trigger_mapping(&endpoint, &model, &model_data_path, &coordinate_path)
                .await?;
        }
    }

    Ok(())
}
