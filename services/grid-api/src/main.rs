//! Crime-grid read API service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use grid_api::{build_router, state::AppState};

#[derive(Parser, Debug)]
#[command(name = "grid-api")]
#[command(about = "Read API for crime-grid predictions and metrics")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:crime_grids.db")]
    database_url: String,

    /// Directory where mapped per-period CSVs are written
    #[arg(long, env = "PROCESSED_DIR", default_value = "processed_data")]
    processed_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("Starting grid-api");
    info!("Database: {}", args.database_url);
    info!("Processed dir: {}", args.processed_dir.display());

    let state = Arc::new(AppState::new(&args.database_url, args.processed_dir).await?);
    let app = build_router(state);

    info!("Listening on {}", args.listen);
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
