//! The `trigger` subcommand: kick off mapping on a running grid-api.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn trigger_mapping(
    endpoint: &str,
    model: &str,
    model_data_path: &str,
    coordinate_path: &str,
) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    info!(endpoint, model, "Triggering mapping run");

    let response = client
        .post(endpoint)
        .json(&json!({
            "model": model,
            "model_data_path": model_data_path,
            "coordinate_path": coordinate_path,
        }))
        .send()
        .await
        .with_context(|| format!("Request to {} failed", endpoint))?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.is_success() {
        info!(%status, body = %body, "Mapping run accepted");
    } else {
        warn!(%status, body = %body, "Mapping run rejected");
    }

    Ok(())
}
