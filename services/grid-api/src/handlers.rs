//! HTTP request handlers.
//!
//! Handlers are thin wrappers over plain async functions returning
//! `CrimeResult<serde_json::Value>`, so the response logic is testable
//! without HTTP plumbing. Errors map to a JSON body with the error's
//! status code; nothing retries.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crime_common::{metrics_payload, CrimeError, CrimeResult, ModelVariant, TargetPeriod};
use storage::PredictionRow;

use crate::state::AppState;

const DEFAULT_TOP_LIMIT: i64 = 50;

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(_) => (StatusCode::OK, "Ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
    }
}

// ============================================================================
// Top predictions
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TopParams {
    period: Option<String>,
    limit: Option<i64>,
}

pub async fn top_predictions_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<TopParams>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_TOP_LIMIT);
    into_json_response(top_predictions(&state, params.period.as_deref(), limit).await)
}

pub(crate) async fn top_predictions(
    state: &AppState,
    period: Option<&str>,
    limit: i64,
) -> CrimeResult<Value> {
    let period = parse_period_param(period)?;

    let actual = state
        .store
        .top_predictions(ModelVariant::Actual, period, limit)
        .await?;
    let mlp = state
        .store
        .top_predictions(ModelVariant::Mlp, period, limit)
        .await?;
    let baseline = state
        .store
        .top_predictions(ModelVariant::Baseline, period, limit)
        .await?;

    Ok(json!({
        "success": true,
        "period": period,
        "data": {
            "actual": rows_to_json(ModelVariant::Actual, &actual),
            "mlp": rows_to_json(ModelVariant::Mlp, &mlp),
            "baseline": rows_to_json(ModelVariant::Baseline, &baseline),
        },
        "counts": {
            "actual": actual.len(),
            "mlp": mlp.len(),
            "baseline": baseline.len(),
        },
    }))
}

/// Serialize fact rows with the variant-specific count field name.
/// Integer-count variants are emitted as integers.
fn rows_to_json(variant: ModelVariant, rows: &[PredictionRow]) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            let count: Value = if variant == ModelVariant::Baseline {
                json!(row.count)
            } else {
                json!(row.count as i64)
            };

            json!({
                "grid_id": row.grid_id,
                "center_longitude": row.center_longitude,
                "center_latitude": row.center_latitude,
                "southwest_lat": row.southwest_lat,
                "southwest_lng": row.southwest_lng,
                "northeast_lat": row.northeast_lat,
                "northeast_lng": row.northeast_lng,
                "target_period": row.target_period,
                variant.output_count_field(): count,
                "rank": row.rank,
            })
        })
        .collect()
}

// ============================================================================
// Metrics
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    period: Option<String>,
}

pub async fn metrics_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<MetricsParams>,
) -> Response {
    into_json_response(metrics(&state, params.period.as_deref()).await)
}

pub(crate) async fn metrics(state: &AppState, period: Option<&str>) -> CrimeResult<Value> {
    let period = parse_period_param(period)?;
    let rows = state.store.metrics_for_period(period).await?;
    Ok(metrics_payload(period, &rows))
}

// ============================================================================
// Available periods
// ============================================================================

pub async fn periods_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    into_json_response(available_periods(&state).await)
}

pub(crate) async fn available_periods(state: &AppState) -> CrimeResult<Value> {
    let details = state.store.available_periods().await?;

    let periods: Vec<i64> = details.iter().map(|d| d.period).collect();
    let periods_detail: Vec<Value> = details
        .iter()
        .map(|d| {
            json!({
                "period": d.period,
                "available_models": d.available_models,
                "period_label": format!("Period {}", d.period),
            })
        })
        .collect();

    Ok(json!({
        "success": true,
        "periods": periods,
        "periods_detail": periods_detail,
        "count": details.len(),
    }))
}

// ============================================================================
// On-demand mapping
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MappingRunRequest {
    pub model: String,
    pub model_data_path: String,
    pub coordinate_path: String,
}

pub async fn run_mapping_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<MappingRunRequest>,
) -> Response {
    into_json_response(run_mapping(&state, request).await)
}

pub(crate) async fn run_mapping(
    state: &AppState,
    request: MappingRunRequest,
) -> CrimeResult<Value> {
    let variant = ModelVariant::from_str(&request.model)?;
    let model_path = PathBuf::from(request.model_data_path);
    let coordinate_path = PathBuf::from(request.coordinate_path);
    let processed_dir = state.processed_dir.clone();

    let outputs = tokio::task::spawn_blocking(move || {
        mapping::map_model(&model_path, &coordinate_path, variant, &processed_dir)
    })
    .await
    .map_err(|e| CrimeError::Internal(format!("mapping task failed: {}", e)))??;

    let outputs: Vec<Value> = outputs
        .iter()
        .map(|out| {
            json!({
                "model": out.variant.as_str(),
                "period": out.period,
                "rows": out.rows,
                "path": out.path.display().to_string(),
            })
        })
        .collect();

    Ok(json!({ "success": true, "outputs": outputs }))
}

// ============================================================================
// Shared helpers
// ============================================================================

fn parse_period_param(period: Option<&str>) -> CrimeResult<i64> {
    let raw = period.ok_or_else(|| {
        CrimeError::MissingParameter("period (e.g., ?period=202302)".to_string())
    })?;

    Ok(TargetPeriod::from_str(raw)?.as_i64())
}

fn into_json_response(result: CrimeResult<Value>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            let status = StatusCode::from_u16(err.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                error!(error = %err, "Request failed");
            }
            (
                status,
                Json(json!({ "success": false, "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
