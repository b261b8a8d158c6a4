//! Read API for the crime-grid dashboard.
//!
//! Serves top-ranked predictions per period, model metric comparisons,
//! the list of available periods, and an on-demand mapping endpoint.

pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Build the service router with all routes and layers attached.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health checks
        .route("/health", get(handlers::health_handler))
        .route("/ready", get(handlers::ready_handler))
        // Read API
        .route(
            "/api/predictions/top",
            get(handlers::top_predictions_handler),
        )
        .route("/api/metrics", get(handlers::metrics_handler))
        .route("/api/periods", get(handlers::periods_handler))
        // On-demand mapping (called by the pipeline trigger)
        .route("/api/mapping/run", post(handlers::run_mapping_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
