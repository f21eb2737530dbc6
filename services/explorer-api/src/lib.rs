//! Station explorer API service library.
//!
//! This module exposes the internal modules for testing purposes.

pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod metrics;
pub mod state;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the service router.
pub fn create_router(state: Arc<AppState>, prometheus_handle: PrometheusHandle) -> Router {
    Router::new()
        // Sessions and triggers
        .route("/sessions", post(handlers::create_session_handler))
        .route("/sessions/:id/triggers/:trigger", post(handlers::trigger_handler))
        // Read models
        .route("/sessions/:id/stations", get(handlers::stations_handler))
        .route("/sessions/:id/measure-options", get(handlers::measure_options_handler))
        .route("/sessions/:id/measure-value", get(handlers::measure_value_handler))
        .route("/sessions/:id/slider", get(handlers::slider_handler))
        .route("/sessions/:id/map-center", get(handlers::map_center_handler))
        // Exports
        .route(
            "/sessions/:id/exports",
            post(handlers::start_export_handler).get(handlers::export_status_handler),
        )
        .route("/sessions/:id/progress", get(handlers::progress_handler))
        // Health check
        .route("/health", get(handlers::health_handler))
        // Metrics
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/metrics", get(handlers::api_metrics_handler))
        // Layer extensions
        .layer(Extension(state))
        .layer(Extension(prometheus_handle))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
