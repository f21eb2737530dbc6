//! HTTP handlers for sessions, triggers, read models and exports.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use export_pipeline::{open_sink, ExportError, ExportJob, ProgressReport};
use station_catalog::{filter_by_viewport, slider_spec};
use station_common::{
    ExplorerError, ExportStatus, MapCenter, MapState, MeasureOption, SessionId, SliderSpec,
    StationPoint, Viewport, YearWindow,
};
use storage::CacheNamespace;

use crate::dispatch::{DispatchReport, Dispatcher, HandlerOutcome, InputBundle, TriggerSource};
use crate::metrics::Timer;
use crate::state::AppState;

// ============================================================================
// Errors
// ============================================================================

/// Error response: the status mapped from the error, and `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub ExplorerError);

impl From<ExplorerError> for ApiError {
    fn from(err: ExplorerError) -> Self {
        ApiError(err)
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_session(raw: &str) -> Result<SessionId, ApiError> {
    Ok(raw.parse::<SessionId>()?)
}

// ============================================================================
// Sessions and triggers
// ============================================================================

/// Create a session and run its initial computations.
pub async fn create_session_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<DispatchReport>)> {
    let session = SessionId::new();
    let report = dispatch(&state, session, TriggerSource::Session, &InputBundle::default()).await?;

    info!(session = %session, "Session created");
    Ok((StatusCode::CREATED, Json(report)))
}

/// Dispatch a named trigger with the current control values.
pub async fn trigger_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((session, trigger)): Path<(String, String)>,
    Json(input): Json<InputBundle>,
) -> ApiResult<Json<DispatchReport>> {
    let session = parse_session(&session)?;
    let trigger: TriggerSource = trigger.parse()?;

    let report = dispatch(&state, session, trigger, &input).await?;
    Ok(Json(report))
}

async fn dispatch(
    state: &AppState,
    session: SessionId,
    trigger: TriggerSource,
    input: &InputBundle,
) -> Result<DispatchReport, ExplorerError> {
    let timer = Timer::start();
    let report = Dispatcher::new(&state.catalog, &state.cache)
        .dispatch(session, trigger, input)
        .await?;

    state.metrics.record_trigger(trigger.as_str(), timer.elapsed_us());
    for (handler, outcome) in &report.outcomes {
        state
            .metrics
            .record_handler(handler.as_str(), *outcome == HandlerOutcome::Computed);
    }
    Ok(report)
}

// ============================================================================
// Read models
// ============================================================================

pub async fn stations_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session): Path<String>,
) -> ApiResult<Json<Vec<StationPoint>>> {
    let session = parse_session(&session)?;
    Ok(Json(state.cache.get_or_default(CacheNamespace::StationMap, session).await))
}

pub async fn measure_options_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session): Path<String>,
) -> ApiResult<Json<Vec<MeasureOption>>> {
    let session = parse_session(&session)?;
    Ok(Json(state.cache.get_or_default(CacheNamespace::MeasureOptions, session).await))
}

pub async fn measure_value_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let session = parse_session(&session)?;
    Ok(Json(state.cache.get_or_default(CacheNamespace::MeasureValue, session).await))
}

/// Cached slider, or one spanning the whole catalog.
pub async fn slider_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session): Path<String>,
) -> ApiResult<Json<Option<SliderSpec>>> {
    let session = parse_session(&session)?;
    let cached: Option<SliderSpec> = state.cache.get_lenient(CacheNamespace::SliderValue, session).await;
    let spec = cached.or_else(|| state.catalog.year_bounds().map(|bounds| slider_spec(bounds, bounds)));
    Ok(Json(spec))
}

pub async fn map_center_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session): Path<String>,
) -> ApiResult<Json<MapCenter>> {
    let session = parse_session(&session)?;
    Ok(Json(state.cache.get_or_default(CacheNamespace::MapCenter, session).await))
}

// ============================================================================
// Exports
// ============================================================================

/// Body of an export start.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    pub year_range: [Option<i32>; 2],
    pub measures: Vec<String>,
    pub map: Option<MapState>,
    pub selection: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ExportAccepted {
    pub session: SessionId,
    pub years: YearWindow,
    pub stations: usize,
    pub destination: String,
}

/// Start an export of the session's stations in view.
///
/// 400 on a missing or inverted range, 409 when the session already has an
/// export running, 202 once the export task is spawned.
pub async fn start_export_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session): Path<String>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<(StatusCode, Json<ExportAccepted>)> {
    let session = parse_session(&session)?;
    let years = YearWindow::from_slider(request.year_range)
        .ok_or_else(|| ExplorerError::MissingParameter("year_range".to_string()))?;

    let mut job = ExportJob {
        session,
        stations: Default::default(),
        measures: request.measures.iter().cloned().collect(),
        years,
        destination: state.export_destination(session, years),
    };
    job.validate()?;

    let slot = match state.registry.try_acquire(session) {
        Ok(slot) => slot,
        Err(e) => {
            state.metrics.record_export_rejected();
            warn!(session = %session, "Export already running");
            return Err(e.into());
        }
    };

    let points: Vec<StationPoint> = state.cache.get_or_default(CacheNamespace::StationMap, session).await;
    let viewport = Viewport::from_map_state(request.map.as_ref(), request.selection.as_deref());
    job.stations = filter_by_viewport(&points, &viewport)
        .into_iter()
        .map(|p| p.station.clone())
        .collect();

    let mut sink = open_sink(&job.destination, state.storage.clone()).await?;
    let destination = sink.destination();

    info!(
        session = %session,
        years = %years,
        stations = job.stations.len(),
        measures = job.measures.len(),
        destination = %destination,
        "Export started"
    );
    state.metrics.record_export_started();
    state.metrics.record_active_exports(state.registry.active());

    let accepted = ExportAccepted {
        session,
        years,
        stations: job.stations.len(),
        destination,
    };

    let task_state = state.clone();
    tokio::spawn(async move {
        let timer = Timer::start();
        let result = task_state.pipeline.run(&job, sink.as_mut()).await;
        task_state
            .metrics
            .record_export_finished(result.as_ref().ok().map(|s| s.records), timer.elapsed_ms());
        drop(slot);
        task_state.metrics.record_active_exports(task_state.registry.active());
    });

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// Status of the session's latest export, `null` if none.
pub async fn export_status_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session): Path<String>,
) -> ApiResult<Json<Option<ExportStatus>>> {
    let session = parse_session(&session)?;
    Ok(Json(state.cache.get_lenient(CacheNamespace::Download, session).await))
}

#[derive(Debug, Deserialize)]
pub struct ProgressParams {
    pub begin: Option<i32>,
    pub end: Option<i32>,
}

pub async fn progress_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session): Path<String>,
    Query(params): Query<ProgressParams>,
) -> ApiResult<Json<ProgressReport>> {
    let session = parse_session(&session)?;
    let window = YearWindow::from_slider([params.begin, params.end]);
    Ok(Json(state.reporter.progress(session, window).await))
}

// ============================================================================
// Health and metrics
// ============================================================================

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Prometheus text exposition.
pub async fn metrics_handler(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    (StatusCode::OK, handle.render())
}

/// JSON metrics endpoint
pub async fn api_metrics_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "metrics": state.metrics.snapshot(),
        "catalog": {
            "records": state.catalog.len(),
            "stations": state.catalog.station_count(),
        },
        "exports_active": state.registry.active(),
    }))
}
