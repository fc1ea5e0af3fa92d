//! `/api/metrics` and the Prometheus scrape endpoint.

use axum::{extract::State, response::IntoResponse, Json};

use crate::metrics::{exporter, MetricsReport, MetricsSummary};
use crate::state::AppState;

/// GET /api/metrics
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsReport> {
    exporter::inc_request("metrics", "ok");
    Json(state.metrics.report())
}

/// GET /api/metrics/summary
pub async fn get_summary(State(state): State<AppState>) -> Json<MetricsSummary> {
    exporter::inc_request("metrics/summary", "ok");
    Json(state.metrics.summary())
}

/// GET /metrics
pub async fn get_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    exporter::get_metrics(&state.metrics)
}
