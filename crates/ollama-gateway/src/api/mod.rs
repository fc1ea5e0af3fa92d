// ollama-gateway/src/api/mod.rs
//! HTTP handlers. Each one validates its input, calls the gateway and wraps the envelope.

pub mod chat_api;
pub mod health_api;
pub mod metrics_api;
pub mod model_api;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::metrics::exporter;
use crate::models::ApiResponse;
use crate::state::AppState;

pub use chat_api::{generate, get_models, pull_model as chat_pull_model};
pub use health_api::{check as health_check, detailed_check as health_detailed};
pub use metrics_api::{get_metrics, get_prometheus, get_summary};
pub use model_api::{delete_model, get_model_details, is_model_available, list_models, pull_model};

pub(crate) fn status_label(success: bool) -> &'static str {
    if success { "ok" } else { "error" }
}

pub(crate) fn bad_request<T: Serialize>(route: &str, message: &str) -> Response {
    exporter::inc_request(route, "bad_request");
    (StatusCode::BAD_REQUEST, Json(ApiResponse::<T>::fail(message))).into_response()
}

/// Envelope as a 200 response, counted under `route`.
pub(crate) fn envelope<T: Serialize>(route: &str, result: ApiResponse<T>) -> Response {
    exporter::inc_request(route, status_label(result.success));
    Json(result).into_response()
}

/// Pull shared by the chat and model-manager routes; progress goes to the log.
pub(crate) async fn run_pull(state: &AppState, route: &str, model_name: &str) -> Response {
    if model_name.trim().is_empty() {
        return bad_request::<bool>(route, "Model name is required");
    }

    info!("Pulling model: {}", model_name);
    let _guard = exporter::PullGuard::start();
    let result = state
        .gateway
        .pull_model(model_name, |status| {
            info!("Pull progress for {}: {}", model_name, status);
        })
        .await;

    envelope(route, result)
}
