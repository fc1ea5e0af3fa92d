//! `/api/modelmanager/*`: catalog management.

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{bad_request, envelope, run_pull};
use crate::models::ModelDetails;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PullModelRequest {
    #[serde(default, rename = "modelName", alias = "model_name", alias = "name")]
    pub model_name: String,
}

/// GET /api/modelmanager/list
pub async fn list_models(State(state): State<AppState>) -> Response {
    info!("Listing all available models");
    envelope("modelmanager/list", state.gateway.list_models().await)
}

/// POST /api/modelmanager/pull
pub async fn pull_model(
    State(state): State<AppState>,
    Json(req): Json<PullModelRequest>,
) -> Response {
    run_pull(&state, "modelmanager/pull", &req.model_name).await
}

/// DELETE /api/modelmanager/:model_name
pub async fn delete_model(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
) -> Response {
    const ROUTE: &str = "modelmanager/delete";
    if model_name.trim().is_empty() {
        return bad_request::<bool>(ROUTE, "Model name is required");
    }
    info!("Deleting model: {}", model_name);
    envelope(ROUTE, state.gateway.delete_model(&model_name).await)
}

/// GET /api/modelmanager/:model_name/details
pub async fn get_model_details(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
) -> Response {
    const ROUTE: &str = "modelmanager/details";
    if model_name.trim().is_empty() {
        return bad_request::<ModelDetails>(ROUTE, "Model name is required");
    }
    info!("Getting details for model: {}", model_name);
    envelope(ROUTE, state.gateway.model_details(&model_name).await)
}

/// GET /api/modelmanager/:model_name/available
pub async fn is_model_available(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
) -> Response {
    const ROUTE: &str = "modelmanager/available";
    if model_name.trim().is_empty() {
        return bad_request::<bool>(ROUTE, "Model name is required");
    }
    envelope(ROUTE, state.gateway.is_model_available(&model_name).await)
}
