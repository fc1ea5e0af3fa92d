//! `/api/chat/*`: generation and the chat-side model shortcuts.

use axum::{extract::State, response::Response, Json};
use tracing::info;

use super::{bad_request, envelope, run_pull};
use crate::models::{ChatRequest, ChatResponse};
use crate::state::AppState;

const ROUTE_GENERATE: &str = "chat/generate";
const ROUTE_MODELS: &str = "chat/models";
const ROUTE_PULL: &str = "chat/pull-model";

/// POST /api/chat/generate
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Response {
    if req.prompt.trim().is_empty() {
        return bad_request::<ChatResponse>(ROUTE_GENERATE, "Prompt is required");
    }

    info!("Processing chat request for model: {}", req.model);
    let result = state.gateway.generate(&req).await;
    envelope(ROUTE_GENERATE, result)
}

/// GET /api/chat/models
pub async fn get_models(State(state): State<AppState>) -> Response {
    info!("Fetching available models");
    envelope(ROUTE_MODELS, state.gateway.list_models().await)
}

/// POST /api/chat/pull-model, body is the bare JSON string model name.
pub async fn pull_model(
    State(state): State<AppState>,
    Json(model_name): Json<String>,
) -> Response {
    run_pull(&state, ROUTE_PULL, &model_name).await
}
