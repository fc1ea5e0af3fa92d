//! Composition root: wires config, metrics and gateway together and serves the router.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{header::HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use crate::{
    api,
    config::Config,
    gateway::OllamaGateway,
    metrics::{exporter, MetricsAggregator},
    models::ApiResponse,
    state::AppState,
};

pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    if let Err(e) = crate::telemetry::init_tracing() {
        debug!("Keeping the existing tracing subscriber: {}", e);
    }
    exporter::init_metrics();
    cfg.print_config();

    let metrics = Arc::new(MetricsAggregator::with_window(cfg.metrics_window));
    let gateway = Arc::new(
        OllamaGateway::new(&cfg, metrics).context("Failed to build upstream HTTP clients")?,
    );
    let state = AppState::new(gateway);

    let addr = cfg.api_addr()?;
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let app = build_router(state, &cfg);
    axum::serve(listener, app).await?;

    Ok(())
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!("Unhandled panic in request handler: {}", detail);
    exporter::inc_request("panic", "error");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::fail("Internal server error occurred")),
    )
        .into_response()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(parsed))
}

pub fn build_router(state: AppState, cfg: &Config) -> Router {
    Router::new()
        .route("/api/chat/generate", post(api::generate))
        .route("/api/chat/models", get(api::get_models))
        .route("/api/chat/pull-model", post(api::chat_pull_model))
        .route("/api/modelmanager/list", get(api::list_models))
        .route("/api/modelmanager/pull", post(api::pull_model))
        .route("/api/modelmanager/:model_name", delete(api::delete_model))
        .route("/api/modelmanager/:model_name/details", get(api::get_model_details))
        .route("/api/modelmanager/:model_name/available", get(api::is_model_available))
        .route("/api/metrics", get(api::get_metrics))
        .route("/api/metrics/summary", get(api::get_summary))
        .route("/api/health", get(api::health_check))
        .route("/api/health/detailed", get(api::health_detailed))
        .route("/metrics", get(api::get_prometheus))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors_layer(&cfg.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(cfg.request_timeout()))
        .with_state(state)
}
