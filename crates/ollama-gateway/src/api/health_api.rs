//! `/api/health`: upstream reachability.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub ollama: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub ollama: OllamaHealth,
    pub system: HostInfo,
}

#[derive(Debug, Serialize)]
pub struct OllamaHealth {
    pub status: &'static str,
    pub models_available: usize,
    pub last_checked: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HostInfo {
    pub environment: String,
    pub host_name: String,
    pub processor_count: usize,
    pub memory_usage_mb: u64,
}

fn labels(healthy: bool) -> (&'static str, &'static str, StatusCode) {
    if healthy {
        ("Healthy", "Connected", StatusCode::OK)
    } else {
        ("Unhealthy", "Disconnected", StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// GET /api/health
pub async fn check(State(state): State<AppState>) -> Response {
    let healthy = state.gateway.is_healthy().await;
    let (status, ollama, code) = labels(healthy);

    if healthy {
        info!("Health check passed");
    } else {
        warn!("Health check failed - Ollama service unavailable");
    }

    let body = HealthResponse {
        status,
        timestamp: Utc::now(),
        ollama,
        version: env!("CARGO_PKG_VERSION"),
    };
    (code, Json(body)).into_response()
}

/// GET /api/health/detailed
pub async fn detailed_check(State(state): State<AppState>) -> Response {
    let healthy = state.gateway.is_healthy().await;
    let models = state.gateway.list_models().await;
    let (status, ollama, code) = labels(healthy);

    let body = DetailedHealthResponse {
        status,
        timestamp: Utc::now(),
        ollama: OllamaHealth {
            status: ollama,
            models_available: models.data.map(|m| m.len()).unwrap_or(0),
            last_checked: Utc::now(),
        },
        system: HostInfo {
            environment: std::env::var("APP_ENV").unwrap_or_else(|_| "Unknown".into()),
            host_name: sysinfo::System::host_name().unwrap_or_else(|| "Unknown".into()),
            processor_count: num_cpus::get(),
            memory_usage_mb: state.metrics.system_stats().memory_usage_mb,
        },
    };
    (code, Json(body)).into_response()
}
