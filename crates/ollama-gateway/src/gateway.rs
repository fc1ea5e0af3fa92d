//! Model and chat operations over the upstream, returned as [`ApiResponse`] envelopes.
//!
//! Every operation records its wall time in the shared [`MetricsAggregator`];
//! successful generations also record an estimated token count for the model.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::{error, info};

use crate::catalog;
use crate::config::Config;
use crate::error::Result;
use crate::metrics::MetricsAggregator;
use crate::models::{ApiResponse, ChatRequest, ChatResponse, ModelDescriptor, ModelDetails};
use crate::pull::{PullOutcome, StreamingPullClient};
use crate::upstream::OllamaClient;

pub const ENDPOINT_GENERATE: &str = "chat/generate";
pub const ENDPOINT_LIST: &str = "models/list";
pub const ENDPOINT_PULL: &str = "models/pull";
pub const ENDPOINT_DELETE: &str = "models/delete";
pub const ENDPOINT_DETAILS: &str = "models/details";

/// Rough token estimate used for usage accounting: one token per four characters.
pub fn estimate_tokens(text: &str) -> i64 {
    (text.chars().count() / 4).max(1) as i64
}

pub struct OllamaGateway {
    chat: OllamaClient,
    models: OllamaClient,
    pull_timeout: Duration,
    metrics: Arc<MetricsAggregator>,
}

impl OllamaGateway {
    pub fn new(config: &Config, metrics: Arc<MetricsAggregator>) -> Result<Self> {
        Ok(Self::with_clients(
            OllamaClient::new(&config.ollama_base_url, config.generate_timeout())?,
            OllamaClient::new(&config.ollama_base_url, config.model_timeout())?,
            config.model_timeout(),
            metrics,
        ))
    }

    /// `chat` serves generation and health probes, `models` serves catalog and pull traffic.
    pub fn with_clients(
        chat: OllamaClient,
        models: OllamaClient,
        pull_timeout: Duration,
        metrics: Arc<MetricsAggregator>,
    ) -> Self {
        info!("Gateway initialized with upstream: {}", chat.base_url());
        Self { chat, models, pull_timeout, metrics }
    }

    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    fn record_latency(&self, endpoint: &str, started: Instant) {
        self.metrics
            .record_latency(endpoint, started.elapsed().as_secs_f64() * 1000.0);
    }

    pub async fn generate(&self, request: &ChatRequest) -> ApiResponse<ChatResponse> {
        let started = Instant::now();
        info!("Generating response for model: {}", request.model);

        let result = self.chat.generate(request).await;
        self.record_latency(ENDPOINT_GENERATE, started);

        match result {
            Ok(response) => {
                self.metrics
                    .record_usage(&request.model, estimate_tokens(&response.response));
                ApiResponse::ok(response)
            }
            Err(e) => {
                error!("Error generating response: {}", e);
                ApiResponse::fail(e.describe("API Error"))
            }
        }
    }

    /// Normalized catalog, sorted by name.
    pub async fn list_models(&self) -> ApiResponse<Vec<ModelDescriptor>> {
        let started = Instant::now();
        let result = self.models.list_models().await;
        self.record_latency(ENDPOINT_LIST, started);

        match result {
            Ok(records) => ApiResponse::ok(catalog::normalize_catalog(&records)),
            Err(e) => {
                error!("Error listing models: {}", e);
                ApiResponse::fail(e.describe("Failed to fetch models"))
            }
        }
    }

    /// Pull a model, relaying human-readable progress to `on_progress` as it streams.
    pub async fn pull_model<F>(&self, name: &str, mut on_progress: F) -> ApiResponse<bool>
    where
        F: FnMut(&str),
    {
        if name.trim().is_empty() {
            return ApiResponse::fail_with(false, "Model name is required");
        }

        let started = Instant::now();
        on_progress(&format!("Starting download of {}...", name));

        let client = StreamingPullClient::new(&self.models, self.pull_timeout);
        let outcome = client.pull(name, |event| on_progress(&event.status)).await;
        self.record_latency(ENDPOINT_PULL, started);

        match outcome {
            PullOutcome::Success => {
                on_progress(&format!("Successfully downloaded {}", name));
                ApiResponse::ok(true)
            }
            PullOutcome::UpstreamFailure { status, body } => {
                let status = StatusCode::from_u16(status)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| status.to_string());
                ApiResponse::fail_with(false, format!("Pull failed: {} - {}", status, body))
            }
            PullOutcome::TransportFailure { message } => {
                error!("Error pulling model {}: {}", name, message);
                on_progress(&format!("Error downloading {}: {}", name, message));
                ApiResponse::fail_with(false, message)
            }
        }
    }

    pub async fn delete_model(&self, name: &str) -> ApiResponse<bool> {
        let started = Instant::now();
        let result = self.models.delete_model(name).await;
        self.record_latency(ENDPOINT_DELETE, started);

        match result {
            Ok(()) => {
                info!("Deleted model: {}", name);
                ApiResponse::ok(true)
            }
            Err(e) => {
                error!("Error deleting model {}: {}", name, e);
                ApiResponse::fail_with(false, e.describe("Delete failed"))
            }
        }
    }

    pub async fn model_details(&self, name: &str) -> ApiResponse<ModelDetails> {
        let started = Instant::now();
        let result = self.models.show_model(name).await;
        self.record_latency(ENDPOINT_DETAILS, started);

        match result {
            Ok(raw) => ApiResponse::ok(catalog::normalize_details(name, &raw)),
            Err(e) => {
                error!("Error getting model details for {}: {}", name, e);
                ApiResponse::fail(e.describe("Failed to get model details"))
            }
        }
    }

    /// Case-insensitive lookup in the current catalog.
    pub async fn is_model_available(&self, name: &str) -> ApiResponse<bool> {
        let listing = self.list_models().await;
        match listing.data {
            Some(models) if listing.success => {
                let wanted = name.to_lowercase();
                ApiResponse::ok(models.iter().any(|m| m.name.to_lowercase() == wanted))
            }
            _ => ApiResponse::fail_with(false, listing.error.unwrap_or_default()),
        }
    }

    pub async fn is_healthy(&self) -> bool {
        self.chat.is_healthy().await
    }
}
