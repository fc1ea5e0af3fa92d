//! HTTP client for the non-streaming Ollama endpoints.
//!
//! Bodies are decoded into the raw record types from [`crate::catalog`] or into
//! [`ChatResponse`]; nothing loosely typed is returned to callers.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::{RawModelDetails, RawModelRecord};
use crate::error::{GatewayError, Result};
use crate::models::{ChatRequest, ChatResponse};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct NameRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Option<Vec<Value>>,
}

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    http_client: Client,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, http_client))
    }

    pub fn with_client(base_url: impl Into<String>, http_client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http_client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST /api/generate`, single JSON response.
    pub async fn generate(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!("Generating response for model: {}", request.model);
        let body = GenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream: request.stream,
            options: request.options.as_ref().map(|o| GenerateOptions {
                temperature: o.temperature,
                num_predict: o.max_tokens,
            }),
        };

        let response = self.http_client
            .post(self.url("/api/generate"))
            .json(&body)
            .send()
            .await?;
        let text = ensure_success(response).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// `GET /api/tags`. Entries that are not JSON objects are skipped.
    pub async fn list_models(&self) -> Result<Vec<RawModelRecord>> {
        let response = self.http_client.get(self.url("/api/tags")).send().await?;
        let text = ensure_success(response).await?.text().await?;
        let tags: TagsResponse = serde_json::from_str(&text)?;

        let records = tags
            .models
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawModelRecord>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed model record: {}", e);
                    None
                }
            })
            .collect();
        Ok(records)
    }

    /// `POST /api/show`.
    pub async fn show_model(&self, name: &str) -> Result<RawModelDetails> {
        let response = self.http_client
            .post(self.url("/api/show"))
            .json(&NameRequest { name })
            .send()
            .await?;
        let text = ensure_success(response).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// `DELETE /api/delete`.
    pub async fn delete_model(&self, name: &str) -> Result<()> {
        let response = self.http_client
            .delete(self.url("/api/delete"))
            .json(&NameRequest { name })
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// `GET /`: any 2xx means the upstream is reachable.
    pub async fn is_healthy(&self) -> bool {
        match self.http_client.get(self.url("/")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Upstream health probe failed: {}", e);
                false
            }
        }
    }
}

/// Turn a non-2xx response into [`GatewayError::Upstream`] carrying the body text.
pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Upstream { status, body })
}
