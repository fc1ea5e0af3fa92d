//! Request, response and envelope types shared by the gateway and its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uniform result envelope returned by every gateway operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Failure that still carries a payload, e.g. `Data = false` for boolean operations.
    pub fn fail_with(data: T, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub options: Option<ChatOptions>,
}

fn default_model() -> String { "llama2".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens", alias = "maxTokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 { 0.7 }
fn default_max_tokens() -> u32 { 1000 }

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, deserialize_with = "crate::catalog::lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Canonical model entry produced from an upstream `/api/tags` record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDescriptor {
    pub name: String,
    pub size: String,
    pub modified_at: DateTime<Utc>,
    /// Set when the upstream timestamp was missing or unparsable and `modified_at`
    /// holds the time of normalization instead.
    pub modified_at_estimated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDetails {
    pub name: String,
    pub size: String,
    pub format: String,
    pub family: String,
    pub parameters: Vec<String>,
    pub modified_at: DateTime<Utc>,
    pub modified_at_estimated: bool,
}
