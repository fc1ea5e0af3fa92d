//! Error types for calls to the upstream Ollama service.

use reqwest::StatusCode;

/// Failure of a single upstream call.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("{status} - {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Human-readable message used in response envelopes, prefixed with the operation
    /// for upstream failures.
    pub fn describe(&self, prefix: &str) -> String {
        match self {
            GatewayError::Upstream { .. } => format!("{}: {}", prefix, self),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
