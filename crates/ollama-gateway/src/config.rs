// ollama-gateway/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_base_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub generate_timeout_seconds: u64,
    pub model_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
    pub metrics_window: usize,
    /// Empty or `*` allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
            generate_timeout_seconds: 300,
            model_timeout_seconds: crate::pull::DEFAULT_PULL_TIMEOUT.as_secs(),
            request_timeout_seconds: 900,
            metrics_window: crate::metrics::aggregator::DEFAULT_WINDOW,
            cors_allowed_origins: vec!["http://localhost:4200".to_string()],
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        let ollama_base_url = env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:11434".into())
            .trim_end_matches('/')
            .to_string();
        if !(ollama_base_url.starts_with("http://") || ollama_base_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "OLLAMA_BASE_URL must start with http:// or https:// (got {})",
                ollama_base_url
            ));
        }

        Ok(Self {
            ollama_base_url,
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8000".into())
                .parse()
                .context("API_PORT must be a port number")?,
            generate_timeout_seconds: env::var("GENERATE_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "300".into())
                .parse()
                .context("GENERATE_TIMEOUT_SECONDS must be an integer")?,
            model_timeout_seconds: env::var("MODEL_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "600".into())
                .parse()
                .context("MODEL_TIMEOUT_SECONDS must be an integer")?,
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "900".into())
                .parse()
                .context("REQUEST_TIMEOUT_SECONDS must be an integer")?,
            metrics_window: env::var("METRICS_WINDOW")
                .unwrap_or_else(|_| "1000".into())
                .parse()
                .context("METRICS_WINDOW must be an integer")?,
            cors_allowed_origins: parse_origins(
                &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:4200".into()),
            ),
        })
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_seconds)
    }

    /// Budget for model operations, pulls included.
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- Ollama URL: {}", self.ollama_base_url);
        info!("- API: {}:{}", self.api_host, self.api_port);
        info!("- Generate Timeout: {}s", self.generate_timeout_seconds);
        info!("- Model Timeout: {}s", self.model_timeout_seconds);
        info!("- Request Timeout: {}s", self.request_timeout_seconds);
        info!("- Metrics Window: {} samples", self.metrics_window);
        info!("- CORS Origins: {:?}", self.cors_allowed_origins);
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("Invalid API address {}:{}", self.api_host, self.api_port))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
