// ollama-gateway/src/lib.rs

pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod models;
pub mod pull;
pub mod telemetry;
pub mod upstream;

#[cfg(feature = "cli")]
pub mod api;
#[cfg(feature = "cli")]
pub mod server;
#[cfg(feature = "cli")]
pub mod state;

// Public API exports
pub use config::Config;
pub use error::GatewayError;
pub use gateway::OllamaGateway;
pub use metrics::MetricsAggregator;
pub use models::{ApiResponse, ChatRequest, ChatResponse, ModelDescriptor, ModelDetails};
pub use pull::{PullOutcome, PullProgressEvent, StreamingPullClient};
pub use upstream::OllamaClient;

#[cfg(feature = "cli")]
pub use server::{build_router, run_server};
#[cfg(feature = "cli")]
pub use state::AppState;
