//! Application state handed to every HTTP handler.

use std::sync::Arc;

use crate::gateway::OllamaGateway;
use crate::metrics::MetricsAggregator;

/// Built once by the composition root; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<OllamaGateway>,
    pub metrics: Arc<MetricsAggregator>,
}

impl AppState {
    pub fn new(gateway: Arc<OllamaGateway>) -> Self {
        let metrics = gateway.metrics().clone();
        Self { gateway, metrics }
    }
}
