// Prometheus exposition for the gateway. Route counters and pull gauges are
// process-wide; latency windows and usage totals are rendered from the
// aggregator handed in at scrape time.

use prometheus::{Encoder, GaugeVec, Histogram, IntCounterVec, IntGauge, Registry, TextEncoder};
use lazy_static::lazy_static;
use std::sync::OnceLock;
use axum::response::IntoResponse;
use axum::http::StatusCode;
use tracing::error;

use super::MetricsAggregator;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}
static REQ_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();
static ACTIVE_PULLS: OnceLock<IntGauge> = OnceLock::new();
static PULL_DURATION: OnceLock<Histogram> = OnceLock::new();

pub fn init_metrics() {
    if let Ok(counter) = IntCounterVec::new(
        prometheus::opts!("gateway_requests_total", "Total requests per route"),
        &["route", "status"],
    ) {
        let counter = REQ_COUNTER.get_or_init(|| counter);
        REGISTRY.register(Box::new(counter.clone())).ok();
    }

    if let Ok(gauge) = IntGauge::new("gateway_active_pulls", "Model pulls currently streaming") {
        let gauge = ACTIVE_PULLS.get_or_init(|| gauge);
        REGISTRY.register(Box::new(gauge.clone())).ok();
    }

    if let Ok(histogram) = Histogram::with_opts(
        prometheus::HistogramOpts::new("gateway_pull_duration_seconds", "Wall time of model pulls")
            .buckets(vec![1.0, 5.0, 15.0, 60.0, 180.0, 600.0]),
    ) {
        let histogram = PULL_DURATION.get_or_init(|| histogram);
        REGISTRY.register(Box::new(histogram.clone())).ok();
    }
}

pub fn inc_request(route: &str, status: &str) {
    if let Some(counter) = REQ_COUNTER.get() {
        counter.with_label_values(&[route, status]).inc();
    }
}

pub fn inc_pulls() {
    if let Some(gauge) = ACTIVE_PULLS.get() {
        gauge.inc();
    }
}

pub fn dec_pulls() {
    if let Some(gauge) = ACTIVE_PULLS.get() {
        gauge.dec();
    }
}

pub fn observe_pull_duration(seconds: f64) {
    if let Some(histogram) = PULL_DURATION.get() {
        histogram.observe(seconds);
    }
}

/// Keeps the active-pull gauge balanced on every exit path of a pull handler.
pub struct PullGuard {
    started: std::time::Instant,
}

impl PullGuard {
    pub fn start() -> Self {
        inc_pulls();
        Self { started: std::time::Instant::now() }
    }
}

impl Drop for PullGuard {
    fn drop(&mut self) {
        dec_pulls();
        observe_pull_duration(self.started.elapsed().as_secs_f64());
    }
}

/// Gauges built from a fresh aggregator snapshot, registered in a throwaway registry.
fn snapshot_registry(aggregator: &MetricsAggregator) -> prometheus::Result<Registry> {
    let registry = Registry::new();
    let latency = GaugeVec::new(
        prometheus::opts!("gateway_endpoint_latency_ms", "Latency over the retained sample window"),
        &["endpoint", "stat"],
    )?;
    let usage = GaugeVec::new(
        prometheus::opts!("gateway_model_tokens_total", "Estimated tokens generated per model"),
        &["model"],
    )?;

    let snapshot = aggregator.snapshot();
    for (endpoint, stats) in &snapshot.endpoints {
        latency.with_label_values(&[endpoint, "count"]).set(stats.count as f64);
        latency.with_label_values(&[endpoint, "avg"]).set(stats.average_ms);
        latency.with_label_values(&[endpoint, "min"]).set(stats.min_ms);
        latency.with_label_values(&[endpoint, "max"]).set(stats.max_ms);
        latency.with_label_values(&[endpoint, "p95"]).set(stats.p95_ms);
    }
    for (model, tokens) in &snapshot.usage {
        usage.with_label_values(&[model]).set(*tokens as f64);
    }

    registry.register(Box::new(latency))?;
    registry.register(Box::new(usage))?;
    Ok(registry)
}

pub fn render(aggregator: &MetricsAggregator) -> Result<Vec<u8>, prometheus::Error> {
    let mut families = REGISTRY.gather();
    families.extend(snapshot_registry(aggregator)?.gather());

    let mut buffer = vec![];
    TextEncoder::new().encode(&families, &mut buffer)?;
    Ok(buffer)
}

pub fn get_metrics(aggregator: &MetricsAggregator) -> impl IntoResponse {
    match render(aggregator) {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}
