//! Request telemetry: the in-process aggregator and its Prometheus exposition.

pub mod aggregator;
#[cfg(feature = "cli")]
pub mod exporter;

pub use aggregator::{
    EndpointStats, MetricsAggregator, MetricsReport, MetricsSnapshot, MetricsSummary, SystemStats,
};
