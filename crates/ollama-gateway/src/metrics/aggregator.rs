//! In-process request telemetry: bounded latency windows per endpoint and
//! token usage counters per model.
//!
//! Writers touch only the entry for their own key. Readers copy each window
//! under its lock and compute statistics on the copy.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, System};
use tracing::debug;

pub const DEFAULT_WINDOW: usize = 1000;

type Window = Arc<Mutex<VecDeque<f64>>>;

/// Summary statistics over one endpoint's retained samples.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct EndpointStats {
    pub count: usize,
    pub average_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
}

impl EndpointStats {
    /// Stats for a window, `None` when it holds no samples.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();
        let p95_index = ((count as f64 * 0.95).floor() as usize).min(count - 1);

        Some(Self {
            count,
            average_ms: sum / count as f64,
            min_ms: sorted[0],
            max_ms: sorted[count - 1],
            p95_ms: sorted[p95_index],
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub endpoints: BTreeMap<String, EndpointStats>,
    pub usage: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub memory_usage_mb: u64,
    /// Share of one core since the previous call, `0.0` on the first call.
    pub cpu_usage_percent: f32,
    pub cpu_count: usize,
    /// Seconds since the process started.
    pub process_run_time_seconds: u64,
    /// Seconds since the aggregator was created.
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
    pub system: SystemStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total_requests: usize,
    pub total_model_usage: u64,
    pub system: SystemStats,
    pub timestamp: DateTime<Utc>,
}

pub struct MetricsAggregator {
    latencies: DashMap<String, Window>,
    usage: DashMap<String, AtomicU64>,
    window: usize,
    started_at: Instant,
    // Kept across calls: sysinfo derives CPU usage from the delta between two refreshes.
    system: Mutex<System>,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            latencies: DashMap::new(),
            usage: DashMap::new(),
            window: window.max(1),
            started_at: Instant::now(),
            system: Mutex::new(System::new()),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Append a latency sample. Non-finite durations are dropped.
    pub fn record_latency(&self, endpoint: &str, duration_ms: f64) {
        if !duration_ms.is_finite() {
            debug!("Dropping non-finite latency sample for {}", endpoint);
            return;
        }

        let window = self.window_for(endpoint);
        {
            let mut samples = lock(&window);
            samples.push_back(duration_ms);
            while samples.len() > self.window {
                samples.pop_front();
            }
        }

        debug!("Request to {} took {:.1}ms", endpoint, duration_ms);
    }

    /// Add tokens to a model's running total. Negative counts are ignored.
    pub fn record_usage(&self, model: &str, tokens: i64) {
        if tokens < 0 {
            debug!("Ignoring negative token count {} for model {}", tokens, model);
            return;
        }
        let tokens = tokens as u64;

        // Shard read lock first; only a new key takes the write lock.
        if let Some(counter) = self.usage.get(model) {
            saturating_add(&counter, tokens);
        } else {
            let counter = self
                .usage
                .entry(model.to_string())
                .or_insert_with(|| AtomicU64::new(0));
            saturating_add(&counter, tokens);
        }

        debug!("Model {} used {} tokens", model, tokens);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        // Collect handles first so no shard guard is held while copying windows.
        let windows: Vec<(String, Window)> = self
            .latencies
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let endpoints = windows
            .into_iter()
            .filter_map(|(endpoint, window)| {
                let samples: Vec<f64> = lock(&window).iter().copied().collect();
                EndpointStats::from_samples(&samples).map(|stats| (endpoint, stats))
            })
            .collect();

        let usage = self
            .usage
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();

        MetricsSnapshot { endpoints, usage }
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            snapshot: self.snapshot(),
            system: self.system_stats(),
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let snapshot = self.snapshot();
        MetricsSummary {
            total_requests: snapshot.endpoints.values().map(|s| s.count).sum(),
            total_model_usage: snapshot.usage.values().sum(),
            system: self.system_stats(),
            timestamp: Utc::now(),
        }
    }

    pub fn system_stats(&self) -> SystemStats {
        let usage = match sysinfo::get_current_pid() {
            Ok(pid) => {
                let mut sys = self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                process_usage(&mut sys, pid)
            }
            Err(e) => {
                debug!("Current pid unavailable: {}", e);
                ProcessUsage::default()
            }
        };

        SystemStats {
            memory_usage_mb: usage.memory_mb,
            cpu_usage_percent: usage.cpu_percent,
            cpu_count: num_cpus::get(),
            process_run_time_seconds: usage.run_time_seconds,
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    fn window_for(&self, endpoint: &str) -> Window {
        if let Some(window) = self.latencies.get(endpoint) {
            return window.clone();
        }
        self.latencies
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::with_capacity(self.window.min(DEFAULT_WINDOW)))))
            .clone()
    }
}

#[derive(Default)]
struct ProcessUsage {
    memory_mb: u64,
    cpu_percent: f32,
    run_time_seconds: u64,
}

fn process_usage(sys: &mut System, pid: Pid) -> ProcessUsage {
    if !sys.refresh_process_specifics(pid, ProcessRefreshKind::new().with_memory().with_cpu()) {
        return ProcessUsage::default();
    }
    sys.process(pid)
        .map(|p| ProcessUsage {
            memory_mb: p.memory() / (1024 * 1024),
            cpu_percent: p.cpu_usage(),
            run_time_seconds: p.run_time(),
        })
        .unwrap_or_default()
}

/// Counters stop at `u64::MAX` instead of wrapping.
fn saturating_add(counter: &AtomicU64, tokens: u64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_add(tokens))
    });
}

/// A panic while holding a window lock leaves the deque intact, so poisoning is ignored.
fn lock(window: &Window) -> MutexGuard<'_, VecDeque<f64>> {
    window.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
