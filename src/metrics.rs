//! Request metrics and periodic summaries for the classification server.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept for percentile estimates
const LATENCY_WINDOW: usize = 10_000;

/// Metrics collector for prediction traffic
pub struct ServiceMetrics {
    /// Total `/predict` requests seen
    pub requests: AtomicU64,
    /// Requests that produced a prediction
    pub successes: AtomicU64,
    /// Requests that failed
    pub failures: AtomicU64,
    /// Failures by error kind
    failures_by_kind: RwLock<HashMap<&'static str, u64>>,
    /// Top-1 predictions by label
    predictions_by_label: RwLock<HashMap<String, u64>>,
    /// End-to-end prediction times (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Wall-clock start, for the summary header
    started_at: DateTime<Utc>,
    /// Monotonic start, for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            predictions_by_label: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            started_at: Utc::now(),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_success(&self, latency: Duration, top_label: &str) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);

        if let Ok(mut by_label) = self.predictions_by_label.write() {
            *by_label.entry(top_label.to_string()).or_insert(0) += 1;
        }
    }

    /// Record a failed prediction request
    pub fn record_failure(&self, kind: &'static str) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    fn record_latency(&self, latency: Duration) {
        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            if times.len() > LATENCY_WINDOW {
                times.drain(0..LATENCY_WINDOW / 2);
            }
        }
    }

    /// Latency statistics over the retained window
    pub fn latency_stats(&self) -> LatencyStats {
        let Ok(times) = self.latencies.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let pick = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: pick(0.50),
            p95_us: pick(0.95),
            p99_us: pick(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Requests per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn failures_by_kind(&self) -> HashMap<&'static str, u64> {
        self.failures_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn predictions_by_label(&self) -> HashMap<String, u64> {
        self.predictions_by_label
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let requests = self.requests.load(Ordering::Relaxed);
        let successes = self.successes.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let latency = self.latency_stats();

        info!(
            since = %self.started_at.to_rfc3339(),
            requests,
            successes,
            failures,
            throughput = format!("{:.2} req/s", self.throughput()),
            "Prediction metrics summary"
        );
        info!(
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Prediction latency"
        );

        let mut by_label: Vec<(String, u64)> = self.predictions_by_label().into_iter().collect();
        by_label.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (label, count) in &by_label {
            let pct = if successes > 0 {
                (*count as f64 / successes as f64) * 100.0
            } else {
                0.0
            };
            info!(label = %label, count, "  top-1 share {:.1}%", pct);
        }

        for (kind, count) in self.failures_by_kind() {
            info!(kind, count, "  failures");
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Prediction latency statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Logs a metrics summary on a fixed interval
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Run the periodic reporting loop
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_success(Duration::from_micros(100), "Peri Bacaları");
        metrics.record_success(Duration::from_micros(300), "Peri Bacaları");
        metrics.record_success(Duration::from_micros(200), "Kurşunlu Camii");
        metrics.record_failure("missing_image");

        assert_eq!(metrics.requests.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.successes.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.failures.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.predictions_by_label()["Peri Bacaları"], 2);
        assert_eq!(metrics.failures_by_kind()["missing_image"], 1);
    }

    #[test]
    fn test_latency_stats() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.latency_stats(), LatencyStats::default());

        for us in 1..=100 {
            metrics.record_success(Duration::from_micros(us), "a");
        }

        let stats = metrics.latency_stats();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.mean_us, 50);
        assert_eq!(stats.p50_us, 51);
        assert_eq!(stats.p99_us, 100);
        assert_eq!(stats.max_us, 100);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let metrics = ServiceMetrics::new();
        for _ in 0..(LATENCY_WINDOW + 1) {
            metrics.record_latency(Duration::from_micros(5));
        }
        assert!(metrics.latency_stats().count as usize <= LATENCY_WINDOW);
    }
}
