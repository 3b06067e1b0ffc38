//! In-process pipeline metrics.
//!
//! Lock-free counters and histograms behind a global registry, exposed as a
//! JSON snapshot by the admin endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Saturates at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}

/// Latency histogram in microseconds.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 100us, 500us, 1ms, 5ms, 10ms, 50ms, 100ms, 500ms, 1s, 5s
    buckets: [AtomicU64; 10],
    /// Values above the last bound
    overflow: AtomicU64,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 10] = [
        100, 500, 1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000, 5_000_000,
    ];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            overflow: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in microseconds.
    pub fn observe(&self, us: u64) {
        self.sum.fetch_add(us, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        match Self::BUCKET_BOUNDS.iter().position(|&bound| us <= bound) {
            Some(i) => self.buckets[i].fetch_add(1, Ordering::Relaxed),
            None => self.overflow.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn observe_duration(&self, elapsed: Duration) {
        self.observe(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX));
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns `(upper_bound_us, count)` per bucket, non-cumulative.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn overflow(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }
}

/// Collected metrics for the pipeline service.
#[derive(Debug, Default)]
pub struct Metrics {
    // Requests
    pub requests_received: Counter,
    pub requests_failed: Counter,
    pub schema_errors: Counter,

    // Deduplication
    pub raw_records_received: Counter,
    pub raw_records_invalid: Counter,
    pub duplicates_removed: Counter,
    pub canonical_records_emitted: Counter,

    // Aggregation
    pub table_rows_received: Counter,
    pub table_rows_invalid: Counter,
    pub customers_summarized: Counter,
    pub metrics_rows_emitted: Counter,

    // Latency histograms
    pub dedup_latency_us: Histogram,
    pub aggregation_latency_us: Histogram,

    // Gauges
    pub in_flight_requests: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub requests_received: u64,
    pub requests_failed: u64,
    pub schema_errors: u64,
    pub raw_records_received: u64,
    pub raw_records_invalid: u64,
    pub duplicates_removed: u64,
    pub canonical_records_emitted: u64,
    pub table_rows_received: u64,
    pub table_rows_invalid: u64,
    pub customers_summarized: u64,
    pub metrics_rows_emitted: u64,
    pub dedup_runs: u64,
    pub dedup_latency_mean_us: f64,
    pub aggregation_runs: u64,
    pub aggregation_latency_mean_us: f64,
    pub in_flight_requests: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            requests_received: self.requests_received.get(),
            requests_failed: self.requests_failed.get(),
            schema_errors: self.schema_errors.get(),
            raw_records_received: self.raw_records_received.get(),
            raw_records_invalid: self.raw_records_invalid.get(),
            duplicates_removed: self.duplicates_removed.get(),
            canonical_records_emitted: self.canonical_records_emitted.get(),
            table_rows_received: self.table_rows_received.get(),
            table_rows_invalid: self.table_rows_invalid.get(),
            customers_summarized: self.customers_summarized.get(),
            metrics_rows_emitted: self.metrics_rows_emitted.get(),
            dedup_runs: self.dedup_latency_us.count(),
            dedup_latency_mean_us: self.dedup_latency_us.mean(),
            aggregation_runs: self.aggregation_latency_us.count(),
            aggregation_latency_mean_us: self.aggregation_latency_us.mean(),
            in_flight_requests: self.in_flight_requests.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
