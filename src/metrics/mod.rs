//! In-process counters and latency histograms for submissions and lookups.
//!
//! The registry is optional: assemblers and resolvers only record when one
//! is attached. Export as JSON for status endpoints or Prometheus text for
//! scraping.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

/// Latency buckets in seconds. Gateway fetches dominate the upper range.
const LATENCY_BUCKETS: [f64; 12] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0,
];

const PROMETHEUS_PREFIX: &str = "fir_vault";

/// Predefined metric names
pub mod metric_names {
    pub const SUBMISSIONS_COMPLETED: &str = "fir.submissions.completed";
    pub const SUBMISSIONS_FAILED: &str = "fir.submissions.failed";

    pub const EVIDENCE_UPLOADED: &str = "fir.evidence.uploaded";
    pub const EVIDENCE_FAILED: &str = "fir.evidence.failed";

    pub const RESOLVE_OK: &str = "fir.resolve.ok";
    pub const RESOLVE_INVALID_SECRET: &str = "fir.resolve.invalid_secret";
    pub const RESOLVE_UNAVAILABLE: &str = "fir.resolve.unavailable";
    pub const RESOLVE_CORRUPT: &str = "fir.resolve.corrupt";

    pub const ASSEMBLE_LATENCY: &str = "fir.assemble.latency_seconds";
    pub const RESOLVE_LATENCY: &str = "fir.resolve.latency_seconds";
}

pub struct MetricsRegistry {
    counters: RwLock<BTreeMap<String, Arc<AtomicU64>>>,
    histograms: RwLock<BTreeMap<String, Arc<Histogram>>>,
    start_time: Instant,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(BTreeMap::new()),
            histograms: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    pub async fn inc_counter(&self, name: &str) {
        self.add_counter(name, 1).await;
    }

    pub async fn add_counter(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.read().await.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }

        self.counters
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .fetch_add(value, Ordering::Relaxed);
    }

    pub async fn get_counter(&self, name: &str) -> u64 {
        self.counters
            .read()
            .await
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub async fn observe_histogram(&self, name: &str, seconds: f64) {
        let existing = self.histograms.read().await.get(name).cloned();
        let histogram = match existing {
            Some(h) => h,
            None => self
                .histograms
                .write()
                .await
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Histogram::latency()))
                .clone(),
        };
        histogram.observe(seconds);
    }

    /// Number of observations recorded under `name`
    pub async fn histogram_count(&self, name: &str) -> u64 {
        self.histograms
            .read()
            .await
            .get(name)
            .map(|h| h.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub async fn to_json(&self) -> serde_json::Value {
        let counters: BTreeMap<String, u64> = self
            .counters
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();

        let histograms: BTreeMap<String, serde_json::Value> = self
            .histograms
            .read()
            .await
            .iter()
            .map(|(k, h)| (k.clone(), h.to_json()))
            .collect();

        serde_json::json!({
            "uptime_seconds": self.uptime_seconds(),
            "counters": counters,
            "histograms": histograms,
        })
    }

    /// Prometheus text exposition format
    pub async fn to_prometheus(&self) -> String {
        let mut out = format!(
            "# TYPE {PROMETHEUS_PREFIX}_uptime_seconds gauge\n{PROMETHEUS_PREFIX}_uptime_seconds {}\n",
            self.uptime_seconds()
        );

        for (name, counter) in self.counters.read().await.iter() {
            let name = prometheus_name(name);
            out.push_str(&format!(
                "# TYPE {name} counter\n{name} {}\n",
                counter.load(Ordering::Relaxed)
            ));
        }

        for (name, histogram) in self.histograms.read().await.iter() {
            histogram.write_prometheus(&prometheus_name(name), &mut out);
        }

        out
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn prometheus_name(name: &str) -> String {
    name.replace(['.', '-'], "_")
}

/// Fixed-bucket histogram. The sum is kept in microseconds.
pub struct Histogram {
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(buckets: Vec<f64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn latency() -> Self {
        Self::new(LATENCY_BUCKETS.to_vec())
    }

    pub fn observe(&self, value: f64) {
        self.sum_micros
            .fetch_add((value.max(0.0) * 1_000_000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        if let Some(i) = self.buckets.iter().position(|b| value <= *b) {
            self.counts[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    fn sum_seconds(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    pub fn to_json(&self) -> serde_json::Value {
        let counts: Vec<u64> = self.counts.iter().map(|c| c.load(Ordering::Relaxed)).collect();
        serde_json::json!({
            "buckets": self.buckets,
            "counts": counts,
            "sum": self.sum_seconds(),
            "count": self.count.load(Ordering::Relaxed),
        })
    }

    fn write_prometheus(&self, name: &str, out: &mut String) {
        out.push_str(&format!("# TYPE {name} histogram\n"));

        let mut cumulative = 0u64;
        for (bucket, count) in self.buckets.iter().zip(&self.counts) {
            cumulative += count.load(Ordering::Relaxed);
            out.push_str(&format!("{name}_bucket{{le=\"{bucket}\"}} {cumulative}\n"));
        }

        let total = self.count.load(Ordering::Relaxed);
        out.push_str(&format!("{name}_bucket{{le=\"+Inf\"}} {total}\n"));
        out.push_str(&format!("{name}_sum {}\n", self.sum_seconds()));
        out.push_str(&format!("{name}_count {total}\n"));
    }
}

/// Time an async operation into a latency histogram
pub async fn timed<F, T>(metrics: &MetricsRegistry, metric_name: &str, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let result = f.await;
    metrics
        .observe_histogram(metric_name, start.elapsed().as_secs_f64())
        .await;
    result
}
