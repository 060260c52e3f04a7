//! Scoring metrics and schema-drift diagnostics.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the scoring service.
///
/// Counters never feed back into scoring.
pub struct ScoringMetrics {
    /// Requests scored successfully
    pub requests_scored: AtomicU64,
    /// Requests rejected by validation
    pub requests_rejected: AtomicU64,
    /// Requests that failed inside the scaler or classifier
    pub scoring_failures: AtomicU64,
    /// Requests labelled fraud
    pub fraud_flagged: AtomicU64,
    /// Requests where at least one schema column was filled with the default
    pub drifted_requests: AtomicU64,
    /// Whether the AmountQ95 fallback constant is in use
    amount_q95_fallback: AtomicBool,
    /// Default fills per schema column
    schema_fills: RwLock<BTreeMap<String, u64>>,
    /// Absent request fields per field name
    defaulted_fields: RwLock<BTreeMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Fraud probability distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ScoringMetrics {
    pub fn new() -> Self {
        Self {
            requests_scored: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            scoring_failures: AtomicU64::new(0),
            fraud_flagged: AtomicU64::new(0),
            drifted_requests: AtomicU64::new(0),
            amount_q95_fallback: AtomicBool::new(false),
            schema_fills: RwLock::new(BTreeMap::new()),
            defaulted_fields: RwLock::new(BTreeMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a scored request
    pub fn record_score(&self, processing_time: Duration, probability: f64, is_fraud: bool) {
        self.requests_scored.fetch_add(1, Ordering::Relaxed);
        if is_fraud {
            self.fraud_flagged.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (probability * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_rejection(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.scoring_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record schema columns filled with the default value for one request
    pub fn record_schema_fills(&self, columns: &[String]) {
        if columns.is_empty() {
            return;
        }
        self.drifted_requests.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut fills) = self.schema_fills.write() {
            for column in columns {
                *fills.entry(column.clone()).or_insert(0) += 1;
            }
        }
    }

    /// Record request fields that were absent and defaulted
    pub fn record_defaulted_fields(&self, fields: &[&str]) {
        if fields.is_empty() {
            return;
        }
        if let Ok(mut defaulted) = self.defaulted_fields.write() {
            for field in fields {
                *defaulted.entry((*field).to_string()).or_insert(0) += 1;
            }
        }
    }

    pub fn set_amount_q95_fallback(&self, fallback: bool) {
        self.amount_q95_fallback.store(fallback, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Point-in-time copy of every metric
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_scored: self.requests_scored.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            scoring_failures: self.scoring_failures.load(Ordering::Relaxed),
            fraud_flagged: self.fraud_flagged.load(Ordering::Relaxed),
            drifted_requests: self.drifted_requests.load(Ordering::Relaxed),
            amount_q95_fallback: self.amount_q95_fallback.load(Ordering::Relaxed),
            schema_fills: self.schema_fills.read().map(|m| m.clone()).unwrap_or_default(),
            defaulted_fields: self.defaulted_fields.read().map(|m| m.clone()).unwrap_or_default(),
            score_distribution: self.score_buckets.read().map(|b| *b).unwrap_or_default(),
            processing: self.get_processing_stats(),
            throughput: self.get_throughput(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let flag_rate = if snapshot.requests_scored > 0 {
            (snapshot.fraud_flagged as f64 / snapshot.requests_scored as f64) * 100.0
        } else {
            0.0
        };

        info!(
            scored = snapshot.requests_scored,
            rejected = snapshot.requests_rejected,
            failed = snapshot.scoring_failures,
            flagged = snapshot.fraud_flagged,
            flag_rate = format!("{:.1}%", flag_rate),
            throughput = format!("{:.1} req/s", snapshot.throughput),
            mean_us = snapshot.processing.mean_us,
            p99_us = snapshot.processing.p99_us,
            "Scoring summary"
        );

        if snapshot.drifted_requests > 0 {
            info!(
                drifted_requests = snapshot.drifted_requests,
                schema_fills = ?snapshot.schema_fills,
                "Schema columns filled with defaults"
            );
        }
        if !snapshot.defaulted_fields.is_empty() {
            info!(defaulted_fields = ?snapshot.defaulted_fields, "Request fields defaulted");
        }
        if snapshot.amount_q95_fallback {
            info!("AmountQ95 fallback cutoff in use");
        }
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Serializable view served by `GET /metrics`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_scored: u64,
    pub requests_rejected: u64,
    pub scoring_failures: u64,
    pub fraud_flagged: u64,
    pub drifted_requests: u64,
    pub amount_q95_fallback: bool,
    pub schema_fills: BTreeMap<String, u64>,
    pub defaulted_fields: BTreeMap<String, u64>,
    pub score_distribution: [u64; 10],
    pub processing: ProcessingStats,
    pub throughput: f64,
    pub uptime_secs: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<ScoringMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ScoringMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // First tick completes immediately
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
        let metrics = ScoringMetrics::new();

        metrics.record_score(Duration::from_micros(100), 0.1, false);
        metrics.record_score(Duration::from_micros(200), 0.8, true);
        metrics.record_score(Duration::from_micros(300), 1.0, true);
        metrics.record_rejection();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_scored, 3);
        assert_eq!(snapshot.fraud_flagged, 2);
        assert_eq!(snapshot.requests_rejected, 1);
        assert_eq!(snapshot.score_distribution[1], 1);
        assert_eq!(snapshot.score_distribution[8], 1);
        assert_eq!(snapshot.score_distribution[9], 1);
        assert_eq!(snapshot.processing.max_us, 300);
    }

    #[test]
    fn test_schema_fill_tracking() {
        let metrics = ScoringMetrics::new();

        metrics.record_schema_fills(&[]);
        metrics.record_schema_fills(&["isFlaggedFraud".to_string()]);
        metrics.record_schema_fills(&["isFlaggedFraud".to_string(), "hour_sin".to_string()]);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.drifted_requests, 2);
        assert_eq!(snapshot.schema_fills["isFlaggedFraud"], 2);
        assert_eq!(snapshot.schema_fills["hour_sin"], 1);
    }

    #[test]
    fn test_defaulted_field_tracking() {
        let metrics = ScoringMetrics::new();
        metrics.record_defaulted_fields(&["type", "step"]);
        metrics.record_defaulted_fields(&["type"]);
        metrics.set_amount_q95_fallback(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.defaulted_fields["type"], 2);
        assert_eq!(snapshot.defaulted_fields["step"], 1);
        assert!(snapshot.amount_q95_fallback);
    }

    #[test]
    fn test_empty_processing_stats() {
        let stats = ScoringMetrics::new().get_processing_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.p99_us, 0);
    }
}
