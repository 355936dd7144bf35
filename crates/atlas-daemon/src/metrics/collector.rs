use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::types::{PipelineStats, SubmitOutcome};

pub(crate) const LATENCY_BUCKETS: &[u64] = &[1, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

/// Lock-free counters for the submission pipeline.
pub struct PipelineMetrics {
    received: AtomicU64,
    outcomes: [AtomicU64; 9],
    total_latency_us: AtomicU64,
    latency_count: AtomicU64,
    latency_histogram: Vec<AtomicU64>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            outcomes: Default::default(),
            total_latency_us: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            latency_histogram: LATENCY_BUCKETS.iter().map(|_| AtomicU64::new(0)).collect(),
            start_time: Instant::now(),
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outcome(&self, outcome: SubmitOutcome, latency: Duration) {
        self.outcomes[outcome.index()].fetch_add(1, Ordering::Relaxed);

        self.total_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);

        let latency_ms = latency.as_millis() as u64;
        if let Some(i) = LATENCY_BUCKETS.iter().position(|&bucket| latency_ms <= bucket) {
            self.latency_histogram[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn outcome_count(&self, outcome: SubmitOutcome) -> u64 {
        self.outcomes[outcome.index()].load(Ordering::Relaxed)
    }

    /// Requests that finished, in any way.
    pub fn completed(&self) -> u64 {
        self.latency_count.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn average_latency_ms(&self) -> f64 {
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total_us = self.total_latency_us.load(Ordering::Relaxed);
        (total_us as f64 / count as f64) / 1000.0
    }

    /// Cumulative `(upper_bound_ms, count)` pairs.
    pub fn latency_histogram(&self) -> Vec<(u64, u64)> {
        let mut cumulative = 0;
        LATENCY_BUCKETS
            .iter()
            .zip(&self.latency_histogram)
            .map(|(&bound, count)| {
                cumulative += count.load(Ordering::Relaxed);
                (bound, cumulative)
            })
            .collect()
    }

    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            received: self.received(),
            created: self.outcome_count(SubmitOutcome::Created),
            replayed: self.outcome_count(SubmitOutcome::Replayed),
            duplicates: self.outcome_count(SubmitOutcome::Duplicate),
            invalid_proofs: self.outcome_count(SubmitOutcome::InvalidProof),
            stale_roots: self.outcome_count(SubmitOutcome::StaleRoot),
            field_overflows: self.outcome_count(SubmitOutcome::FieldOverflow),
            rejected: self.outcome_count(SubmitOutcome::Rejected),
            timeouts: self.outcome_count(SubmitOutcome::Timeout),
            failed: self.outcome_count(SubmitOutcome::Failed),
            average_latency_ms: self.average_latency_ms(),
            uptime_secs: self.uptime_secs(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
