use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::collector::PipelineMetrics;
use super::types::SubmitOutcome;

/// Times one submission; a timer dropped without an outcome counts as failed.
pub struct SubmitTimer {
    start: Instant,
    metrics: Arc<PipelineMetrics>,
    recorded: AtomicBool,
}

impl SubmitTimer {
    pub fn start(metrics: Arc<PipelineMetrics>) -> Self {
        metrics.record_received();
        Self {
            start: Instant::now(),
            metrics,
            recorded: AtomicBool::new(false),
        }
    }

    pub fn finish(self, outcome: SubmitOutcome) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }
        self.metrics.record_outcome(outcome, self.start.elapsed());
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for SubmitTimer {
    fn drop(&mut self) {
        if !self.recorded.load(Ordering::SeqCst) {
            self.metrics
                .record_outcome(SubmitOutcome::Failed, self.start.elapsed());
        }
    }
}
