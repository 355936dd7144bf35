mod collector;
mod prometheus;
mod timer;
mod types;

pub use collector::PipelineMetrics;
pub use prometheus::PrometheusExporter;
pub use timer::SubmitTimer;
pub use types::{PipelineStats, SubmitOutcome};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageMetrics;
    use atlas_types::{AtlasHead, FieldBytes};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_outcome_counters() {
        let metrics = PipelineMetrics::new();
        metrics.record_received();
        metrics.record_received();
        metrics.record_outcome(SubmitOutcome::Created, Duration::from_millis(20));
        metrics.record_outcome(SubmitOutcome::Duplicate, Duration::from_millis(3));

        let stats = metrics.snapshot();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.invalid_proofs, 0);
        assert!(stats.average_latency_ms > 0.0);
    }

    #[test]
    fn test_outcome_from_error_code() {
        assert_eq!(SubmitOutcome::from_error_code("DUPLICATE_ACTION"), SubmitOutcome::Duplicate);
        assert_eq!(SubmitOutcome::from_error_code("STALE_ROOT"), SubmitOutcome::StaleRoot);
        assert_eq!(SubmitOutcome::from_error_code("STORAGE_UNAVAILABLE"), SubmitOutcome::Failed);
    }

    #[test]
    fn test_histogram_is_cumulative() {
        let metrics = PipelineMetrics::new();
        metrics.record_outcome(SubmitOutcome::Created, Duration::from_millis(4));
        metrics.record_outcome(SubmitOutcome::Created, Duration::from_millis(400));

        let histogram = metrics.latency_histogram();
        let at = |bound: u64| histogram.iter().find(|(b, _)| *b == bound).map(|(_, c)| *c);
        assert_eq!(at(5), Some(1));
        assert_eq!(at(500), Some(2));
        assert_eq!(at(5000), Some(2));
    }

    #[test]
    fn test_timer_dropped_counts_as_failed() {
        let metrics = Arc::new(PipelineMetrics::new());
        {
            let _timer = SubmitTimer::start(Arc::clone(&metrics));
        }
        SubmitTimer::start(Arc::clone(&metrics)).finish(SubmitOutcome::Replayed);

        assert_eq!(metrics.received(), 2);
        assert_eq!(metrics.outcome_count(SubmitOutcome::Failed), 1);
        assert_eq!(metrics.outcome_count(SubmitOutcome::Replayed), 1);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Arc::new(PipelineMetrics::new());
        metrics.record_received();
        metrics.record_outcome(SubmitOutcome::Created, Duration::from_millis(10));

        let exporter = PrometheusExporter::new(metrics, Arc::new(StorageMetrics::new()));
        let head = AtlasHead {
            version: 7,
            global_root: FieldBytes::zero(),
            published_at: chrono::Utc::now(),
        };
        let output = exporter.export(&head, 3, 12);

        assert!(output.contains("atlas_version 7"));
        assert!(output.contains("atlas_leaves 12"));
        assert!(output.contains("atlas_submissions_received_total 1"));
        assert!(output.contains("atlas_submissions_total{outcome=\"created\"} 1"));
        assert!(output.contains("atlas_submission_latency_ms_count 1"));
    }
}
