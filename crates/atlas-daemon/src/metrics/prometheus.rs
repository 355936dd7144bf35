use std::fmt::Write as _;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use atlas_types::AtlasHead;

use super::collector::PipelineMetrics;
use super::types::SubmitOutcome;
use crate::storage::StorageMetrics;

/// Renders pipeline, storage and atlas gauges in the Prometheus text format.
pub struct PrometheusExporter {
    pipeline: Arc<PipelineMetrics>,
    storage: Arc<StorageMetrics>,
}

impl PrometheusExporter {
    pub fn new(pipeline: Arc<PipelineMetrics>, storage: Arc<StorageMetrics>) -> Self {
        Self { pipeline, storage }
    }

    pub fn export(&self, head: &AtlasHead, jurisdictions: usize, leaves: u64) -> String {
        let mut output = String::with_capacity(4096);

        self.write_info(&mut output, head, jurisdictions, leaves);
        self.write_submissions(&mut output);
        self.write_storage(&mut output);

        output
    }

    fn write_info(&self, output: &mut String, head: &AtlasHead, jurisdictions: usize, leaves: u64) {
        let _ = writeln!(output, "# HELP atlas_info Daemon information");
        let _ = writeln!(output, "# TYPE atlas_info gauge");
        let _ = writeln!(output, "atlas_info{{version=\"{}\"}} 1\n", env!("CARGO_PKG_VERSION"));

        let _ = writeln!(output, "# HELP atlas_version Current atlas version");
        let _ = writeln!(output, "# TYPE atlas_version gauge");
        let _ = writeln!(output, "atlas_version {}\n", head.version);

        let _ = writeln!(output, "# HELP atlas_jurisdictions Defined jurisdictions");
        let _ = writeln!(output, "# TYPE atlas_jurisdictions gauge");
        let _ = writeln!(output, "atlas_jurisdictions {}\n", jurisdictions);

        let _ = writeln!(output, "# HELP atlas_leaves Registered commitments across all districts");
        let _ = writeln!(output, "# TYPE atlas_leaves gauge");
        let _ = writeln!(output, "atlas_leaves {}\n", leaves);

        let _ = writeln!(output, "# HELP atlas_uptime_seconds Pipeline uptime in seconds");
        let _ = writeln!(output, "# TYPE atlas_uptime_seconds gauge");
        let _ = writeln!(output, "atlas_uptime_seconds {}\n", self.pipeline.uptime_secs());
    }

    fn write_submissions(&self, output: &mut String) {
        let _ = writeln!(output, "# HELP atlas_submissions_received_total Submissions received");
        let _ = writeln!(output, "# TYPE atlas_submissions_received_total counter");
        let _ = writeln!(output, "atlas_submissions_received_total {}\n", self.pipeline.received());

        let _ = writeln!(output, "# HELP atlas_submissions_total Submissions by outcome");
        let _ = writeln!(output, "# TYPE atlas_submissions_total counter");
        for outcome in SubmitOutcome::ALL {
            let _ = writeln!(
                output,
                "atlas_submissions_total{{outcome=\"{}\"}} {}",
                outcome.label(),
                self.pipeline.outcome_count(outcome)
            );
        }
        output.push('\n');

        let _ = writeln!(output, "# HELP atlas_submission_latency_ms Submission latency");
        let _ = writeln!(output, "# TYPE atlas_submission_latency_ms histogram");
        for (bound, count) in self.pipeline.latency_histogram() {
            let _ = writeln!(output, "atlas_submission_latency_ms_bucket{{le=\"{}\"}} {}", bound, count);
        }
        let completed = self.pipeline.completed();
        let _ = writeln!(output, "atlas_submission_latency_ms_bucket{{le=\"+Inf\"}} {}", completed);
        let _ = writeln!(output, "atlas_submission_latency_ms_count {}\n", completed);
    }

    fn write_storage(&self, output: &mut String) {
        let counters = [
            ("reads", &self.storage.reads),
            ("writes", &self.storage.writes),
            ("transactions", &self.storage.transactions),
            ("aborts", &self.storage.aborts),
            ("flushes", &self.storage.flushes),
            ("errors", &self.storage.errors),
        ];
        let _ = writeln!(output, "# HELP atlas_storage_ops_total Storage operations by kind");
        let _ = writeln!(output, "# TYPE atlas_storage_ops_total counter");
        for (kind, counter) in counters {
            let _ = writeln!(
                output,
                "atlas_storage_ops_total{{kind=\"{}\"}} {}",
                kind,
                counter.load(Ordering::Relaxed)
            );
        }
    }
}
