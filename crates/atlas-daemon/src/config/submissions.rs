use atlas_types::DEFAULT_SUBMISSION_TIMEOUT_MS;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionsConfig {
    /// Deadline for the storage part of one submission.
    pub transaction_timeout_ms: u64,
}

impl Default for SubmissionsConfig {
    fn default() -> Self {
        Self {
            transaction_timeout_ms: DEFAULT_SUBMISSION_TIMEOUT_MS,
        }
    }
}
