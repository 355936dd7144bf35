use serde::{Deserialize, Serialize};

/// How a submission attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubmitOutcome {
    Created,
    Replayed,
    Duplicate,
    InvalidProof,
    StaleRoot,
    FieldOverflow,
    Rejected,
    Timeout,
    Failed,
}

impl SubmitOutcome {
    pub const ALL: [SubmitOutcome; 9] = [
        Self::Created,
        Self::Replayed,
        Self::Duplicate,
        Self::InvalidProof,
        Self::StaleRoot,
        Self::FieldOverflow,
        Self::Rejected,
        Self::Timeout,
        Self::Failed,
    ];

    /// Map a pipeline error code onto an outcome.
    pub fn from_error_code(code: &str) -> Self {
        match code {
            "DUPLICATE_ACTION" => Self::Duplicate,
            "INVALID_PROOF" => Self::InvalidProof,
            "STALE_ROOT" => Self::StaleRoot,
            "FIELD_OVERFLOW" => Self::FieldOverflow,
            "TIMEOUT" => Self::Timeout,
            "VALIDATION_ERROR" => Self::Rejected,
            _ => Self::Failed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Replayed => "replayed",
            Self::Duplicate => "duplicate",
            Self::InvalidProof => "invalid_proof",
            Self::StaleRoot => "stale_root",
            Self::FieldOverflow => "field_overflow",
            Self::Rejected => "rejected",
            Self::Timeout => "timeout",
            Self::Failed => "failed",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Created => 0,
            Self::Replayed => 1,
            Self::Duplicate => 2,
            Self::InvalidProof => 3,
            Self::StaleRoot => 4,
            Self::FieldOverflow => 5,
            Self::Rejected => 6,
            Self::Timeout => 7,
            Self::Failed => 8,
        }
    }
}

/// Point-in-time copy of the pipeline counters, served on `/v1/stats`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub received: u64,
    pub created: u64,
    pub replayed: u64,
    pub duplicates: u64,
    pub invalid_proofs: u64,
    pub stale_roots: u64,
    pub field_overflows: u64,
    pub rejected: u64,
    pub timeouts: u64,
    pub failed: u64,
    pub average_latency_ms: f64,
    pub uptime_secs: u64,
}
