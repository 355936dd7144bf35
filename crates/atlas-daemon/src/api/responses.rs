use atlas_types::{
    FieldBytes, IdempotencyKey, JurisdictionId, JurisdictionKind, PublicInputs, Submission, SubmissionId,
    SubmissionStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::atlas::HistoryEntry;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: String,
    pub version: String,
    pub atlas_version: u64,
    pub uptime_secs: u64,
}

#[derive(Deserialize)]
pub struct DefineJurisdictionRequest {
    pub id: JurisdictionId,
    pub kind: JurisdictionKind,
    #[serde(default)]
    pub parent: Option<JurisdictionId>,
}

#[derive(Deserialize)]
pub struct RegisterCommitmentRequest {
    pub jurisdictions: Vec<JurisdictionId>,
    pub commitment: FieldBytes,
}

#[derive(Serialize, Deserialize)]
pub struct RootResponse {
    pub global_root: FieldBytes,
    pub atlas_version: u64,
    pub published_at: DateTime<Utc>,
    pub district_depth: usize,
    pub global_depth: usize,
    pub jurisdictions: usize,
    pub total_leaves: u64,
    pub vk_hash: String,
}

#[derive(Serialize)]
pub struct RootHistoryResponse {
    pub max_versions: usize,
    pub max_age_secs: u64,
    pub roots: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Wire form of a submission request; the proof is base64.
#[derive(Serialize, Deserialize)]
pub struct SubmitRequest {
    pub proof: String,
    pub public_inputs: PublicInputs,
    #[serde(default)]
    pub idempotency_key: Option<IdempotencyKey>,
    pub payload: String,
}

#[derive(Serialize, Deserialize)]
pub struct SubmitResponse {
    pub submission_id: SubmissionId,
    pub status: SubmissionStatus,
    pub replayed: bool,
}

#[derive(Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub submission_id: SubmissionId,
    pub status: SubmissionStatus,
    pub nullifier: FieldBytes,
    pub global_root: FieldBytes,
    pub action_context_hash: FieldBytes,
    pub payload_reference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Submission> for SubmissionResponse {
    fn from(s: Submission) -> Self {
        Self {
            submission_id: s.id,
            status: s.status,
            nullifier: s.nullifier,
            global_root: s.global_root,
            action_context_hash: s.action_context_hash,
            payload_reference: s.payload_reference,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct AdvanceStatusRequest {
    pub status: SubmissionStatus,
}
