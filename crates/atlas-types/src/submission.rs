use crate::error::{AtlasError, AtlasResult};
use crate::field::FieldBytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Server-assigned submission identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    /// Fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Raw 16 bytes, used as the storage key.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Parse the hyphenated form.
    pub fn parse(s: &str) -> AtlasResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| AtlasError::Validation(format!("invalid submission id: {}", e)))
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubmissionId({})", self.0)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-chosen key, generated once per logical attempt and reused on retry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(pub Uuid);

impl IdempotencyKey {
    /// Fresh random key.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Raw 16 bytes, used as the storage key.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for IdempotencyKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdempotencyKey({})", self.0)
    }
}

/// Lifecycle of an accepted submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Accepted, not yet handed to delivery.
    Pending,
    /// Picked up by the delivery collaborator.
    Processed,
    /// Delivery failed permanently.
    Failed,
    /// Delivered downstream.
    Delivered,
}

impl SubmissionStatus {
    /// Whether a submission may move from `self` to `next`.
    ///
    /// Only `pending -> processed -> failed | delivered` is allowed.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processed)
                | (Self::Processed, Self::Failed)
                | (Self::Processed, Self::Delivered)
        )
    }

    /// Whether no further transition exists.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Delivered)
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Delivered => "delivered",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted civic action. Exactly one exists per nullifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Identifier.
    pub id: SubmissionId,
    /// Nullifier the action was accepted under.
    pub nullifier: FieldBytes,
    /// Key of the request that created the row.
    pub idempotency_key: Option<IdempotencyKey>,
    /// Current status.
    pub status: SubmissionStatus,
    /// Global root the proof was verified against.
    pub global_root: FieldBytes,
    /// Action context the proof was bound to.
    pub action_context_hash: FieldBytes,
    /// Opaque reference to the payload held by the delivery collaborator.
    pub payload_reference: String,
    /// Acceptance time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}
