use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure the atlas, prover, verifier and submission pipeline report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtlasError {
    /// A secret or other derivation input is not a canonical, non-zero field element.
    #[error("Invalid field element: {0}")]
    InvalidFieldElement(String),

    /// A witness or public input is not below the field modulus.
    #[error("Field element overflow: {0}")]
    FieldOverflow(String),

    /// A tree has no free slot left.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// The root was published but has left the staleness window.
    #[error("Stale root: {0}")]
    StaleRoot(String),

    /// The root was never published by this atlas.
    #[error("Unknown root: {0}")]
    UnknownRoot(String),

    /// An inclusion path does not rebuild the claimed root.
    #[error("Path mismatch: {0}")]
    PathMismatch(String),

    /// Proof generation exceeded the caller's deadline.
    #[error("Prover timed out after {0} ms")]
    ProverTimeout(u64),

    /// Proof bytes are malformed or the proof does not verify.
    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    /// The nullifier has already been used by another submission.
    #[error("Duplicate action: nullifier {0} already used")]
    DuplicateAction(String),

    /// The referenced jurisdiction is not defined.
    #[error("Unknown jurisdiction: {0}")]
    UnknownJurisdiction(String),

    /// Parent and child granularity do not form a strict hierarchy.
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// A jurisdiction or leaf with the same identity already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A record lookup found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A submission status may only move forward.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// A snapshot bundle failed its content or root check.
    #[error("Snapshot integrity error: {0}")]
    SnapshotIntegrity(String),

    /// A request field failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A storage operation did not finish within its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key generation, key loading or a constraint system failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// The configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias used across the workspace.
pub type AtlasResult<T> = Result<T, AtlasError>;

/// Coarse failure class, used to decide on retries and user messaging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Input malformation; rejected locally and never retried automatically.
    Malformed,
    /// Root too old; refresh the atlas snapshot and re-prove.
    Stale,
    /// Permanent conflict such as "already submitted".
    Conflict,
    /// Infrastructure hiccup; retry with the same idempotency key.
    Transient,
    /// The referenced record does not exist.
    NotFound,
    /// Operator-side failure.
    Internal,
}

impl AtlasError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFieldElement(_) => "INVALID_FIELD_ELEMENT",
            Self::FieldOverflow(_) => "FIELD_OVERFLOW",
            Self::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            Self::StaleRoot(_) | Self::UnknownRoot(_) => "STALE_ROOT",
            Self::PathMismatch(_) => "PATH_MISMATCH",
            Self::ProverTimeout(_) => "PROVER_TIMEOUT",
            Self::InvalidProof(_) => "INVALID_PROOF",
            Self::DuplicateAction(_) => "DUPLICATE_ACTION",
            Self::UnknownJurisdiction(_) => "UNKNOWN_JURISDICTION",
            Self::InvalidHierarchy(_) => "INVALID_HIERARCHY",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::SnapshotIntegrity(_) => "SNAPSHOT_INTEGRITY",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Storage(_) => "STORAGE_UNAVAILABLE",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Crypto(_) => "CRYPTO_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Failure class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidFieldElement(_)
            | Self::FieldOverflow(_)
            | Self::PathMismatch(_)
            | Self::InvalidProof(_)
            | Self::InvalidHierarchy(_)
            | Self::SnapshotIntegrity(_)
            | Self::Validation(_) => ErrorClass::Malformed,
            Self::StaleRoot(_) | Self::UnknownRoot(_) => ErrorClass::Stale,
            Self::DuplicateAction(_)
            | Self::AlreadyExists(_)
            | Self::CapacityExceeded(_)
            | Self::InvalidStatusTransition { .. } => ErrorClass::Conflict,
            Self::ProverTimeout(_) | Self::Timeout(_) | Self::Storage(_) => ErrorClass::Transient,
            Self::UnknownJurisdiction(_) | Self::NotFound(_) => ErrorClass::NotFound,
            Self::Serialization(_) | Self::Crypto(_) | Self::Config(_) | Self::Internal(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// HTTP-equivalent status code.
    pub fn http_status(&self) -> u16 {
        match self.class() {
            ErrorClass::Malformed | ErrorClass::Stale => 400,
            ErrorClass::Conflict => 409,
            ErrorClass::NotFound => 404,
            ErrorClass::Transient => 503,
            ErrorClass::Internal => 500,
        }
    }

    /// Whether the whole request may be retried unchanged.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_contract_codes() {
        assert_eq!(AtlasError::DuplicateAction("ab".into()).code(), "DUPLICATE_ACTION");
        assert_eq!(AtlasError::DuplicateAction("ab".into()).http_status(), 409);
        assert_eq!(AtlasError::InvalidProof("x".into()).code(), "INVALID_PROOF");
        assert_eq!(AtlasError::InvalidProof("x".into()).http_status(), 400);
        assert_eq!(AtlasError::FieldOverflow("x".into()).code(), "FIELD_OVERFLOW");
        assert_eq!(AtlasError::StaleRoot("x".into()).code(), "STALE_ROOT");
        assert_eq!(AtlasError::UnknownRoot("x".into()).code(), "STALE_ROOT");
        assert_eq!(AtlasError::UnknownRoot("x".into()).http_status(), 400);
    }

    #[test]
    fn test_conflict_distinguishable_from_transient() {
        let conflict = AtlasError::DuplicateAction("ab".into());
        let transient = AtlasError::Storage("db down".into());

        assert_eq!(conflict.class(), ErrorClass::Conflict);
        assert!(!conflict.is_retryable());
        assert_eq!(transient.class(), ErrorClass::Transient);
        assert!(transient.is_retryable());
        assert_eq!(AtlasError::Timeout("tx".into()).http_status(), 503);
    }

    #[test]
    fn test_stale_is_not_retryable_unchanged() {
        let err = AtlasError::StaleRoot("old".into());
        assert_eq!(err.class(), ErrorClass::Stale);
        assert!(!err.is_retryable());
    }
}
