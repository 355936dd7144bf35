#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! Shared types for the Shadow Atlas workspace.
//!
//! Everything in here is plain data: identifiers, wire encodings and the
//! error taxonomy. Field arithmetic lives in `atlas-crypto`.

mod atlas;
mod error;
mod field;
mod jurisdiction;
mod submission;

pub use atlas::{AtlasHead, InclusionPath, PublicInputs, RootRecord, RootTier};
pub use error::{AtlasError, AtlasResult, ErrorClass};
pub use field::{FieldBytes, BN254_SCALAR_MODULUS_BE};
pub use jurisdiction::{Granularity, Jurisdiction, JurisdictionId, JurisdictionKind};
pub use submission::{IdempotencyKey, Submission, SubmissionId, SubmissionStatus};

/// Size of a serialized field element.
pub const FIELD_BYTES_SIZE: usize = 32;

/// Size of a compressed Groth16 proof over BN254.
pub const PROOF_BYTES_SIZE: usize = 128;

/// Default depth of a per-jurisdiction tree (about one million members).
pub const DEFAULT_DISTRICT_DEPTH: usize = 20;

/// Default depth of the global tree of district roots.
pub const DEFAULT_GLOBAL_DEPTH: usize = 12;

/// Upper bound accepted for a district tree depth.
pub const MAX_DISTRICT_DEPTH: usize = 32;

/// Upper bound accepted for the global tree depth.
pub const MAX_GLOBAL_DEPTH: usize = 24;

/// Number of superseded atlas versions kept acceptable by default.
pub const DEFAULT_ROOT_HISTORY_VERSIONS: usize = 64;

/// Seconds a superseded root stays acceptable by default.
pub const DEFAULT_ROOT_MAX_AGE_SECS: u64 = 3_600;

/// Default deadline for the storage part of a submission.
pub const DEFAULT_SUBMISSION_TIMEOUT_MS: u64 = 1_500;
