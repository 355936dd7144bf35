mod pipeline;
mod prover;
mod verifier;

pub use pipeline::{SubmissionOutcome, SubmissionPipeline, SubmissionRequest, MAX_PAYLOAD_BYTES};
pub use prover::ProvingClient;
pub use verifier::{generate_keys, Groth16Verifier, ProofVerifier};
