use atlas_crypto::{IdentitySecret, MembershipProof, MembershipProver};
use atlas_types::{AtlasError, AtlasResult, FieldBytes, InclusionPath};
use rand::rngs::OsRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Runs Groth16 proving on the blocking pool with an optional deadline.
///
/// A timed-out proof is abandoned, not cancelled: the blocking task runs to
/// completion and its result is dropped. The same witness may be retried.
#[derive(Clone)]
pub struct ProvingClient {
    prover: Arc<MembershipProver>,
    timeout: Option<Duration>,
}

impl ProvingClient {
    pub fn new(prover: MembershipProver, timeout: Option<Duration>) -> Self {
        Self {
            prover: Arc::new(prover),
            timeout,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn prove(
        &self,
        secret: IdentitySecret,
        commitment: FieldBytes,
        path: InclusionPath,
        action_context: String,
    ) -> AtlasResult<MembershipProof> {
        let prover = Arc::clone(&self.prover);
        let started = Instant::now();
        let handle = tokio::task::spawn_blocking(move || {
            prover.prove(&secret, &commitment, &path, &action_context, &mut OsRng)
        });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    let ms = limit.as_millis() as u64;
                    warn!(timeout_ms = ms, "Proof generation timed out");
                    return Err(AtlasError::ProverTimeout(ms));
                }
            },
            None => handle.await,
        };

        let proof = joined.map_err(|e| AtlasError::Internal(format!("proving task failed: {}", e)))??;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            nullifier = %proof.public_inputs.nullifier.short_hex(),
            "Membership proof generated"
        );
        Ok(proof)
    }
}
