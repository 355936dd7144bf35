use atlas_types::{
    AtlasError, AtlasResult, FieldBytes, IdempotencyKey, PublicInputs, Submission, SubmissionId,
    SubmissionStatus,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::verifier::ProofVerifier;
use crate::atlas::RootHistory;
use crate::metrics::{PipelineMetrics, PipelineStats, SubmitOutcome, SubmitTimer};
use crate::storage::{AtlasStorage, InsertOutcome};

/// Largest payload reference accepted with a submission, in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 4096;

/// A proof-backed civic action as received from a client.
#[derive(Clone, Debug)]
pub struct SubmissionRequest {
    pub proof: Vec<u8>,
    pub public_inputs: PublicInputs,
    pub idempotency_key: Option<IdempotencyKey>,
    pub payload: String,
}

/// Successful result of [`SubmissionPipeline::submit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// A new submission was committed.
    Created(Submission),
    /// The idempotency key already owned a submission; it is returned unchanged.
    Replayed(Submission),
}

impl SubmissionOutcome {
    pub fn submission(&self) -> &Submission {
        match self {
            Self::Created(s) | Self::Replayed(s) => s,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, Self::Replayed(_))
    }
}

/// Exactly-once acceptance of proof-backed actions.
///
/// Cheap checks run first (field ranges, proof encoding, index lookups), then
/// the pairing check on a blocking thread, then the insert. The insert is a
/// storage transaction that re-checks both unique indexes, so two racing
/// requests with one nullifier end in one `Created` and one `DuplicateAction`.
pub struct SubmissionPipeline {
    storage: Arc<AtlasStorage>,
    verifier: Arc<dyn ProofVerifier>,
    roots: Arc<RootHistory>,
    transaction_timeout: Duration,
    metrics: Arc<PipelineMetrics>,
}

impl SubmissionPipeline {
    pub fn new(
        storage: Arc<AtlasStorage>,
        verifier: Arc<dyn ProofVerifier>,
        roots: Arc<RootHistory>,
        transaction_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            verifier,
            roots,
            transaction_timeout,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn stats(&self) -> PipelineStats {
        self.metrics.snapshot()
    }

    pub fn verifier_fingerprint(&self) -> &str {
        self.verifier.fingerprint()
    }

    pub async fn submit(&self, request: SubmissionRequest) -> AtlasResult<SubmissionOutcome> {
        let timer = SubmitTimer::start(Arc::clone(&self.metrics));
        let nullifier = request.public_inputs.nullifier.short_hex();

        let result = self.process(request).await;
        match &result {
            Ok(SubmissionOutcome::Created(s)) => {
                info!(id = %s.id, nullifier = %nullifier, "Submission accepted");
                timer.finish(SubmitOutcome::Created);
            }
            Ok(SubmissionOutcome::Replayed(s)) => {
                debug!(id = %s.id, nullifier = %nullifier, "Submission replayed");
                timer.finish(SubmitOutcome::Replayed);
            }
            Err(e) => {
                warn!(code = e.code(), nullifier = %nullifier, "Submission rejected: {}", e);
                timer.finish(SubmitOutcome::from_error_code(e.code()));
            }
        }
        result
    }

    /// Count a request refused before it could be built, such as an
    /// undecodable proof encoding, and hand the error back.
    pub fn reject(&self, error: AtlasError) -> AtlasError {
        let timer = SubmitTimer::start(Arc::clone(&self.metrics));
        warn!(code = error.code(), "Submission rejected: {}", error);
        timer.finish(SubmitOutcome::from_error_code(error.code()));
        error
    }

    async fn process(&self, request: SubmissionRequest) -> AtlasResult<SubmissionOutcome> {
        let SubmissionRequest {
            proof,
            public_inputs,
            idempotency_key,
            payload,
        } = request;

        validate_payload(&payload)?;
        self.verifier.precheck(&proof, &public_inputs)?;

        if let Some(key) = idempotency_key {
            let existing = self
                .storage_call("idempotency lookup", move |s| s.submission_by_idempotency_key(&key))
                .await?;
            if let Some(existing) = existing {
                return Ok(SubmissionOutcome::Replayed(existing));
            }
        }

        let nullifier = public_inputs.nullifier;
        let used = self
            .storage_call("nullifier lookup", move |s| s.submission_by_nullifier(&nullifier))
            .await?;
        if let Some(existing) = used {
            // A concurrent request with our key committed between the two lookups.
            if idempotency_key.is_some() && existing.idempotency_key == idempotency_key {
                return Ok(SubmissionOutcome::Replayed(existing));
            }
            return Err(AtlasError::DuplicateAction(nullifier.short_hex()));
        }

        self.verify(proof, public_inputs).await?;

        let now = Utc::now();
        let submission = Submission {
            id: SubmissionId::new(),
            nullifier,
            idempotency_key,
            status: SubmissionStatus::Pending,
            global_root: public_inputs.global_root,
            action_context_hash: public_inputs.action_context_hash,
            payload_reference: payload,
            created_at: now,
            updated_at: now,
        };

        let outcome = self
            .storage_call("submission insert", move |s| s.insert_submission(&submission))
            .await?;
        Ok(match outcome {
            InsertOutcome::Created(s) => SubmissionOutcome::Created(s),
            InsertOutcome::Existing(s) => SubmissionOutcome::Replayed(s),
        })
    }

    async fn verify(&self, proof: Vec<u8>, inputs: PublicInputs) -> AtlasResult<()> {
        let verifier = Arc::clone(&self.verifier);
        let roots = Arc::clone(&self.roots);
        tokio::task::spawn_blocking(move || {
            verifier.verify(&proof, &inputs, &|root: &FieldBytes| roots.check(root))
        })
        .await
        .map_err(|e| AtlasError::Internal(format!("verification task failed: {}", e)))?
    }

    pub async fn get_submission(&self, id: SubmissionId) -> AtlasResult<Submission> {
        self.storage_call("submission read", move |s| s.get_submission(&id))
            .await?
            .ok_or_else(|| AtlasError::NotFound(format!("submission {}", id)))
    }

    /// Move a submission forward (`pending -> processed -> failed | delivered`).
    pub async fn advance_status(&self, id: SubmissionId, status: SubmissionStatus) -> AtlasResult<Submission> {
        let updated = self
            .storage_call("status update", move |s| {
                s.update_submission_status(&id, status, Utc::now())
            })
            .await?;
        info!(id = %id, status = %status, "Submission status advanced");
        Ok(updated)
    }

    /// Run a storage operation on the blocking pool under the transaction deadline.
    ///
    /// On expiry the operation may still commit; a retry with the same
    /// idempotency key then returns the committed row.
    async fn storage_call<T, F>(&self, what: &'static str, op: F) -> AtlasResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&AtlasStorage) -> AtlasResult<T> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        let handle = tokio::task::spawn_blocking(move || op(&storage));
        match tokio::time::timeout(self.transaction_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(AtlasError::Internal(format!("{} task failed: {}", what, e))),
            Err(_) => Err(AtlasError::Timeout(format!(
                "{} exceeded {} ms",
                what,
                self.transaction_timeout.as_millis()
            ))),
        }
    }
}

fn validate_payload(payload: &str) -> AtlasResult<()> {
    if payload.trim().is_empty() {
        return Err(AtlasError::Validation("payload must not be empty".into()));
    }
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(AtlasError::Validation(format!(
            "payload is {} bytes, limit is {}",
            payload.len(),
            MAX_PAYLOAD_BYTES
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RootHistoryConfig;

    struct AcceptAll;

    impl ProofVerifier for AcceptAll {
        fn precheck(&self, _proof: &[u8], _inputs: &PublicInputs) -> AtlasResult<()> {
            Ok(())
        }

        fn verify(
            &self,
            _proof: &[u8],
            _inputs: &PublicInputs,
            _root_check: &dyn Fn(&FieldBytes) -> AtlasResult<()>,
        ) -> AtlasResult<()> {
            Ok(())
        }

        fn fingerprint(&self) -> &str {
            "accept-all"
        }
    }

    #[tokio::test]
    async fn test_slow_storage_call_times_out() {
        let pipeline = SubmissionPipeline::new(
            Arc::new(AtlasStorage::in_memory().unwrap()),
            Arc::new(AcceptAll),
            Arc::new(RootHistory::new(RootHistoryConfig::default())),
            Duration::from_millis(20),
        );

        let err = pipeline
            .storage_call("slow read", |_| {
                std::thread::sleep(Duration::from_millis(250));
                Ok(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TIMEOUT");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_payload_limits() {
        assert!(validate_payload("ref-1").is_ok());
        assert!(validate_payload("  ").is_err());
        assert!(validate_payload(&"x".repeat(MAX_PAYLOAD_BYTES + 1)).is_err());
    }
}
