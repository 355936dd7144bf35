use atlas_types::{
    AtlasError, AtlasResult, FieldBytes, IdempotencyKey, Submission, SubmissionId, SubmissionStatus,
};
use chrono::{DateTime, Utc};
use sled::transaction::{ConflictableTransactionError, TransactionResult, Transactional};
use std::sync::atomic::Ordering;
use tracing::debug;

use super::{decode, encode, AtlasStorage};

/// Result of an atomic submission insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was committed.
    Created(Submission),
    /// The idempotency key already owns a row; it is returned unchanged.
    Existing(Submission),
}

impl InsertOutcome {
    pub fn submission(&self) -> &Submission {
        match self {
            Self::Created(s) | Self::Existing(s) => s,
        }
    }

    pub fn into_submission(self) -> Submission {
        match self {
            Self::Created(s) | Self::Existing(s) => s,
        }
    }
}

impl AtlasStorage {
    /// Insert a submission under both unique indexes in one transaction.
    ///
    /// An idempotency-key hit wins over a nullifier hit, so a retried request
    /// gets its original row back instead of `DuplicateAction`.
    pub fn insert_submission(&self, submission: &Submission) -> AtlasResult<InsertOutcome> {
        self.metrics.transactions.fetch_add(1, Ordering::Relaxed);

        let id_key = *submission.id.as_bytes();
        let nullifier_key = *submission.nullifier.as_bytes();
        let idem_key = submission.idempotency_key.map(|k| *k.as_bytes());
        let value = encode(submission, "submission")?;

        let result: TransactionResult<InsertOutcome, AtlasError> = (
            &self.submissions,
            &self.submission_nullifiers,
            &self.submission_idempotency,
        )
            .transaction(|(submissions, nullifiers, idempotency)| {
                if let Some(key) = idem_key {
                    if let Some(existing_id) = idempotency.get(key)? {
                        let bytes = submissions.get(&existing_id)?.ok_or_else(|| {
                            ConflictableTransactionError::Abort(AtlasError::Storage(
                                "idempotency index points at a missing submission".into(),
                            ))
                        })?;
                        let existing: Submission =
                            decode(&bytes, "submission").map_err(ConflictableTransactionError::Abort)?;
                        return Ok(InsertOutcome::Existing(existing));
                    }
                }

                if nullifiers.get(nullifier_key)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(AtlasError::DuplicateAction(
                        submission.nullifier.short_hex(),
                    )));
                }

                if submissions.get(id_key)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(AtlasError::AlreadyExists(
                        format!("submission {}", submission.id),
                    )));
                }

                submissions.insert(&id_key[..], value.as_slice())?;
                nullifiers.insert(&nullifier_key[..], &id_key[..])?;
                if let Some(key) = idem_key {
                    idempotency.insert(&key[..], &id_key[..])?;
                }
                Ok(InsertOutcome::Created(submission.clone()))
            });

        let outcome = result.map_err(|e| self.transaction_error(e))?;
        if let InsertOutcome::Created(created) = &outcome {
            self.metrics.writes.fetch_add(1, Ordering::Relaxed);
            if self.storage_config.sync_submissions {
                self.flush()?;
            }
            debug!(id = %created.id, nullifier = %created.nullifier.short_hex(), "Submission committed");
        }
        Ok(outcome)
    }

    pub fn get_submission(&self, id: &SubmissionId) -> AtlasResult<Option<Submission>> {
        self.metrics.reads.fetch_add(1, Ordering::Relaxed);
        match self
            .submissions
            .get(id.as_bytes())
            .map_err(|e| self.read_error("submission", e))?
        {
            Some(bytes) => Ok(Some(decode(&bytes, "submission")?)),
            None => Ok(None),
        }
    }

    pub fn submission_by_idempotency_key(&self, key: &IdempotencyKey) -> AtlasResult<Option<Submission>> {
        self.metrics.reads.fetch_add(1, Ordering::Relaxed);
        let id = self
            .submission_idempotency
            .get(key.as_bytes())
            .map_err(|e| self.read_error("idempotency index", e))?;
        self.resolve_index(id)
    }

    pub fn submission_by_nullifier(&self, nullifier: &FieldBytes) -> AtlasResult<Option<Submission>> {
        self.metrics.reads.fetch_add(1, Ordering::Relaxed);
        let id = self
            .submission_nullifiers
            .get(nullifier.as_bytes())
            .map_err(|e| self.read_error("nullifier index", e))?;
        self.resolve_index(id)
    }

    fn resolve_index(&self, id: Option<sled::IVec>) -> AtlasResult<Option<Submission>> {
        let Some(id) = id else {
            return Ok(None);
        };
        let bytes = self
            .submissions
            .get(&id)
            .map_err(|e| self.read_error("submission", e))?
            .ok_or_else(|| AtlasError::Storage("index points at a missing submission".into()))?;
        Ok(Some(decode(&bytes, "submission")?))
    }

    /// Move a submission forward; backward or sideways moves are refused.
    pub fn update_submission_status(
        &self,
        id: &SubmissionId,
        status: SubmissionStatus,
        now: DateTime<Utc>,
    ) -> AtlasResult<Submission> {
        self.metrics.transactions.fetch_add(1, Ordering::Relaxed);
        let key = *id.as_bytes();

        let result: TransactionResult<Submission, AtlasError> = self.submissions.transaction(|tx| {
            let bytes = tx.get(key)?.ok_or_else(|| {
                ConflictableTransactionError::Abort(AtlasError::NotFound(format!("submission {}", id)))
            })?;
            let mut submission: Submission =
                decode(&bytes, "submission").map_err(ConflictableTransactionError::Abort)?;

            if !submission.status.can_transition_to(status) {
                return Err(ConflictableTransactionError::Abort(AtlasError::InvalidStatusTransition {
                    from: submission.status.to_string(),
                    to: status.to_string(),
                }));
            }

            submission.status = status;
            submission.updated_at = now;
            let value = encode(&submission, "submission").map_err(ConflictableTransactionError::Abort)?;
            tx.insert(&key[..], value)?;
            Ok(submission)
        });

        let updated = result.map_err(|e| self.transaction_error(e))?;
        self.metrics.writes.fetch_add(1, Ordering::Relaxed);
        Ok(updated)
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(nullifier_byte: u8, key: Option<IdempotencyKey>) -> Submission {
        let now = Utc::now();
        let mut nullifier = [0u8; 32];
        nullifier[31] = nullifier_byte;
        Submission {
            id: SubmissionId::new(),
            nullifier: FieldBytes::from_bytes(nullifier),
            idempotency_key: key,
            status: SubmissionStatus::Pending,
            global_root: FieldBytes::from_bytes([1; 32]),
            action_context_hash: FieldBytes::from_bytes([2; 32]),
            payload_reference: "payload-1".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let storage = AtlasStorage::in_memory().unwrap();
        let s = submission(1, None);
        let outcome = storage.insert_submission(&s).unwrap();
        assert!(matches!(outcome, InsertOutcome::Created(_)));
        assert_eq!(storage.get_submission(&s.id).unwrap(), Some(s.clone()));
        assert_eq!(storage.submission_by_nullifier(&s.nullifier).unwrap(), Some(s));
        assert_eq!(storage.submission_count(), 1);
    }

    #[test]
    fn test_direct_insert_respects_nullifier_uniqueness() {
        let storage = AtlasStorage::in_memory().unwrap();
        storage.insert_submission(&submission(7, None)).unwrap();

        let err = storage.insert_submission(&submission(7, None)).unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_ACTION");
        assert_eq!(storage.submission_count(), 1);
    }

    #[test]
    fn test_idempotency_key_returns_original_row() {
        let storage = AtlasStorage::in_memory().unwrap();
        let key = IdempotencyKey::new();
        let first = submission(3, Some(key));
        storage.insert_submission(&first).unwrap();

        let retry = submission(3, Some(key));
        match storage.insert_submission(&retry).unwrap() {
            InsertOutcome::Existing(existing) => assert_eq!(existing.id, first.id),
            other => panic!("expected replay, got {:?}", other),
        }
        assert_eq!(storage.submission_by_idempotency_key(&key).unwrap().unwrap().id, first.id);
        assert_eq!(storage.submission_count(), 1);
    }

    #[test]
    fn test_new_key_same_nullifier_is_duplicate() {
        let storage = AtlasStorage::in_memory().unwrap();
        storage.insert_submission(&submission(4, Some(IdempotencyKey::new()))).unwrap();
        let err = storage
            .insert_submission(&submission(4, Some(IdempotencyKey::new())))
            .unwrap_err();
        assert!(matches!(err, AtlasError::DuplicateAction(_)));
    }

    #[test]
    fn test_status_moves_forward_only() {
        let storage = AtlasStorage::in_memory().unwrap();
        let s = submission(5, None);
        storage.insert_submission(&s).unwrap();

        let updated = storage
            .update_submission_status(&s.id, SubmissionStatus::Processed, Utc::now())
            .unwrap();
        assert_eq!(updated.status, SubmissionStatus::Processed);

        let err = storage
            .update_submission_status(&s.id, SubmissionStatus::Pending, Utc::now())
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATUS_TRANSITION");

        storage
            .update_submission_status(&s.id, SubmissionStatus::Delivered, Utc::now())
            .unwrap();
        let err = storage
            .update_submission_status(&s.id, SubmissionStatus::Failed, Utc::now())
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATUS_TRANSITION");
    }

    #[test]
    fn test_status_of_unknown_submission() {
        let storage = AtlasStorage::in_memory().unwrap();
        let err = storage
            .update_submission_status(&SubmissionId::new(), SubmissionStatus::Processed, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AtlasError::NotFound(_)));
    }
}
