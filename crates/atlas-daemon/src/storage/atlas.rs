use atlas_types::{
    AtlasError, AtlasHead, AtlasResult, FieldBytes, Jurisdiction, JurisdictionId, RootRecord, RootTier,
};
use sled::transaction::{ConflictableTransactionError, TransactionResult, Transactional};
use std::sync::atomic::Ordering;
use tracing::debug;

use super::{decode, encode, AtlasStorage};

/// Everything one atlas publication writes, committed in a single transaction.
#[derive(Clone, Debug, Default)]
pub struct AtlasUpdate {
    /// New or changed jurisdiction records.
    pub jurisdictions: Vec<Jurisdiction>,
    /// Appended leaves as `(jurisdiction, leaf_index, commitment)`.
    pub leaves: Vec<(JurisdictionId, u64, FieldBytes)>,
    /// Roots published by this update.
    pub roots: Vec<RootRecord>,
    /// The new head.
    pub head: Option<AtlasHead>,
}

fn leaf_prefix(jurisdiction: &JurisdictionId) -> Vec<u8> {
    let mut key = jurisdiction.as_str().as_bytes().to_vec();
    key.push(0);
    key
}

fn leaf_key(jurisdiction: &JurisdictionId, index: u64) -> Vec<u8> {
    let mut key = leaf_prefix(jurisdiction);
    key.extend_from_slice(&index.to_be_bytes());
    key
}

// Global roots are keyed by the bare root; district roots carry the id suffix.
fn root_key(record: &RootRecord) -> Vec<u8> {
    let mut key = record.root.as_bytes().to_vec();
    if let RootTier::District(id) = &record.tier {
        key.extend_from_slice(id.as_str().as_bytes());
    }
    key
}

fn jurisdiction_json(jurisdiction: &Jurisdiction) -> AtlasResult<Vec<u8>> {
    serde_json::to_vec(jurisdiction)
        .map_err(|e| AtlasError::Serialization(format!("Failed to serialize jurisdiction: {}", e)))
}

impl AtlasStorage {
    pub fn commit_atlas_update(&self, update: &AtlasUpdate) -> AtlasResult<()> {
        self.metrics.transactions.fetch_add(1, Ordering::Relaxed);

        let jurisdictions = update
            .jurisdictions
            .iter()
            .map(|j| Ok((j.id.as_str().as_bytes().to_vec(), jurisdiction_json(j)?)))
            .collect::<AtlasResult<Vec<_>>>()?;
        let leaves: Vec<(Vec<u8>, [u8; 32])> = update
            .leaves
            .iter()
            .map(|(id, index, leaf)| (leaf_key(id, *index), *leaf.as_bytes()))
            .collect();
        let roots = update
            .roots
            .iter()
            .map(|r| Ok((root_key(r), encode(r, "root record")?)))
            .collect::<AtlasResult<Vec<_>>>()?;
        let head = match &update.head {
            Some(head) => Some((head.version.to_be_bytes(), encode(head, "atlas head")?)),
            None => None,
        };

        let result: TransactionResult<(), AtlasError> = (
            &self.jurisdictions,
            &self.leaves,
            &self.root_history,
            &self.versions,
        )
            .transaction(|(j_tree, l_tree, r_tree, v_tree)| {
                for (key, value) in &jurisdictions {
                    j_tree.insert(key.as_slice(), value.as_slice())?;
                }
                for (key, leaf) in &leaves {
                    if l_tree.get(key.as_slice())?.is_some() {
                        return Err(ConflictableTransactionError::Abort(AtlasError::AlreadyExists(
                            "leaf slot already written".into(),
                        )));
                    }
                    l_tree.insert(key.as_slice(), &leaf[..])?;
                }
                for (key, value) in &roots {
                    r_tree.insert(key.as_slice(), value.as_slice())?;
                }
                if let Some((key, value)) = &head {
                    v_tree.insert(&key[..], value.as_slice())?;
                }
                Ok(())
            });

        result.map_err(|e| self.transaction_error(e))?;
        self.metrics.writes.fetch_add(1, Ordering::Relaxed);
        self.flush()?;

        if let Some(head) = &update.head {
            debug!(version = head.version, root = %head.global_root.short_hex(), "Atlas update committed");
        }
        Ok(())
    }

    /// All jurisdictions, ordered by global slot.
    pub fn load_jurisdictions(&self) -> AtlasResult<Vec<Jurisdiction>> {
        let mut out = Vec::new();
        for item in self.jurisdictions.iter() {
            let (_, value) = item.map_err(|e| self.read_error("jurisdictions", e))?;
            let jurisdiction: Jurisdiction = serde_json::from_slice(&value)
                .map_err(|e| AtlasError::Serialization(format!("Failed to deserialize jurisdiction: {}", e)))?;
            out.push(jurisdiction);
        }
        out.sort_by_key(|j| j.global_slot);
        self.metrics.reads.fetch_add(out.len() as u64, Ordering::Relaxed);
        Ok(out)
    }

    /// Leaves of one district tree in index order.
    pub fn load_leaves(&self, jurisdiction: &JurisdictionId) -> AtlasResult<Vec<FieldBytes>> {
        let mut out = Vec::new();
        for (expected, item) in self.leaves.scan_prefix(leaf_prefix(jurisdiction)).enumerate() {
            let (key, value) = item.map_err(|e| self.read_error("leaves", e))?;
            let index_bytes: [u8; 8] = key[key.len() - 8..]
                .try_into()
                .map_err(|_| AtlasError::Storage("Invalid leaf key".into()))?;
            if u64::from_be_bytes(index_bytes) != expected as u64 {
                return Err(AtlasError::Storage(format!(
                    "Leaves of {} are not contiguous at index {}",
                    jurisdiction, expected
                )));
            }
            let leaf: [u8; 32] = value
                .as_ref()
                .try_into()
                .map_err(|_| AtlasError::Storage("Invalid leaf value".into()))?;
            out.push(FieldBytes::from_bytes(leaf));
        }
        self.metrics.reads.fetch_add(out.len() as u64, Ordering::Relaxed);
        Ok(out)
    }

    /// Every published head, oldest first.
    pub fn load_heads(&self) -> AtlasResult<Vec<AtlasHead>> {
        let mut out = Vec::new();
        for item in self.versions.iter() {
            let (_, value) = item.map_err(|e| self.read_error("versions", e))?;
            out.push(decode(&value, "atlas head")?);
        }
        Ok(out)
    }

    pub fn latest_head(&self) -> AtlasResult<Option<AtlasHead>> {
        match self.versions.last().map_err(|e| self.read_error("versions", e))? {
            Some((_, value)) => Ok(Some(decode(&value, "atlas head")?)),
            None => Ok(None),
        }
    }

    /// History records for a root value, across tiers.
    pub fn root_records(&self, root: &FieldBytes) -> AtlasResult<Vec<RootRecord>> {
        let mut out = Vec::new();
        for item in self.root_history.scan_prefix(root.as_bytes()) {
            let (_, value) = item.map_err(|e| self.read_error("root history", e))?;
            out.push(decode(&value, "root record")?);
        }
        Ok(out)
    }
}
