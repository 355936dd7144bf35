//! Content-addressed atlas snapshots for distribution to provers.
//!
//! A bundle carries every district's leaves. Opening one checks the BLAKE3
//! content id, rebuilds every district tree and the global tree, and refuses
//! the bundle unless every recomputed root matches the recorded one.

use atlas_crypto::{field_bytes_to_fr, fr_to_field_bytes, CircuitParams, FixedMerkleTree, Fr};
use atlas_types::{
    AtlasError, AtlasHead, AtlasResult, FieldBytes, InclusionPath, JurisdictionId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::build_inclusion_path;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictSnapshot {
    pub jurisdiction: JurisdictionId,
    pub global_slot: u64,
    pub root: FieldBytes,
    pub leaves: Vec<FieldBytes>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBundle {
    pub format_version: u32,
    pub district_depth: u32,
    pub global_depth: u32,
    pub atlas_version: u64,
    pub global_root: FieldBytes,
    pub published_at: DateTime<Utc>,
    /// Ordered by global slot.
    pub districts: Vec<DistrictSnapshot>,
}

impl SnapshotBundle {
    pub fn head(&self) -> AtlasHead {
        AtlasHead {
            version: self.atlas_version,
            global_root: self.global_root,
            published_at: self.published_at,
        }
    }

    pub fn encode(&self) -> AtlasResult<EncodedSnapshot> {
        let bytes = bincode::serialize(self)
            .map_err(|e| AtlasError::Serialization(format!("Failed to encode snapshot: {}", e)))?;
        Ok(EncodedSnapshot {
            content_id: content_id(&bytes),
            atlas_version: self.atlas_version,
            bytes,
        })
    }
}

/// Encoded bundle plus its content id.
#[derive(Clone, Debug)]
pub struct EncodedSnapshot {
    pub content_id: String,
    pub atlas_version: u64,
    pub bytes: Vec<u8>,
}

/// BLAKE3 hex digest of the encoded bundle.
pub fn content_id(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

fn integrity(message: impl Into<String>) -> AtlasError {
    AtlasError::SnapshotIntegrity(message.into())
}

#[derive(Debug)]
struct OpenedDistrict {
    global_slot: u64,
    tree: FixedMerkleTree,
    positions: HashMap<FieldBytes, u64>,
}

/// A verified, self-consistent local copy of the atlas.
#[derive(Debug)]
pub struct OpenedSnapshot {
    content_id: String,
    params: CircuitParams,
    head: AtlasHead,
    global: FixedMerkleTree,
    districts: HashMap<JurisdictionId, OpenedDistrict>,
}

impl OpenedSnapshot {
    /// Decode and verify a bundle; `expected_content_id` is checked when given.
    pub fn open(bytes: &[u8], expected_content_id: Option<&str>) -> AtlasResult<Self> {
        let actual = content_id(bytes);
        if let Some(expected) = expected_content_id {
            if !expected.eq_ignore_ascii_case(&actual) {
                return Err(integrity(format!(
                    "content id mismatch: expected {}, got {}",
                    expected, actual
                )));
            }
        }

        let bundle: SnapshotBundle = bincode::deserialize(bytes)
            .map_err(|e| integrity(format!("undecodable bundle: {}", e)))?;
        if bundle.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(integrity(format!(
                "unsupported snapshot format {}",
                bundle.format_version
            )));
        }

        let params = CircuitParams::new(bundle.district_depth as usize, bundle.global_depth as usize)
            .map_err(|e| integrity(e.to_string()))?;

        let mut districts = HashMap::with_capacity(bundle.districts.len());
        let mut district_roots = Vec::with_capacity(bundle.districts.len());
        for (slot, district) in bundle.districts.iter().enumerate() {
            if district.global_slot != slot as u64 {
                return Err(integrity(format!(
                    "{} claims slot {} at position {}",
                    district.jurisdiction, district.global_slot, slot
                )));
            }
            let leaves = district
                .leaves
                .iter()
                .map(|leaf| field_bytes_to_fr(leaf, "leaf"))
                .collect::<AtlasResult<Vec<Fr>>>()
                .map_err(|e| integrity(e.to_string()))?;
            let tree = FixedMerkleTree::from_leaves(params.district_depth, &leaves)
                .map_err(|e| integrity(e.to_string()))?;
            let root = fr_to_field_bytes(&tree.root());
            if root != district.root {
                return Err(integrity(format!("district root of {} does not match", district.jurisdiction)));
            }
            let positions = district
                .leaves
                .iter()
                .enumerate()
                .map(|(i, leaf)| (*leaf, i as u64))
                .collect();
            district_roots.push(tree.root());
            let previous = districts.insert(
                district.jurisdiction.clone(),
                OpenedDistrict {
                    global_slot: district.global_slot,
                    tree,
                    positions,
                },
            );
            if previous.is_some() {
                return Err(integrity(format!("{} appears twice", district.jurisdiction)));
            }
        }

        let global = FixedMerkleTree::from_leaves(params.global_depth, &district_roots)
            .map_err(|e| integrity(e.to_string()))?;
        if fr_to_field_bytes(&global.root()) != bundle.global_root {
            return Err(integrity("global root does not match the recomputed tree"));
        }

        Ok(Self {
            content_id: actual,
            params,
            head: bundle.head(),
            global,
            districts,
        })
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn params(&self) -> CircuitParams {
        self.params
    }

    pub fn head(&self) -> AtlasHead {
        self.head
    }

    pub fn global_root(&self) -> FieldBytes {
        self.head.global_root
    }

    pub fn jurisdiction_count(&self) -> usize {
        self.districts.len()
    }

    /// Leaf index of `commitment` in one district tree.
    pub fn find_leaf(&self, jurisdiction: &JurisdictionId, commitment: &FieldBytes) -> AtlasResult<u64> {
        let district = self
            .districts
            .get(jurisdiction)
            .ok_or_else(|| AtlasError::UnknownJurisdiction(jurisdiction.to_string()))?;
        district
            .positions
            .get(commitment)
            .copied()
            .ok_or_else(|| AtlasError::NotFound(format!("commitment not registered in {}", jurisdiction)))
    }

    pub fn inclusion_path(&self, jurisdiction: &JurisdictionId, leaf_index: u64) -> AtlasResult<InclusionPath> {
        let district = self
            .districts
            .get(jurisdiction)
            .ok_or_else(|| AtlasError::UnknownJurisdiction(jurisdiction.to_string()))?;
        build_inclusion_path(
            jurisdiction,
            &district.tree,
            district.global_slot,
            &self.global,
            leaf_index,
            self.head.version,
        )
    }
}
