use crate::field::FieldBytes;
use crate::jurisdiction::JurisdictionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public inputs of a membership proof, in circuit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicInputs {
    /// Global atlas root the proof was built against.
    pub global_root: FieldBytes,
    /// Per-(identity, action) nullifier.
    pub nullifier: FieldBytes,
    /// Hash of the action context.
    pub action_context_hash: FieldBytes,
}

impl PublicInputs {
    /// Inputs as the ordered list the verifier consumes.
    pub fn to_array(&self) -> [FieldBytes; 3] {
        [self.global_root, self.nullifier, self.action_context_hash]
    }

    /// Name of the first input that is not below the field modulus.
    pub fn first_non_canonical(&self) -> Option<&'static str> {
        [
            ("global_root", &self.global_root),
            ("nullifier", &self.nullifier),
            ("action_context_hash", &self.action_context_hash),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_canonical())
        .map(|(name, _)| name)
    }
}

/// Everything a prover needs to show that a leaf sits under a global root.
///
/// Bit `k` of `leaf_index` (resp. `global_position`) is 1 when the node at
/// level `k` is a right child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionPath {
    /// Jurisdiction the leaf belongs to.
    pub jurisdiction: JurisdictionId,
    /// Leaf index inside the district tree.
    pub leaf_index: u64,
    /// Sibling hashes from the leaf level upward, one per district level.
    pub district_siblings: Vec<FieldBytes>,
    /// Root of the district tree.
    pub district_root: FieldBytes,
    /// Slot of the district root in the global tree.
    pub global_position: u64,
    /// Sibling hashes in the global tree, one per global level.
    pub global_siblings: Vec<FieldBytes>,
    /// Global root the path leads to.
    pub global_root: FieldBytes,
    /// Atlas version that published `global_root`.
    pub atlas_version: u64,
}

/// Which tree a published root belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootTier {
    /// Root of the global tree.
    Global,
    /// Root of one district tree.
    District(JurisdictionId),
}

/// One entry of the root history log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootRecord {
    /// The root value.
    pub root: FieldBytes,
    /// Tree the root belongs to.
    pub tier: RootTier,
    /// Atlas version that published it.
    pub version: u64,
    /// Publication time.
    pub published_at: DateTime<Utc>,
}

/// Current head of the atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasHead {
    /// Monotonic version.
    pub version: u64,
    /// Current global root.
    pub global_root: FieldBytes,
    /// Publication time.
    pub published_at: DateTime<Utc>,
}
