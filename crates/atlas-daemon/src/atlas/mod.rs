//! The Shadow Atlas: per-jurisdiction district trees under one global tree.

mod history;
mod manager;
mod snapshot;

pub use history::{HistoryEntry, RootHistory};
pub use manager::{AtlasView, LeafInsertion, Registration, ShadowAtlas};
pub use snapshot::{
    content_id, DistrictSnapshot, EncodedSnapshot, OpenedSnapshot, SnapshotBundle, SNAPSHOT_FORMAT_VERSION,
};

use atlas_crypto::{fr_to_field_bytes, FixedMerkleTree};
use atlas_types::{AtlasResult, InclusionPath, JurisdictionId};

pub(crate) fn build_inclusion_path(
    jurisdiction: &JurisdictionId,
    district: &FixedMerkleTree,
    global_slot: u64,
    global: &FixedMerkleTree,
    leaf_index: u64,
    atlas_version: u64,
) -> AtlasResult<InclusionPath> {
    let district_siblings = district.path(leaf_index)?;
    let global_siblings = global.path(global_slot)?;
    Ok(InclusionPath {
        jurisdiction: jurisdiction.clone(),
        leaf_index,
        district_siblings: district_siblings.iter().map(fr_to_field_bytes).collect(),
        district_root: fr_to_field_bytes(&district.root()),
        global_position: global_slot,
        global_siblings: global_siblings.iter().map(fr_to_field_bytes).collect(),
        global_root: fr_to_field_bytes(&global.root()),
        atlas_version,
    })
}
