use atlas_crypto::{field_bytes_to_fr, fr_to_field_bytes, CircuitParams, FixedMerkleTree};
use atlas_types::{
    AtlasError, AtlasHead, AtlasResult, FieldBytes, InclusionPath, Jurisdiction, JurisdictionId,
    JurisdictionKind, RootRecord, RootTier,
};
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::history::RootHistory;
use super::snapshot::{DistrictSnapshot, EncodedSnapshot, SnapshotBundle, SNAPSHOT_FORMAT_VERSION};
use super::build_inclusion_path;
use crate::config::RootHistoryConfig;
use crate::storage::{AtlasStorage, AtlasUpdate, StorageMetrics};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeafInsertion {
    pub jurisdiction: JurisdictionId,
    pub leaf_index: u64,
    pub district_root: FieldBytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub insertions: Vec<LeafInsertion>,
    pub atlas_version: u64,
    pub global_root: FieldBytes,
}

/// Immutable view published after every update.
#[derive(Clone, Debug)]
pub struct AtlasView {
    pub head: AtlasHead,
    pub jurisdictions: BTreeMap<JurisdictionId, Jurisdiction>,
    pub district_roots: BTreeMap<JurisdictionId, FieldBytes>,
    pub total_leaves: u64,
}

struct District {
    record: Jurisdiction,
    tree: FixedMerkleTree,
    positions: HashMap<FieldBytes, u64>,
}

struct AtlasState {
    params: CircuitParams,
    districts: HashMap<JurisdictionId, District>,
    slots: Vec<JurisdictionId>,
    global: FixedMerkleTree,
    head: AtlasHead,
}

impl AtlasState {
    /// Rebuild every tree from storage and check it against the last head.
    fn load(storage: &AtlasStorage, params: CircuitParams) -> AtlasResult<(Self, Vec<AtlasHead>)> {
        let mut districts = HashMap::new();
        let mut slots = Vec::new();
        let mut roots = Vec::new();

        for (slot, record) in storage.load_jurisdictions()?.into_iter().enumerate() {
            if record.global_slot != slot as u64 {
                return Err(AtlasError::SnapshotIntegrity(format!(
                    "{} holds slot {} but slot {} is next",
                    record.id, record.global_slot, slot
                )));
            }
            let leaves = storage.load_leaves(&record.id)?;
            if leaves.len() as u64 != record.leaf_count {
                return Err(AtlasError::SnapshotIntegrity(format!(
                    "{} records {} leaves, storage holds {}",
                    record.id,
                    record.leaf_count,
                    leaves.len()
                )));
            }
            let fields = leaves
                .iter()
                .map(|leaf| field_bytes_to_fr(leaf, "leaf"))
                .collect::<AtlasResult<Vec<_>>>()?;
            let tree = FixedMerkleTree::from_leaves(params.district_depth, &fields)?;
            let positions = leaves.iter().enumerate().map(|(i, l)| (*l, i as u64)).collect();

            roots.push(tree.root());
            slots.push(record.id.clone());
            districts.insert(
                record.id.clone(),
                District {
                    record,
                    tree,
                    positions,
                },
            );
        }

        let global = FixedMerkleTree::from_leaves(params.global_depth, &roots)?;
        let rebuilt_root = fr_to_field_bytes(&global.root());
        let heads = storage.load_heads()?;

        let head = match heads.last() {
            Some(head) => {
                if head.global_root != rebuilt_root {
                    return Err(AtlasError::SnapshotIntegrity(format!(
                        "rebuilt global root {} does not match version {} ({})",
                        rebuilt_root.short_hex(),
                        head.version,
                        head.global_root.short_hex()
                    )));
                }
                *head
            }
            None => AtlasHead {
                version: 0,
                global_root: rebuilt_root,
                published_at: Utc::now(),
            },
        };

        Ok((
            Self {
                params,
                districts,
                slots,
                global,
                head,
            },
            heads,
        ))
    }

    fn view(&self) -> AtlasView {
        let mut jurisdictions = BTreeMap::new();
        let mut district_roots = BTreeMap::new();
        let mut total_leaves = 0;
        for (id, district) in &self.districts {
            jurisdictions.insert(id.clone(), district.record.clone());
            district_roots.insert(id.clone(), fr_to_field_bytes(&district.tree.root()));
            total_leaves += district.tree.len();
        }
        AtlasView {
            head: self.head,
            jurisdictions,
            district_roots,
            total_leaves,
        }
    }

    fn bundle(&self) -> SnapshotBundle {
        let districts = self
            .slots
            .iter()
            .filter_map(|id| self.districts.get(id))
            .map(|d| DistrictSnapshot {
                jurisdiction: d.record.id.clone(),
                global_slot: d.record.global_slot,
                root: fr_to_field_bytes(&d.tree.root()),
                leaves: d.tree.leaves().iter().map(fr_to_field_bytes).collect(),
            })
            .collect();
        SnapshotBundle {
            format_version: SNAPSHOT_FORMAT_VERSION,
            district_depth: self.params.district_depth as u32,
            global_depth: self.params.global_depth as u32,
            atlas_version: self.head.version,
            global_root: self.head.global_root,
            published_at: self.head.published_at,
            districts,
        }
    }
}

/// Owner of the two-tier tree.
///
/// Writes are serialized by an async mutex. Readers take the published
/// `Arc<AtlasView>` and never observe a half-applied update.
pub struct ShadowAtlas {
    params: CircuitParams,
    storage: Arc<AtlasStorage>,
    history: Arc<RootHistory>,
    state: Mutex<AtlasState>,
    published: RwLock<Arc<AtlasView>>,
    bundle_cache: parking_lot::Mutex<Option<Arc<EncodedSnapshot>>>,
}

impl ShadowAtlas {
    /// Rebuild the atlas from storage, publishing version 0 on a fresh database.
    pub fn open(
        storage: Arc<AtlasStorage>,
        params: CircuitParams,
        history_config: RootHistoryConfig,
    ) -> AtlasResult<Self> {
        params.validate()?;
        let (state, mut heads) = AtlasState::load(&storage, params)?;

        if heads.is_empty() {
            let genesis = state.head;
            storage.commit_atlas_update(&AtlasUpdate {
                roots: vec![RootRecord {
                    root: genesis.global_root,
                    tier: RootTier::Global,
                    version: genesis.version,
                    published_at: genesis.published_at,
                }],
                head: Some(genesis),
                ..Default::default()
            })?;
            heads.push(genesis);
            info!(root = %genesis.global_root.short_hex(), "Initialized empty atlas");
        }

        let history = Arc::new(RootHistory::from_heads(history_config, &heads));
        let view = Arc::new(state.view());
        info!(
            version = view.head.version,
            jurisdictions = view.jurisdictions.len(),
            leaves = view.total_leaves,
            root = %view.head.global_root.short_hex(),
            "Atlas loaded"
        );

        Ok(Self {
            params,
            storage,
            history,
            state: Mutex::new(state),
            published: RwLock::new(view),
            bundle_cache: parking_lot::Mutex::new(None),
        })
    }

    pub fn params(&self) -> CircuitParams {
        self.params
    }

    pub fn storage_metrics(&self) -> Arc<StorageMetrics> {
        self.storage.storage_metrics()
    }

    pub fn history(&self) -> Arc<RootHistory> {
        Arc::clone(&self.history)
    }

    pub fn view(&self) -> Arc<AtlasView> {
        Arc::clone(&self.published.read())
    }

    pub fn head(&self) -> AtlasHead {
        self.published.read().head
    }

    pub fn current_global_root(&self) -> FieldBytes {
        self.published.read().head.global_root
    }

    /// Whether `root` is still acceptable for a proof.
    pub fn check_root(&self, root: &FieldBytes) -> AtlasResult<()> {
        self.history.check(root)
    }

    pub fn jurisdiction(&self, id: &JurisdictionId) -> AtlasResult<Jurisdiction> {
        self.published
            .read()
            .jurisdictions
            .get(id)
            .cloned()
            .ok_or_else(|| AtlasError::UnknownJurisdiction(id.to_string()))
    }

    /// Define a jurisdiction and give it the next global slot.
    pub async fn define_jurisdiction(
        &self,
        id: JurisdictionId,
        kind: JurisdictionKind,
        parent: Option<JurisdictionId>,
    ) -> AtlasResult<Jurisdiction> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if state.districts.contains_key(&id) {
            return Err(AtlasError::AlreadyExists(format!("jurisdiction {}", id)));
        }
        if let Some(parent_id) = &parent {
            let parent_district = state
                .districts
                .get(parent_id)
                .ok_or_else(|| AtlasError::UnknownJurisdiction(parent_id.to_string()))?;
            let parent_level = parent_district.record.granularity();
            if !parent_level.is_coarser_than(&kind.granularity()) {
                return Err(AtlasError::InvalidHierarchy(format!(
                    "{} ({:?}) is not coarser than {} ({:?})",
                    parent_id,
                    parent_level,
                    id,
                    kind.granularity()
                )));
            }
        }

        let slot = state.slots.len() as u64;
        if slot >= state.global.capacity() {
            return Err(AtlasError::CapacityExceeded(format!(
                "global tree holds {} jurisdictions",
                state.global.capacity()
            )));
        }

        let tree = FixedMerkleTree::new(self.params.district_depth)?;
        let record = Jurisdiction {
            id: id.clone(),
            kind,
            parent,
            global_slot: slot,
            leaf_count: 0,
            created_at: Utc::now(),
        };

        state.global.push(tree.root())?;
        state.slots.push(id.clone());
        state.districts.insert(
            id.clone(),
            District {
                record: record.clone(),
                tree,
                positions: HashMap::new(),
            },
        );

        let update = AtlasUpdate {
            jurisdictions: vec![record.clone()],
            ..Default::default()
        };
        self.publish(state, update, std::slice::from_ref(&id))?;
        info!(jurisdiction = %id, slot, "Defined jurisdiction");
        Ok(record)
    }

    /// Append `commitment` to every listed district and publish one new version.
    ///
    /// All targets are validated before any tree changes.
    pub async fn register_commitment(
        &self,
        jurisdictions: &[JurisdictionId],
        commitment: FieldBytes,
    ) -> AtlasResult<Registration> {
        if jurisdictions.is_empty() {
            return Err(AtlasError::Validation("at least one jurisdiction is required".into()));
        }
        let mut seen = HashSet::new();
        for id in jurisdictions {
            if !seen.insert(id) {
                return Err(AtlasError::Validation(format!("{} is listed twice", id)));
            }
        }
        let leaf = field_bytes_to_fr(&commitment, "commitment")?;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        for id in jurisdictions {
            let district = state
                .districts
                .get(id)
                .ok_or_else(|| AtlasError::UnknownJurisdiction(id.to_string()))?;
            if district.positions.contains_key(&commitment) {
                return Err(AtlasError::AlreadyExists(format!(
                    "commitment {} already registered in {}",
                    commitment.short_hex(),
                    id
                )));
            }
            if district.tree.len() >= district.tree.capacity() {
                return Err(AtlasError::CapacityExceeded(format!(
                    "{} holds {} leaves",
                    id,
                    district.tree.capacity()
                )));
            }
        }

        let mut update = AtlasUpdate::default();
        let mut insertions = Vec::with_capacity(jurisdictions.len());
        for id in jurisdictions {
            let district = state
                .districts
                .get_mut(id)
                .ok_or_else(|| AtlasError::UnknownJurisdiction(id.to_string()))?;
            let leaf_index = district.tree.push(leaf)?;
            district.positions.insert(commitment, leaf_index);
            district.record.leaf_count = district.tree.len();
            let district_root = district.tree.root();
            let slot = district.record.global_slot;
            update.jurisdictions.push(district.record.clone());

            state.global.set(slot, district_root)?;
            update.leaves.push((id.clone(), leaf_index, commitment));
            insertions.push(LeafInsertion {
                jurisdiction: id.clone(),
                leaf_index,
                district_root: fr_to_field_bytes(&district_root),
            });
        }

        let head = self.publish(state, update, jurisdictions)?;
        debug!(
            commitment = %commitment.short_hex(),
            districts = insertions.len(),
            version = head.version,
            "Registered commitment"
        );
        Ok(Registration {
            insertions,
            atlas_version: head.version,
            global_root: head.global_root,
        })
    }

    /// Append one leaf to one district.
    pub async fn insert_leaf(&self, jurisdiction: &JurisdictionId, commitment: FieldBytes) -> AtlasResult<LeafInsertion> {
        let registration = self
            .register_commitment(std::slice::from_ref(jurisdiction), commitment)
            .await?;
        registration
            .insertions
            .into_iter()
            .next()
            .ok_or_else(|| AtlasError::Internal("registration produced no insertion".into()))
    }

    pub async fn inclusion_path(&self, jurisdiction: &JurisdictionId, leaf_index: u64) -> AtlasResult<InclusionPath> {
        let state = self.state.lock().await;
        let district = state
            .districts
            .get(jurisdiction)
            .ok_or_else(|| AtlasError::UnknownJurisdiction(jurisdiction.to_string()))?;
        build_inclusion_path(
            jurisdiction,
            &district.tree,
            district.record.global_slot,
            &state.global,
            leaf_index,
            state.head.version,
        )
    }

    /// Encoded bundle of the current version, cached until the next publication.
    pub async fn export_snapshot(&self) -> AtlasResult<Arc<EncodedSnapshot>> {
        let cached = self.bundle_cache.lock().clone();
        let state = self.state.lock().await;
        if let Some(cached) = cached {
            if cached.atlas_version == state.head.version {
                return Ok(cached);
            }
        }

        let encoded = Arc::new(state.bundle().encode()?);
        let short_id = &encoded.content_id[..12];
        debug!(
            version = encoded.atlas_version,
            content_id = short_id,
            bytes = encoded.bytes.len(),
            "Encoded atlas snapshot"
        );
        *self.bundle_cache.lock() = Some(Arc::clone(&encoded));
        Ok(encoded)
    }

    /// Persist, record in the root history, then swap the published view.
    fn publish(
        &self,
        state: &mut AtlasState,
        mut update: AtlasUpdate,
        changed: &[JurisdictionId],
    ) -> AtlasResult<AtlasHead> {
        let head = AtlasHead {
            version: state.head.version + 1,
            global_root: fr_to_field_bytes(&state.global.root()),
            published_at: Utc::now(),
        };

        for id in changed {
            if let Some(district) = state.districts.get(id) {
                update.roots.push(RootRecord {
                    root: fr_to_field_bytes(&district.tree.root()),
                    tier: RootTier::District(id.clone()),
                    version: head.version,
                    published_at: head.published_at,
                });
            }
        }
        update.roots.push(RootRecord {
            root: head.global_root,
            tier: RootTier::Global,
            version: head.version,
            published_at: head.published_at,
        });
        update.head = Some(head);

        if let Err(e) = self.storage.commit_atlas_update(&update) {
            error!(version = head.version, "Failed to persist atlas update: {}", e);
            match AtlasState::load(&self.storage, self.params) {
                Ok((reloaded, _)) => *state = reloaded,
                Err(reload) => error!("Failed to reload atlas after a failed update: {}", reload),
            }
            return Err(e);
        }

        state.head = head;
        self.history.record(&head);
        *self.published.write() = Arc::new(state.view());

        info!(
            version = head.version,
            root = %head.global_root.short_hex(),
            "Published atlas version"
        );
        Ok(head)
    }
}
