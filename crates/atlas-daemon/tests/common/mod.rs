//! Shared fixture: a node at depths 4/2 with real Groth16 keys and in-memory storage.

#![allow(dead_code)]

use ark_std::rand::{rngs::StdRng, SeedableRng};
use atlas_crypto::{derive_commitment, CircuitParams, IdentitySecret, MembershipKeys, MembershipProof};
use atlas_daemon::config::AtlasConfig;
use atlas_daemon::{AtlasNode, AtlasStorage, Groth16Verifier, SubmissionRequest};
use atlas_types::{FieldBytes, IdempotencyKey, InclusionPath, JurisdictionId, JurisdictionKind};
use std::sync::{Arc, OnceLock};

pub const ADMIN_TOKEN: &str = "integration-admin-token";

pub const PARAMS: CircuitParams = CircuitParams {
    district_depth: 4,
    global_depth: 2,
};

pub fn keys() -> &'static MembershipKeys {
    static KEYS: OnceLock<MembershipKeys> = OnceLock::new();
    KEYS.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(4242);
        MembershipKeys::setup(PARAMS, &mut rng).unwrap()
    })
}

pub fn config(max_versions: usize) -> AtlasConfig {
    let mut config = AtlasConfig::default();
    config.atlas.district_depth = PARAMS.district_depth;
    config.atlas.global_depth = PARAMS.global_depth;
    config.root_history.max_versions = max_versions;
    config.api.admin_token = Some(ADMIN_TOKEN.to_string());
    config.api.submission_burst = 1_000;
    config
}

pub fn node_with(config: AtlasConfig) -> AtlasNode {
    let verifier = Groth16Verifier::new(keys().verifier().unwrap());
    AtlasNode::with_parts(config, Arc::new(AtlasStorage::in_memory().unwrap()), Arc::new(verifier)).unwrap()
}

pub fn node() -> AtlasNode {
    node_with(config(8))
}

pub fn district() -> JurisdictionId {
    JurisdictionId::new("us-ca-cd12").unwrap()
}

/// A member whose commitment sits at leaf 7 of `us-ca-cd12`.
pub struct Member {
    pub secret: IdentitySecret,
    pub commitment: FieldBytes,
}

/// Define `us-ca` and `us-ca-cd12`, register seven other members, then `member`.
pub async fn populate(node: &AtlasNode) -> Member {
    let atlas = node.atlas();
    let state = JurisdictionId::new("us-ca").unwrap();
    atlas
        .define_jurisdiction(state.clone(), JurisdictionKind::State { code: "CA".into() }, None)
        .await
        .unwrap();
    atlas
        .define_jurisdiction(
            district(),
            JurisdictionKind::FederalDistrict {
                state_code: "CA".into(),
                number: 12,
            },
            Some(state),
        )
        .await
        .unwrap();

    let mut rng = StdRng::seed_from_u64(77);
    for _ in 0..7 {
        let other = IdentitySecret::random(&mut rng);
        atlas
            .register_commitment(&[district()], derive_commitment(&other))
            .await
            .unwrap();
    }

    let secret = IdentitySecret::random(&mut rng);
    let commitment = derive_commitment(&secret);
    let registration = atlas.register_commitment(&[district()], commitment).await.unwrap();
    assert_eq!(registration.insertions[0].leaf_index, 7);

    Member { secret, commitment }
}

pub async fn current_path(node: &AtlasNode) -> InclusionPath {
    node.atlas().inclusion_path(&district(), 7).await.unwrap()
}

pub fn prove(member: &Member, path: &InclusionPath, action: &str, seed: u64) -> MembershipProof {
    let mut rng = StdRng::seed_from_u64(seed);
    keys()
        .prover()
        .prove(&member.secret, &member.commitment, path, action, &mut rng)
        .unwrap()
}

pub fn request(proof: &MembershipProof, key: Option<IdempotencyKey>) -> SubmissionRequest {
    SubmissionRequest {
        proof: proof.proof_bytes().unwrap(),
        public_inputs: proof.public_inputs,
        idempotency_key: key,
        payload: "I support petition 42".into(),
    }
}
