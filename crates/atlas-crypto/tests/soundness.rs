//! A leaf and path that do not rebuild the claimed root never satisfy the
//! membership circuit.

use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use atlas_crypto::merkle::index_bits;
use atlas_crypto::{
    action_context_hash, compute_root, derive_commitment_field, CircuitParams, FixedMerkleTree, Fr,
    MembershipCircuit, MembershipWitness,
};
use proptest::prelude::*;

const PARAMS: CircuitParams = CircuitParams {
    district_depth: 4,
    global_depth: 2,
};

fn valid_witness(secret: u64, leaf_index: u64) -> MembershipWitness {
    let secret = Fr::from(secret);
    let commitment = derive_commitment_field(secret).unwrap();

    let mut leaves: Vec<Fr> = (0..=leaf_index).map(|i| Fr::from(5_000 + i)).collect();
    leaves[leaf_index as usize] = commitment;
    let district = FixedMerkleTree::from_leaves(PARAMS.district_depth, &leaves).unwrap();
    let global =
        FixedMerkleTree::from_leaves(PARAMS.global_depth, &[Fr::from(3u64), Fr::from(4u64), district.root()])
            .unwrap();

    MembershipWitness {
        secret,
        district_siblings: district.path(leaf_index).unwrap(),
        leaf_index,
        global_siblings: global.path(2).unwrap(),
        global_position: 2,
        global_root: global.root(),
        action_context_hash: action_context_hash("petition-42"),
    }
}

fn native_global_root(w: &MembershipWitness, district_bits: u64, global_bits: u64) -> Fr {
    let commitment = derive_commitment_field(w.secret).unwrap();
    let district_root = compute_root(commitment, district_bits, &w.district_siblings);
    compute_root(district_root, global_bits, &w.global_siblings)
}

fn satisfied(circuit: MembershipCircuit) -> bool {
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit.generate_constraints(cs.clone()).is_ok() && cs.is_satisfied().unwrap_or(false)
}

#[test]
fn test_honest_witness_satisfies() {
    for leaf_index in [0u64, 7, 15] {
        let witness = valid_witness(42, leaf_index);
        assert!(satisfied(MembershipCircuit::new(PARAMS, &witness)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_corrupted_district_sibling_unsatisfied(
        secret in 1u64..u64::MAX,
        leaf_index in 0u64..16,
        level in 0usize..4,
        replacement in any::<u64>(),
    ) {
        let mut witness = valid_witness(secret, leaf_index);
        let replacement = Fr::from(replacement);
        prop_assume!(witness.district_siblings[level] != replacement);
        witness.district_siblings[level] = replacement;

        prop_assert_ne!(
            native_global_root(&witness, witness.leaf_index, witness.global_position),
            witness.global_root
        );
        prop_assert!(!satisfied(MembershipCircuit::new(PARAMS, &witness)));
    }

    #[test]
    fn test_corrupted_global_sibling_unsatisfied(
        secret in 1u64..u64::MAX,
        level in 0usize..2,
        replacement in any::<u64>(),
    ) {
        let mut witness = valid_witness(secret, 5);
        let replacement = Fr::from(replacement);
        prop_assume!(witness.global_siblings[level] != replacement);
        witness.global_siblings[level] = replacement;

        prop_assert!(!satisfied(MembershipCircuit::new(PARAMS, &witness)));
    }

    #[test]
    fn test_wrong_selector_bits_unsatisfied(
        secret in 1u64..u64::MAX,
        leaf_index in 0u64..16,
        district_bits in 0u64..16,
        global_bits in 0u64..4,
    ) {
        let witness = valid_witness(secret, leaf_index);
        prop_assume!(district_bits != leaf_index || global_bits != witness.global_position);
        prop_assume!(native_global_root(&witness, district_bits, global_bits) != witness.global_root);

        let circuit = MembershipCircuit::new(PARAMS, &witness).with_bits(
            index_bits(district_bits, PARAMS.district_depth),
            index_bits(global_bits, PARAMS.global_depth),
        );
        prop_assert!(!satisfied(circuit));
    }

    #[test]
    fn test_claimed_root_must_match(
        secret in 1u64..u64::MAX,
        offset in 1u64..u64::MAX,
    ) {
        let mut witness = valid_witness(secret, 3);
        witness.global_root += Fr::from(offset);
        prop_assert!(!satisfied(MembershipCircuit::new(PARAMS, &witness)));
    }
}
