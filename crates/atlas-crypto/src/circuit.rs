//! R1CS membership circuit.
//!
//! Public inputs, in allocation order: `global_root`, `nullifier`,
//! `action_context_hash`. Everything else is witness.
//!
//! The circuit recomputes the commitment from the secret, walks the district
//! path to the district root, walks the global path from that root to the
//! global root, and recomputes the nullifier from the same secret.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::{fp::FpVar, FieldVar},
    select::CondSelectGadget,
};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use atlas_types::{
    AtlasError, AtlasResult, DEFAULT_DISTRICT_DEPTH, DEFAULT_GLOBAL_DEPTH, MAX_DISTRICT_DEPTH,
    MAX_GLOBAL_DEPTH,
};
use serde::{Deserialize, Serialize};

use crate::domain::DomainTag;
use crate::merkle::index_bits;
use crate::nullifier::derive_nullifier_field;
use crate::poseidon::canonical_config;

/// Tree depths a set of keys is built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CircuitParams {
    /// Levels of every district tree.
    pub district_depth: usize,
    /// Levels of the global tree.
    pub global_depth: usize,
}

impl CircuitParams {
    /// Checked constructor.
    pub fn new(district_depth: usize, global_depth: usize) -> AtlasResult<Self> {
        let params = Self {
            district_depth,
            global_depth,
        };
        params.validate()?;
        Ok(params)
    }

    /// Reject depths outside the supported bounds.
    pub fn validate(&self) -> AtlasResult<()> {
        if self.district_depth == 0 || self.district_depth > MAX_DISTRICT_DEPTH {
            return Err(AtlasError::Validation(format!(
                "district_depth must be 1..={}, got {}",
                MAX_DISTRICT_DEPTH, self.district_depth
            )));
        }
        if self.global_depth == 0 || self.global_depth > MAX_GLOBAL_DEPTH {
            return Err(AtlasError::Validation(format!(
                "global_depth must be 1..={}, got {}",
                MAX_GLOBAL_DEPTH, self.global_depth
            )));
        }
        Ok(())
    }
}

impl Default for CircuitParams {
    fn default() -> Self {
        Self {
            district_depth: DEFAULT_DISTRICT_DEPTH,
            global_depth: DEFAULT_GLOBAL_DEPTH,
        }
    }
}

/// Witness values for one proof, already decoded into the field.
#[derive(Clone, Debug)]
pub struct MembershipWitness {
    /// Identity secret.
    pub secret: Fr,
    /// District siblings, leaf level first.
    pub district_siblings: Vec<Fr>,
    /// Leaf index inside the district tree.
    pub leaf_index: u64,
    /// Global siblings, lowest level first.
    pub global_siblings: Vec<Fr>,
    /// Slot of the district root in the global tree.
    pub global_position: u64,
    /// Claimed global root.
    pub global_root: Fr,
    /// Action context hash.
    pub action_context_hash: Fr,
}

/// The membership relation.
#[derive(Clone)]
pub struct MembershipCircuit {
    params: CircuitParams,
    secret: Option<Fr>,
    district_siblings: Vec<Option<Fr>>,
    district_bits: Vec<Option<bool>>,
    global_siblings: Vec<Option<Fr>>,
    global_bits: Vec<Option<bool>>,
    global_root: Option<Fr>,
    nullifier: Option<Fr>,
    action_context_hash: Option<Fr>,
}

impl MembershipCircuit {
    /// Assignment-free instance for key generation.
    pub fn empty(params: CircuitParams) -> Self {
        Self {
            params,
            secret: None,
            district_siblings: vec![None; params.district_depth],
            district_bits: vec![None; params.district_depth],
            global_siblings: vec![None; params.global_depth],
            global_bits: vec![None; params.global_depth],
            global_root: None,
            nullifier: None,
            action_context_hash: None,
        }
    }

    /// Fully assigned instance. The nullifier is derived here.
    pub fn new(params: CircuitParams, witness: &MembershipWitness) -> Self {
        let nullifier = derive_nullifier_field(witness.secret, witness.action_context_hash);
        Self {
            params,
            secret: Some(witness.secret),
            district_siblings: witness.district_siblings.iter().copied().map(Some).collect(),
            district_bits: index_bits(witness.leaf_index, params.district_depth)
                .into_iter()
                .map(Some)
                .collect(),
            global_siblings: witness.global_siblings.iter().copied().map(Some).collect(),
            global_bits: index_bits(witness.global_position, params.global_depth)
                .into_iter()
                .map(Some)
                .collect(),
            global_root: Some(witness.global_root),
            nullifier: Some(nullifier),
            action_context_hash: Some(witness.action_context_hash),
        }
    }

    /// Replace the claimed nullifier, for negative tests.
    pub fn with_nullifier(mut self, nullifier: Fr) -> Self {
        self.nullifier = Some(nullifier);
        self
    }

    /// Replace the selector bits, for negative tests.
    pub fn with_bits(mut self, district_bits: Vec<bool>, global_bits: Vec<bool>) -> Self {
        self.district_bits = district_bits.into_iter().map(Some).collect();
        self.global_bits = global_bits.into_iter().map(Some).collect();
        self
    }

    /// Public inputs in verifier order, when assigned.
    pub fn public_inputs(&self) -> Option<[Fr; 3]> {
        Some([self.global_root?, self.nullifier?, self.action_context_hash?])
    }
}

fn witness_vec(
    cs: &ConstraintSystemRef<Fr>,
    values: &[Option<Fr>],
    len: usize,
) -> Result<Vec<FpVar<Fr>>, SynthesisError> {
    (0..len)
        .map(|i| {
            FpVar::new_witness(cs.clone(), || {
                values.get(i).copied().flatten().ok_or(SynthesisError::AssignmentMissing)
            })
        })
        .collect()
}

fn bit_vec(
    cs: &ConstraintSystemRef<Fr>,
    values: &[Option<bool>],
    len: usize,
) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    (0..len)
        .map(|i| {
            Boolean::new_witness(cs.clone(), || {
                values.get(i).copied().flatten().ok_or(SynthesisError::AssignmentMissing)
            })
        })
        .collect()
}

impl ConstraintSynthesizer<Fr> for MembershipCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let params = self.params;

        let secret = FpVar::new_witness(cs.clone(), || {
            self.secret.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let district_siblings = witness_vec(&cs, &self.district_siblings, params.district_depth)?;
        let district_bits = bit_vec(&cs, &self.district_bits, params.district_depth)?;
        let global_siblings = witness_vec(&cs, &self.global_siblings, params.global_depth)?;
        let global_bits = bit_vec(&cs, &self.global_bits, params.global_depth)?;

        let global_root = FpVar::new_input(cs.clone(), || {
            self.global_root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nullifier = FpVar::new_input(cs.clone(), || {
            self.nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let action_context_hash = FpVar::new_input(cs.clone(), || {
            self.action_context_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;

        secret.enforce_not_equal(&FpVar::constant(Fr::from(0u64)))?;

        let commitment = poseidon_hash_gadget(cs.clone(), &[secret.clone()], DomainTag::Commitment)?;

        let district_root =
            merkle_root_gadget(cs.clone(), &commitment, &district_siblings, &district_bits)?;
        let computed_global_root =
            merkle_root_gadget(cs.clone(), &district_root, &global_siblings, &global_bits)?;
        computed_global_root.enforce_equal(&global_root)?;

        let computed_nullifier = poseidon_hash_gadget(
            cs,
            &[secret, action_context_hash],
            DomainTag::Nullifier,
        )?;
        computed_nullifier.enforce_equal(&nullifier)?;

        Ok(())
    }
}

/// In-circuit counterpart of [`crate::poseidon::poseidon_hash_tagged`].
pub fn poseidon_hash_gadget(
    cs: ConstraintSystemRef<Fr>,
    inputs: &[FpVar<Fr>],
    tag: DomainTag,
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut absorbed: Vec<FpVar<Fr>> = inputs.to_vec();
    absorbed.push(FpVar::constant(tag.to_field()));

    let mut sponge = PoseidonSpongeVar::new(cs, canonical_config());
    sponge.absorb(&absorbed)?;

    let output = sponge.squeeze_field_elements(1)?;
    Ok(output[0].clone())
}

/// In-circuit counterpart of [`crate::merkle::compute_root`].
pub fn merkle_root_gadget(
    cs: ConstraintSystemRef<Fr>,
    leaf: &FpVar<Fr>,
    siblings: &[FpVar<Fr>],
    is_right: &[Boolean<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut current = leaf.clone();

    for (sibling, right) in siblings.iter().zip(is_right.iter()) {
        let left_node = FpVar::conditionally_select(right, sibling, &current)?;
        let right_node = FpVar::conditionally_select(right, &current, sibling)?;

        current = poseidon_hash_gadget(cs.clone(), &[left_node, right_node], DomainTag::Pair)?;
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::derive_commitment_field;
    use crate::merkle::{hash_pair, FixedMerkleTree};
    use crate::nullifier::action_context_hash;
    use crate::poseidon::poseidon_hash_tagged;
    use ark_r1cs_std::R1CSVar;
    use ark_relations::r1cs::ConstraintSystem;

    const PARAMS: CircuitParams = CircuitParams {
        district_depth: 4,
        global_depth: 2,
    };

    fn fixture(secret: Fr) -> MembershipWitness {
        let commitment = derive_commitment_field(secret).unwrap();
        let mut leaves: Vec<Fr> = (0..7u64).map(|i| Fr::from(100 + i)).collect();
        leaves.push(commitment);
        let district = FixedMerkleTree::from_leaves(PARAMS.district_depth, &leaves).unwrap();

        let global = FixedMerkleTree::from_leaves(
            PARAMS.global_depth,
            &[Fr::from(9u64), district.root()],
        )
        .unwrap();

        MembershipWitness {
            secret,
            district_siblings: district.path(7).unwrap(),
            leaf_index: 7,
            global_siblings: global.path(1).unwrap(),
            global_position: 1,
            global_root: global.root(),
            action_context_hash: action_context_hash("petition-42"),
        }
    }

    fn satisfied(circuit: MembershipCircuit) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        // an unassignable witness (e.g. the inverse of zero) also counts as unsatisfied
        circuit.generate_constraints(cs.clone()).is_ok() && cs.is_satisfied().unwrap_or(false)
    }

    #[test]
    fn test_valid_witness_satisfies() {
        let witness = fixture(Fr::from(123456789u64));
        assert!(satisfied(MembershipCircuit::new(PARAMS, &witness)));
    }

    #[test]
    fn test_wrong_nullifier_unsatisfied() {
        let witness = fixture(Fr::from(123456789u64));
        let circuit = MembershipCircuit::new(PARAMS, &witness).with_nullifier(Fr::from(1u64));
        assert!(!satisfied(circuit));
    }

    #[test]
    fn test_wrong_root_unsatisfied() {
        let mut witness = fixture(Fr::from(123456789u64));
        witness.global_root += Fr::from(1u64);
        assert!(!satisfied(MembershipCircuit::new(PARAMS, &witness)));
    }

    #[test]
    fn test_wrong_secret_unsatisfied() {
        let mut witness = fixture(Fr::from(123456789u64));
        witness.secret = Fr::from(987654321u64);
        assert!(!satisfied(MembershipCircuit::new(PARAMS, &witness)));
    }

    #[test]
    fn test_zero_secret_unsatisfied() {
        let mut witness = fixture(Fr::from(1u64));
        witness.secret = Fr::from(0u64);
        let commitment = poseidon_hash_tagged(&[Fr::from(0u64)], DomainTag::Commitment);
        let district = FixedMerkleTree::from_leaves(PARAMS.district_depth, &[commitment]).unwrap();
        let global = FixedMerkleTree::from_leaves(PARAMS.global_depth, &[district.root()]).unwrap();
        witness.district_siblings = district.path(0).unwrap();
        witness.leaf_index = 0;
        witness.global_siblings = global.path(0).unwrap();
        witness.global_position = 0;
        witness.global_root = global.root();

        assert!(!satisfied(MembershipCircuit::new(PARAMS, &witness)));
    }

    #[test]
    fn test_gadget_matches_native_hash() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let a = Fr::from(31u64);
        let b = Fr::from(37u64);
        let a_var = FpVar::new_witness(cs.clone(), || Ok(a)).unwrap();
        let b_var = FpVar::new_witness(cs.clone(), || Ok(b)).unwrap();

        let pair = poseidon_hash_gadget(cs.clone(), &[a_var.clone(), b_var.clone()], DomainTag::Pair)
            .unwrap();
        assert_eq!(pair.value().unwrap(), hash_pair(a, b));

        let nullifier =
            poseidon_hash_gadget(cs.clone(), &[a_var, b_var], DomainTag::Nullifier).unwrap();
        assert_eq!(nullifier.value().unwrap(), derive_nullifier_field(a, b));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_public_input_order() {
        let witness = fixture(Fr::from(5u64));
        let circuit = MembershipCircuit::new(PARAMS, &witness);
        let inputs = circuit.public_inputs().unwrap();
        assert_eq!(inputs[0], witness.global_root);
        assert_eq!(inputs[1], derive_nullifier_field(witness.secret, witness.action_context_hash));
        assert_eq!(inputs[2], witness.action_context_hash);
        assert!(MembershipCircuit::empty(PARAMS).public_inputs().is_none());
    }

    #[test]
    fn test_params_bounds() {
        assert!(CircuitParams::new(20, 12).is_ok());
        assert!(CircuitParams::new(0, 12).is_err());
        assert!(CircuitParams::new(20, 25).is_err());
        assert!(CircuitParams::new(33, 1).is_err());
    }
}
