//! Membership proof generation.
//!
//! Every path check is repeated natively before the circuit is built, so a
//! bad path surfaces as `PathMismatch` instead of an unsatisfiable proof.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey};
use ark_snark::SNARK;
use atlas_types::{AtlasError, AtlasResult, FieldBytes, InclusionPath, PublicInputs};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use tracing::debug;

use crate::circuit::{CircuitParams, MembershipCircuit, MembershipWitness};
use crate::commitment::IdentitySecret;
use crate::field::{field_bytes_slice_to_fr, field_bytes_to_fr, fr_to_field_bytes};
use crate::merkle::compute_root;
use crate::nullifier::{action_context_hash, derive_nullifier_field};
use crate::proof::MembershipProof;

/// Check an inclusion path against a secret and build the circuit witness.
pub fn prepare_witness(
    params: CircuitParams,
    secret: &IdentitySecret,
    commitment: &FieldBytes,
    path: &InclusionPath,
    action_context: &str,
) -> AtlasResult<MembershipWitness> {
    if path.district_siblings.len() != params.district_depth {
        return Err(AtlasError::PathMismatch(format!(
            "expected {} district siblings, got {}",
            params.district_depth,
            path.district_siblings.len()
        )));
    }
    if path.global_siblings.len() != params.global_depth {
        return Err(AtlasError::PathMismatch(format!(
            "expected {} global siblings, got {}",
            params.global_depth,
            path.global_siblings.len()
        )));
    }
    if path.leaf_index >> params.district_depth != 0 {
        return Err(AtlasError::PathMismatch(format!(
            "leaf index {} exceeds a depth-{} tree",
            path.leaf_index, params.district_depth
        )));
    }
    if path.global_position >> params.global_depth != 0 {
        return Err(AtlasError::PathMismatch(format!(
            "global position {} exceeds a depth-{} tree",
            path.global_position, params.global_depth
        )));
    }

    let commitment = field_bytes_to_fr(commitment, "commitment")?;
    let district_siblings = field_bytes_slice_to_fr(&path.district_siblings, "district_siblings")?;
    let global_siblings = field_bytes_slice_to_fr(&path.global_siblings, "global_siblings")?;
    let district_root = field_bytes_to_fr(&path.district_root, "district_root")?;
    let global_root = field_bytes_to_fr(&path.global_root, "global_root")?;

    let secret_field = secret.to_field();
    if secret.commitment() != commitment {
        return Err(AtlasError::PathMismatch(
            "commitment was not derived from this secret".into(),
        ));
    }
    if compute_root(commitment, path.leaf_index, &district_siblings) != district_root {
        return Err(AtlasError::PathMismatch(format!(
            "district path does not lead to the district root of {}",
            path.jurisdiction
        )));
    }
    if compute_root(district_root, path.global_position, &global_siblings) != global_root {
        return Err(AtlasError::PathMismatch(
            "global path does not lead to the global root".into(),
        ));
    }

    Ok(MembershipWitness {
        secret: secret_field,
        district_siblings,
        leaf_index: path.leaf_index,
        global_siblings,
        global_position: path.global_position,
        global_root,
        action_context_hash: action_context_hash(action_context),
    })
}

/// Groth16 prover for one set of circuit params.
#[derive(Clone)]
pub struct MembershipProver {
    params: CircuitParams,
    proving_key: Arc<ProvingKey<Bn254>>,
}

impl MembershipProver {
    /// Wrap a proving key.
    pub fn new(params: CircuitParams, proving_key: Arc<ProvingKey<Bn254>>) -> Self {
        Self {
            params,
            proving_key,
        }
    }

    /// Params of the underlying key.
    pub fn params(&self) -> CircuitParams {
        self.params
    }

    /// Prove that `commitment` (derived from `secret`) sits under `path.global_root`,
    /// binding the nullifier to `action_context`.
    pub fn prove<R: RngCore + CryptoRng>(
        &self,
        secret: &IdentitySecret,
        commitment: &FieldBytes,
        path: &InclusionPath,
        action_context: &str,
        rng: &mut R,
    ) -> AtlasResult<MembershipProof> {
        let witness = prepare_witness(self.params, secret, commitment, path, action_context)?;
        self.prove_witness(&witness, rng)
    }

    /// Prove an already checked witness.
    pub fn prove_witness<R: RngCore + CryptoRng>(
        &self,
        witness: &MembershipWitness,
        rng: &mut R,
    ) -> AtlasResult<MembershipProof> {
        let nullifier: Fr = derive_nullifier_field(witness.secret, witness.action_context_hash);
        let circuit = MembershipCircuit::new(self.params, witness);

        let proof = Groth16::<Bn254>::prove(&self.proving_key, circuit, rng)
            .map_err(|e| AtlasError::Crypto(format!("Failed to generate proof: {}", e)))?;

        let public_inputs = PublicInputs {
            global_root: fr_to_field_bytes(&witness.global_root),
            nullifier: fr_to_field_bytes(&nullifier),
            action_context_hash: fr_to_field_bytes(&witness.action_context_hash),
        };
        debug!(nullifier = %public_inputs.nullifier.short_hex(), "Generated membership proof");

        Ok(MembershipProof {
            proof,
            public_inputs,
        })
    }
}
