//! Membership proof verification.
//!
//! Checks run cheapest first: field ranges, proof decoding, root acceptance,
//! then the pairing check. Verification has no side effects.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_serialize::CanonicalDeserialize;
use ark_snark::SNARK;
use atlas_types::{AtlasError, AtlasResult, FieldBytes, PublicInputs};
use tracing::debug;

use crate::circuit::CircuitParams;
use crate::field::field_bytes_to_fr;
use crate::keys::{export_verifying_key, vk_fingerprint};
use crate::proof::decode_proof;

/// Decode public inputs in circuit order, rejecting anything not below the modulus.
pub fn decode_public_inputs(inputs: &PublicInputs) -> AtlasResult<[Fr; 3]> {
    Ok([
        field_bytes_to_fr(&inputs.global_root, "global_root")?,
        field_bytes_to_fr(&inputs.nullifier, "nullifier")?,
        field_bytes_to_fr(&inputs.action_context_hash, "action_context_hash")?,
    ])
}

/// Groth16 verifier pinned to one verifying key.
#[derive(Clone)]
pub struct MembershipVerifier {
    params: CircuitParams,
    prepared_vk: PreparedVerifyingKey<Bn254>,
    fingerprint: String,
}

impl MembershipVerifier {
    /// Prepare a verifying key.
    pub fn new(params: CircuitParams, vk: &VerifyingKey<Bn254>) -> AtlasResult<Self> {
        let fingerprint = vk_fingerprint(&export_verifying_key(vk)?);
        let prepared_vk = Groth16::<Bn254>::process_vk(vk)
            .map_err(|e| AtlasError::Crypto(format!("Failed to prepare VK: {}", e)))?;
        Ok(Self {
            params,
            prepared_vk,
            fingerprint,
        })
    }

    /// Prepare a compressed verifying key.
    pub fn from_vk_bytes(params: CircuitParams, bytes: &[u8]) -> AtlasResult<Self> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(bytes)
            .map_err(|e| AtlasError::Crypto(format!("Failed to deserialize VK: {}", e)))?;
        Self::new(params, &vk)
    }

    /// Params the key was built for.
    pub fn params(&self) -> CircuitParams {
        self.params
    }

    /// BLAKE3 fingerprint of the verifying key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Range and encoding checks that need neither storage nor the pairing.
    pub fn precheck(&self, proof_bytes: &[u8], inputs: &PublicInputs) -> AtlasResult<(Proof<Bn254>, [Fr; 3])> {
        let fields = decode_public_inputs(inputs)?;
        let proof = decode_proof(proof_bytes)?;
        Ok((proof, fields))
    }

    /// Full verification.
    ///
    /// `root_check` decides whether `global_root` is still acceptable and
    /// returns `StaleRoot` or `UnknownRoot` otherwise.
    pub fn verify<F>(&self, proof_bytes: &[u8], inputs: &PublicInputs, root_check: F) -> AtlasResult<()>
    where
        F: FnOnce(&FieldBytes) -> AtlasResult<()>,
    {
        let (proof, fields) = self.precheck(proof_bytes, inputs)?;
        root_check(&inputs.global_root)?;
        self.verify_groth16(&proof, &fields)
    }

    /// Pairing check only.
    pub fn verify_groth16(&self, proof: &Proof<Bn254>, public_inputs: &[Fr; 3]) -> AtlasResult<()> {
        let valid = Groth16::<Bn254>::verify_with_processed_vk(&self.prepared_vk, public_inputs, proof)
            .map_err(|e| AtlasError::InvalidProof(format!("verification error: {}", e)))?;
        if !valid {
            debug!("Groth16 check rejected proof");
            return Err(AtlasError::InvalidProof("proof does not verify".into()));
        }
        Ok(())
    }
}
