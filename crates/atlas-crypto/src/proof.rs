use ark_bn254::Bn254;
use ark_groth16::Proof;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use atlas_types::{AtlasError, AtlasResult, PublicInputs, PROOF_BYTES_SIZE};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// A Groth16 membership proof and the public inputs it was built for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MembershipProof {
    /// The proof.
    #[serde(with = "proof_serde")]
    pub proof: Proof<Bn254>,
    /// `(global_root, nullifier, action_context_hash)`.
    pub public_inputs: PublicInputs,
}

mod proof_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(proof: &Proof<Bn254>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes = encode_proof(proof).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Proof<Bn254>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = decode_proof_base64(&encoded).map_err(serde::de::Error::custom)?;
        decode_proof(&bytes).map_err(serde::de::Error::custom)
    }
}

impl MembershipProof {
    /// Compressed proof bytes.
    pub fn proof_bytes(&self) -> AtlasResult<Vec<u8>> {
        encode_proof(&self.proof)
    }

    /// Compressed proof bytes, base64.
    pub fn proof_base64(&self) -> AtlasResult<String> {
        Ok(base64::engine::general_purpose::STANDARD.encode(self.proof_bytes()?))
    }
}

/// Compress a proof (128 bytes on BN254).
pub fn encode_proof(proof: &Proof<Bn254>) -> AtlasResult<Vec<u8>> {
    let mut bytes = Vec::with_capacity(PROOF_BYTES_SIZE);
    proof
        .serialize_compressed(&mut bytes)
        .map_err(|e| AtlasError::Serialization(format!("Failed to serialize proof: {}", e)))?;
    Ok(bytes)
}

/// Decompress and validate proof bytes.
///
/// Wrong length, points off the curve or outside the subgroup all yield `InvalidProof`.
pub fn decode_proof(bytes: &[u8]) -> AtlasResult<Proof<Bn254>> {
    if bytes.len() != PROOF_BYTES_SIZE {
        return Err(AtlasError::InvalidProof(format!(
            "expected {} proof bytes, got {}",
            PROOF_BYTES_SIZE,
            bytes.len()
        )));
    }
    Proof::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| AtlasError::InvalidProof(format!("undecodable proof: {}", e)))
}

/// Decode base64 proof text.
pub fn decode_proof_base64(s: &str) -> AtlasResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(s.trim())
        .map_err(|e| AtlasError::InvalidProof(format!("invalid base64: {}", e)))
}
