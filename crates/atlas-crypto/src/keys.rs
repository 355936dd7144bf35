//! Groth16 key material for the membership circuit.
//!
//! Keys are tied to one [`CircuitParams`]. On disk a key set is four files:
//! `membership.pk.bin`, `membership.vk.bin`, `membership.vk.hash` and
//! `membership.meta.json`.

use ark_bn254::Bn254;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use atlas_types::{AtlasError, AtlasResult};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::circuit::{CircuitParams, MembershipCircuit};
use crate::prover::MembershipProver;
use crate::verifier::MembershipVerifier;

/// Version string written into key metadata.
pub const CIRCUIT_VERSION: &str = "1.0.0";

const PK_FILE: &str = "membership.pk.bin";
const VK_FILE: &str = "membership.vk.bin";
const VK_HASH_FILE: &str = "membership.vk.hash";
const META_FILE: &str = "membership.meta.json";

/// Contents of `membership.meta.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    /// Always `membership`.
    pub circuit: String,
    /// Circuit version.
    pub version: String,
    /// District depth the keys are built for.
    pub district_depth: usize,
    /// Global depth the keys are built for.
    pub global_depth: usize,
    /// BLAKE3 fingerprint of the verifying key bytes.
    pub vk_hash: String,
    /// Proving key size in bytes.
    pub pk_size: usize,
    /// Verifying key size in bytes.
    pub vk_size: usize,
    /// RFC 3339 generation time.
    pub generated_at: String,
}

impl KeyMetadata {
    /// Params recorded in the metadata.
    pub fn params(&self) -> AtlasResult<CircuitParams> {
        CircuitParams::new(self.district_depth, self.global_depth)
    }
}

/// BLAKE3 hex fingerprint of verifying key bytes.
pub fn vk_fingerprint(vk_bytes: &[u8]) -> String {
    hex::encode(blake3::hash(vk_bytes).as_bytes())
}

/// Proving and verifying key for one set of circuit params.
#[derive(Clone)]
pub struct MembershipKeys {
    params: CircuitParams,
    proving_key: Arc<ProvingKey<Bn254>>,
    verifying_key: VerifyingKey<Bn254>,
}

impl MembershipKeys {
    /// Circuit-specific trusted setup.
    pub fn setup<R: RngCore + CryptoRng>(params: CircuitParams, rng: &mut R) -> AtlasResult<Self> {
        params.validate()?;
        info!(
            district_depth = params.district_depth,
            global_depth = params.global_depth,
            "Generating membership proving/verifying keys"
        );

        let circuit = MembershipCircuit::empty(params);
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, rng)
            .map_err(|e| AtlasError::Crypto(format!("Failed to generate keys: {}", e)))?;

        Ok(Self {
            params,
            proving_key: Arc::new(pk),
            verifying_key: vk,
        })
    }

    /// Rebuild from compressed key bytes.
    pub fn from_bytes(params: CircuitParams, pk_bytes: &[u8], vk_bytes: &[u8]) -> AtlasResult<Self> {
        params.validate()?;
        let proving_key = ProvingKey::<Bn254>::deserialize_compressed(pk_bytes)
            .map_err(|e| AtlasError::Crypto(format!("Failed to deserialize PK: {}", e)))?;
        let verifying_key = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes)
            .map_err(|e| AtlasError::Crypto(format!("Failed to deserialize VK: {}", e)))?;
        if proving_key.vk != verifying_key {
            return Err(AtlasError::Crypto("proving and verifying key do not match".into()));
        }
        Ok(Self {
            params,
            proving_key: Arc::new(proving_key),
            verifying_key,
        })
    }

    /// Params the keys were built for.
    pub fn params(&self) -> CircuitParams {
        self.params
    }

    /// Compressed proving key.
    pub fn proving_key_bytes(&self) -> AtlasResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| AtlasError::Crypto(format!("Failed to serialize PK: {}", e)))?;
        Ok(bytes)
    }

    /// Compressed verifying key.
    pub fn verifying_key_bytes(&self) -> AtlasResult<Vec<u8>> {
        export_verifying_key(&self.verifying_key)
    }

    /// Fingerprint of the verifying key.
    pub fn vk_fingerprint(&self) -> AtlasResult<String> {
        Ok(vk_fingerprint(&self.verifying_key_bytes()?))
    }

    /// Prover sharing this proving key.
    pub fn prover(&self) -> MembershipProver {
        MembershipProver::new(self.params, self.proving_key.clone())
    }

    /// Verifier for this verifying key.
    pub fn verifier(&self) -> AtlasResult<MembershipVerifier> {
        MembershipVerifier::new(self.params, &self.verifying_key)
    }

    /// Write the key set into `dir`.
    pub fn save(&self, dir: &Path) -> AtlasResult<KeyMetadata> {
        fs::create_dir_all(dir)
            .map_err(|e| AtlasError::Crypto(format!("Failed to create {}: {}", dir.display(), e)))?;

        let pk_bytes = self.proving_key_bytes()?;
        let vk_bytes = self.verifying_key_bytes()?;
        let vk_hash = vk_fingerprint(&vk_bytes);

        write_file(&dir.join(PK_FILE), &pk_bytes)?;
        write_file(&dir.join(VK_FILE), &vk_bytes)?;
        write_file(&dir.join(VK_HASH_FILE), format!("{}\n", vk_hash).as_bytes())?;

        let metadata = KeyMetadata {
            circuit: "membership".into(),
            version: CIRCUIT_VERSION.into(),
            district_depth: self.params.district_depth,
            global_depth: self.params.global_depth,
            vk_hash,
            pk_size: pk_bytes.len(),
            vk_size: vk_bytes.len(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        };
        let meta = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| AtlasError::Serialization(e.to_string()))?;
        write_file(&dir.join(META_FILE), &meta)?;

        info!(dir = %dir.display(), vk_hash = %metadata.vk_hash, "Saved membership keys");
        Ok(metadata)
    }

    /// Load a key set written by [`MembershipKeys::save`].
    pub fn load(dir: &Path) -> AtlasResult<Self> {
        let metadata = read_metadata(dir)?;
        let pk_bytes = read_file(&dir.join(PK_FILE))?;
        let vk_bytes = read_file(&dir.join(VK_FILE))?;
        check_fingerprint(&vk_bytes, &metadata.vk_hash)?;
        Self::from_bytes(metadata.params()?, &pk_bytes, &vk_bytes)
    }

    /// Whether `dir` holds a complete key set.
    pub fn exists(dir: &Path) -> bool {
        [PK_FILE, VK_FILE, META_FILE]
            .iter()
            .all(|f| dir.join(f).is_file())
    }
}

/// Load only the verifying side from `dir`, optionally pinning its fingerprint.
pub fn load_verifier(dir: &Path, expected_vk_hash: Option<&str>) -> AtlasResult<MembershipVerifier> {
    let metadata = read_metadata(dir)?;
    let vk_bytes = read_file(&dir.join(VK_FILE))?;
    check_fingerprint(&vk_bytes, &metadata.vk_hash)?;
    if let Some(expected) = expected_vk_hash {
        check_fingerprint(&vk_bytes, expected)?;
    }
    MembershipVerifier::from_vk_bytes(metadata.params()?, &vk_bytes)
}

/// Read `membership.meta.json` from `dir`.
pub fn read_metadata(dir: &Path) -> AtlasResult<KeyMetadata> {
    let bytes = read_file(&dir.join(META_FILE))?;
    serde_json::from_slice(&bytes).map_err(|e| AtlasError::Serialization(e.to_string()))
}

/// Compress a verifying key.
pub fn export_verifying_key(vk: &VerifyingKey<Bn254>) -> AtlasResult<Vec<u8>> {
    let mut bytes = Vec::new();
    vk.serialize_compressed(&mut bytes)
        .map_err(|e| AtlasError::Crypto(format!("Failed to serialize VK: {}", e)))?;
    Ok(bytes)
}

fn check_fingerprint(vk_bytes: &[u8], expected: &str) -> AtlasResult<()> {
    let actual = vk_fingerprint(vk_bytes);
    if actual != expected.trim().to_lowercase() {
        return Err(AtlasError::Crypto(format!(
            "verifying key fingerprint mismatch: expected {}, got {}",
            expected.trim(),
            actual
        )));
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> AtlasResult<()> {
    fs::write(path, bytes)
        .map_err(|e| AtlasError::Crypto(format!("Failed to write {}: {}", path.display(), e)))
}

fn read_file(path: &Path) -> AtlasResult<Vec<u8>> {
    fs::read(path).map_err(|e| AtlasError::Crypto(format!("Failed to read {}: {}", path.display(), e)))
}
