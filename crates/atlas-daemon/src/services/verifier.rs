use atlas_crypto::{load_verifier, MembershipKeys, MembershipVerifier};
use atlas_types::{AtlasError, AtlasResult, FieldBytes, PublicInputs};
use rand::rngs::OsRng;
use std::path::Path;
use tracing::{info, warn};

use crate::config::AtlasConfig;

/// Proof verification as seen by the submission pipeline.
pub trait ProofVerifier: Send + Sync {
    /// Field-range and proof-encoding checks; no storage, no pairing.
    fn precheck(&self, proof: &[u8], inputs: &PublicInputs) -> AtlasResult<()>;

    /// Full check; `root_check` decides whether the global root is acceptable.
    fn verify(
        &self,
        proof: &[u8],
        inputs: &PublicInputs,
        root_check: &dyn Fn(&FieldBytes) -> AtlasResult<()>,
    ) -> AtlasResult<()>;

    fn fingerprint(&self) -> &str;
}

/// Groth16 verifier over the pinned membership key.
pub struct Groth16Verifier {
    inner: MembershipVerifier,
}

impl Groth16Verifier {
    pub fn new(inner: MembershipVerifier) -> Self {
        Self { inner }
    }

    /// Load the verifying key from the configured directory.
    ///
    /// With `zk.generate_if_missing`, a missing key set is created by a local
    /// setup first.
    pub fn from_config(config: &AtlasConfig) -> AtlasResult<Self> {
        let keys_dir = config.keys_dir();
        if !MembershipKeys::exists(&keys_dir) {
            if !config.zk.generate_if_missing {
                return Err(AtlasError::Config(format!(
                    "no membership keys in {:?}; run atlas-keygen or `atlasd keygen`",
                    keys_dir
                )));
            }
            generate_keys(config, &keys_dir)?;
        }

        let verifier = load_verifier(&keys_dir, config.zk.expected_vk_hash.as_deref())?;
        let params = verifier.params();
        if params.district_depth != config.atlas.district_depth || params.global_depth != config.atlas.global_depth {
            return Err(AtlasError::Config(format!(
                "keys were built for depths {}/{}, atlas is configured for {}/{}",
                params.district_depth, params.global_depth, config.atlas.district_depth, config.atlas.global_depth
            )));
        }
        info!(vk_hash = %&verifier.fingerprint()[..16], "Loaded membership verifying key");
        Ok(Self::new(verifier))
    }
}

/// Run the circuit-specific setup for the configured depths and save the keys.
pub fn generate_keys(config: &AtlasConfig, keys_dir: &Path) -> AtlasResult<MembershipKeys> {
    let params = atlas_crypto::CircuitParams::new(config.atlas.district_depth, config.atlas.global_depth)?;
    warn!(
        district_depth = params.district_depth,
        global_depth = params.global_depth,
        "Generating membership keys with a local setup"
    );
    let keys = MembershipKeys::setup(params, &mut OsRng)?;
    let metadata = keys.save(keys_dir)?;
    info!(vk_hash = %metadata.vk_hash, "Membership keys written to {:?}", keys_dir);
    Ok(keys)
}

impl ProofVerifier for Groth16Verifier {
    fn precheck(&self, proof: &[u8], inputs: &PublicInputs) -> AtlasResult<()> {
        self.inner.precheck(proof, inputs).map(|_| ())
    }

    fn verify(
        &self,
        proof: &[u8],
        inputs: &PublicInputs,
        root_check: &dyn Fn(&FieldBytes) -> AtlasResult<()>,
    ) -> AtlasResult<()> {
        self.inner.verify(proof, inputs, |root| root_check(root))
    }

    fn fingerprint(&self) -> &str {
        self.inner.fingerprint()
    }
}
