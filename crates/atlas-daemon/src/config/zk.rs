use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZkConfig {
    /// Key directory; `<data_dir>/keys` when unset.
    pub keys_dir: Option<PathBuf>,
    /// BLAKE3 fingerprint the verifying key must match.
    pub expected_vk_hash: Option<String>,
    /// Run setup on start-up when no keys exist. Development only.
    pub generate_if_missing: bool,
    /// Soft deadline for server-side proving, in milliseconds.
    pub prove_timeout_ms: Option<u64>,
}
