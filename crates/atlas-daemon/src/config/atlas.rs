use atlas_types::{
    DEFAULT_DISTRICT_DEPTH, DEFAULT_GLOBAL_DEPTH, DEFAULT_ROOT_HISTORY_VERSIONS,
    DEFAULT_ROOT_MAX_AGE_SECS,
};
use serde::{Deserialize, Serialize};

/// Tree depths for the whole deployment.
///
/// Changing either depth invalidates the proving keys and the stored trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasTreeConfig {
    pub district_depth: usize,
    pub global_depth: usize,
}

impl Default for AtlasTreeConfig {
    fn default() -> Self {
        Self {
            district_depth: DEFAULT_DISTRICT_DEPTH,
            global_depth: DEFAULT_GLOBAL_DEPTH,
        }
    }
}

/// Staleness window for superseded global roots.
///
/// A root stays acceptable while it is current, or while it is among the
/// latest `max_versions` versions and was superseded less than
/// `max_age_secs` ago.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootHistoryConfig {
    pub max_versions: usize,
    pub max_age_secs: u64,
}

impl Default for RootHistoryConfig {
    fn default() -> Self {
        Self {
            max_versions: DEFAULT_ROOT_HISTORY_VERSIONS,
            max_age_secs: DEFAULT_ROOT_MAX_AGE_SECS,
        }
    }
}
