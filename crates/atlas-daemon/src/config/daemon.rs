use atlas_types::{AtlasError, AtlasResult, MAX_DISTRICT_DEPTH, MAX_GLOBAL_DEPTH};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::api::ApiConfig;
use super::atlas::{AtlasTreeConfig, RootHistoryConfig};
use super::constants::{
    DB_DIR_NAME, DEFAULT_DATA_DIR_NAME, KEYS_DIR_NAME, MAX_ROOT_MAX_AGE_SECS,
    MIN_TRANSACTION_TIMEOUT_MS,
};
use super::logging::LoggingConfig;
use super::submissions::SubmissionsConfig;
use super::types::{SecurityWarning, WarningSeverity};
use super::zk::ZkConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub data_dir: PathBuf,
    pub api: ApiConfig,
    pub atlas: AtlasTreeConfig,
    pub root_history: RootHistoryConfig,
    pub submissions: SubmissionsConfig,
    pub zk: ZkConfig,
    pub logging: LoggingConfig,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/var/lib/shadow-atlas"));
        Self {
            data_dir: home.join(DEFAULT_DATA_DIR_NAME),
            api: ApiConfig::default(),
            atlas: AtlasTreeConfig::default(),
            root_history: RootHistoryConfig::default(),
            submissions: SubmissionsConfig::default(),
            zk: ZkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AtlasConfig {
    pub fn load(path: impl AsRef<Path>) -> AtlasResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| AtlasError::Config(format!("Failed to read config: {}", e)))?;
            Self::from_toml(&contents)?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> AtlasResult<Self> {
        toml::from_str(contents).map_err(|e| AtlasError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> AtlasResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AtlasError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AtlasError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| AtlasError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("ATLAS_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Ok(port) = std::env::var("ATLAS_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        if let Ok(bind) = std::env::var("ATLAS_API_BIND") {
            if let Ok(addr) = bind.parse() {
                self.api.bind_address = addr;
                if !self.api_is_localhost_only() {
                    warn!("API server binding to non-localhost address: {}", bind);
                }
            }
        }

        if let Ok(token) = std::env::var("ATLAS_ADMIN_TOKEN") {
            if !token.is_empty() {
                self.api.admin_token = Some(token);
            }
        }

        if let Ok(depth) = std::env::var("ATLAS_DISTRICT_DEPTH") {
            if let Ok(d) = depth.parse() {
                self.atlas.district_depth = d;
            }
        }

        if let Ok(depth) = std::env::var("ATLAS_GLOBAL_DEPTH") {
            if let Ok(d) = depth.parse() {
                self.atlas.global_depth = d;
            }
        }
    }

    pub fn validate(&self) -> AtlasResult<()> {
        if self.api.port == 0 {
            return Err(AtlasError::Config("API port cannot be 0".into()));
        }

        if !(1..=MAX_DISTRICT_DEPTH).contains(&self.atlas.district_depth) {
            return Err(AtlasError::Config(format!(
                "atlas.district_depth must be within 1..={}, got {}",
                MAX_DISTRICT_DEPTH, self.atlas.district_depth
            )));
        }

        if !(1..=MAX_GLOBAL_DEPTH).contains(&self.atlas.global_depth) {
            return Err(AtlasError::Config(format!(
                "atlas.global_depth must be within 1..={}, got {}",
                MAX_GLOBAL_DEPTH, self.atlas.global_depth
            )));
        }

        if self.root_history.max_versions == 0 {
            return Err(AtlasError::Config(
                "root_history.max_versions must be at least 1".into(),
            ));
        }

        if self.root_history.max_age_secs > MAX_ROOT_MAX_AGE_SECS {
            return Err(AtlasError::Config(format!(
                "root_history.max_age_secs must be at most {}, got {}",
                MAX_ROOT_MAX_AGE_SECS, self.root_history.max_age_secs
            )));
        }

        if self.submissions.transaction_timeout_ms < MIN_TRANSACTION_TIMEOUT_MS {
            return Err(AtlasError::Config(format!(
                "submissions.transaction_timeout_ms must be at least {}",
                MIN_TRANSACTION_TIMEOUT_MS
            )));
        }

        if self.api.request_body_limit < 1024 {
            return Err(AtlasError::Config(
                "api.request_body_limit must be at least 1024 bytes".into(),
            ));
        }

        if self.api.submissions_per_second == 0 || self.api.submission_burst == 0 {
            return Err(AtlasError::Config(
                "api.submissions_per_second and api.submission_burst must be positive".into(),
            ));
        }

        if let Some(hash) = &self.zk.expected_vk_hash {
            if hash.len() != 64 || hex::decode(hash).is_err() {
                return Err(AtlasError::Config(
                    "zk.expected_vk_hash must be a 64-digit hex BLAKE3 hash".into(),
                ));
            }
        }

        Ok(())
    }

    pub fn check_security_warnings(&self) -> Vec<SecurityWarning> {
        let mut warnings = Vec::new();

        if self.api.admin_token.is_none() {
            warnings.push(SecurityWarning {
                severity: WarningSeverity::High,
                message: "No admin token configured. Anyone can define jurisdictions and register commitments.".into(),
                recommendation: "Set api.admin_token or the ATLAS_ADMIN_TOKEN environment variable.".into(),
            });
        } else if self.api.admin_token.as_ref().is_some_and(|t| t.len() < 16) {
            warnings.push(SecurityWarning {
                severity: WarningSeverity::Medium,
                message: "Admin token is shorter than 16 characters.".into(),
                recommendation: "Use a long random token.".into(),
            });
        }

        if !self.api_is_localhost_only() {
            warnings.push(SecurityWarning {
                severity: WarningSeverity::Medium,
                message: format!("API server bound to non-localhost address: {}", self.api.bind_address),
                recommendation: "Put the API behind a TLS-terminating proxy and restrict access.".into(),
            });
        }

        if self.zk.expected_vk_hash.is_none() {
            warnings.push(SecurityWarning {
                severity: WarningSeverity::Medium,
                message: "Verifying key is not pinned to a fingerprint.".into(),
                recommendation: "Set zk.expected_vk_hash to the hash printed by atlas-keygen.".into(),
            });
        }

        if self.zk.generate_if_missing {
            warnings.push(SecurityWarning {
                severity: WarningSeverity::Low,
                message: "zk.generate_if_missing is enabled; keys come from a local, untrusted setup.".into(),
                recommendation: "Generate keys once with atlas-keygen and distribute them.".into(),
            });
        }

        warnings
    }

    pub fn log_security_warnings(&self) {
        let warnings = self.check_security_warnings();
        if warnings.is_empty() {
            info!("Security check passed - no warnings");
            return;
        }

        for warning in &warnings {
            match warning.severity {
                WarningSeverity::High => {
                    warn!("SECURITY: {}", warning.message);
                    warn!("  -> {}", warning.recommendation);
                }
                WarningSeverity::Medium => {
                    warn!("{}", warning.message);
                    info!("  -> {}", warning.recommendation);
                }
                WarningSeverity::Low => {
                    info!("Note: {}", warning.message);
                }
            }
        }
    }

    pub fn api_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.api.bind_address, self.api.port)
    }

    pub fn api_is_localhost_only(&self) -> bool {
        match self.api.bind_address {
            IpAddr::V4(addr) => addr.is_loopback(),
            IpAddr::V6(addr) => addr.is_loopback(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_DIR_NAME)
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.zk
            .keys_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(KEYS_DIR_NAME))
    }

    pub fn redacted(&self) -> RedactedConfig {
        RedactedConfig {
            data_dir: self.data_dir.clone(),
            api_addr: self.api_socket_addr(),
            admin_token_set: self.api.admin_token.is_some(),
            request_body_limit: self.api.request_body_limit,
            district_depth: self.atlas.district_depth,
            global_depth: self.atlas.global_depth,
            max_versions: self.root_history.max_versions,
            max_age_secs: self.root_history.max_age_secs,
            transaction_timeout_ms: self.submissions.transaction_timeout_ms,
            keys_dir: self.keys_dir(),
            vk_pinned: self.zk.expected_vk_hash.is_some(),
        }
    }
}

#[derive(Debug)]
pub struct RedactedConfig {
    pub data_dir: PathBuf,
    pub api_addr: SocketAddr,
    pub admin_token_set: bool,
    pub request_body_limit: usize,
    pub district_depth: usize,
    pub global_depth: usize,
    pub max_versions: usize,
    pub max_age_secs: u64,
    pub transaction_timeout_ms: u64,
    pub keys_dir: PathBuf,
    pub vk_pinned: bool,
}

impl std::fmt::Display for RedactedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Shadow Atlas Configuration")?;
        writeln!(f, "==========================")?;
        writeln!(f, "Data dir: {:?}", self.data_dir)?;
        writeln!(f, "API: {}", self.api_addr)?;
        writeln!(f, "Admin token: {}", if self.admin_token_set { "[set]" } else { "[none]" })?;
        writeln!(f, "Body limit: {} bytes", self.request_body_limit)?;
        writeln!(f, "Depths: district {}, global {}", self.district_depth, self.global_depth)?;
        writeln!(
            f,
            "Root history: {} versions, {} s",
            self.max_versions, self.max_age_secs
        )?;
        writeln!(f, "Submission timeout: {} ms", self.transaction_timeout_ms)?;
        writeln!(f, "Keys dir: {:?}", self.keys_dir)?;
        write!(f, "VK pinned: {}", self.vk_pinned)
    }
}
