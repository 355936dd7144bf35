mod api;
mod atlas;
mod constants;
mod daemon;
mod logging;
mod submissions;
mod types;
mod zk;

pub use api::ApiConfig;
pub use atlas::{AtlasTreeConfig, RootHistoryConfig};
pub use constants::*;
pub use daemon::{AtlasConfig, RedactedConfig};
pub use logging::LoggingConfig;
pub use submissions::SubmissionsConfig;
pub use types::*;
pub use zk::ZkConfig;

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_default_config_validation() {
        let config = AtlasConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = AtlasConfig::default();
        assert_eq!(config.api.port, 8787);
        assert_eq!(config.api.request_body_limit, 64 * 1024);
        assert_eq!(config.atlas.district_depth, 20);
        assert_eq!(config.atlas.global_depth, 12);
        assert_eq!(config.root_history.max_versions, 64);
        assert_eq!(config.root_history.max_age_secs, 3600);
        assert_eq!(config.submissions.transaction_timeout_ms, 1500);
        assert!(config.data_dir.ends_with(".shadow-atlas"));
        assert_eq!(config.keys_dir(), config.data_dir.join("keys"));
    }

    #[test]
    fn test_api_defaults_to_localhost() {
        let config = AtlasConfig::default();
        assert!(config.api_is_localhost_only());
        assert_eq!(config.api.bind_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_depth_bounds() {
        let mut config = AtlasConfig::default();
        config.atlas.district_depth = 0;
        assert!(config.validate().is_err());
        config.atlas.district_depth = 33;
        assert!(config.validate().is_err());
        config.atlas.district_depth = 32;
        assert!(config.validate().is_ok());

        config.atlas.global_depth = 25;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_root_max_age_is_bounded() {
        let mut config = AtlasConfig::default();
        config.root_history.max_age_secs = MAX_ROOT_MAX_AGE_SECS;
        assert!(config.validate().is_ok());
        config.root_history.max_age_secs = u64::MAX / 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_port() {
        let mut config = AtlasConfig::default();
        config.api.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_vk_hash_rejected() {
        let mut config = AtlasConfig::default();
        config.zk.expected_vk_hash = Some("abc".into());
        assert!(config.validate().is_err());
        config.zk.expected_vk_hash = Some("ab".repeat(32));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AtlasConfig::from_toml(
            r#"
            [atlas]
            district_depth = 4

            [root_history]
            max_age_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.atlas.district_depth, 4);
        assert_eq!(config.atlas.global_depth, 12);
        assert_eq!(config.root_history.max_age_secs, 60);
        assert_eq!(config.root_history.max_versions, 64);
        assert_eq!(config.api.port, 8787);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("atlas-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");
        let mut config = AtlasConfig::default();
        config.atlas.global_depth = 6;
        config.logging.json = true;
        config.save(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let loaded = AtlasConfig::from_toml(&contents).unwrap();
        assert_eq!(loaded.atlas.global_depth, 6);
        assert!(loaded.logging.json);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_security_warnings_without_token() {
        let config = AtlasConfig::default();
        let warnings = config.check_security_warnings();
        assert!(warnings.iter().any(|w| w.severity == WarningSeverity::High));

        let mut config = AtlasConfig::default();
        config.api.admin_token = Some("a-long-enough-admin-token".into());
        config.zk.expected_vk_hash = Some("00".repeat(32));
        assert!(config.check_security_warnings().is_empty());
    }

    #[test]
    fn test_redacted_hides_token() {
        let mut config = AtlasConfig::default();
        config.api.admin_token = Some("super-secret-token".into());
        let shown = config.redacted().to_string();
        assert!(!shown.contains("super-secret-token"));
        assert!(shown.contains("[set]"));
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert_eq!(LogLevel::default().to_string(), "info");
    }
}
