pub const DEFAULT_API_PORT: u16 = 8787;

pub const DEFAULT_REQUEST_BODY_LIMIT: usize = 64 * 1024;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DATA_DIR_NAME: &str = ".shadow-atlas";

pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const KEYS_DIR_NAME: &str = "keys";

pub const DB_DIR_NAME: &str = "db";

pub const MIN_TRANSACTION_TIMEOUT_MS: u64 = 50;

/// Upper bound for `root_history.max_age_secs` (one year).
pub const MAX_ROOT_MAX_AGE_SECS: u64 = 365 * 24 * 3600;

pub const DEFAULT_SUBMISSIONS_PER_SECOND: u32 = 50;

pub const DEFAULT_SUBMISSION_BURST: u32 = 100;
