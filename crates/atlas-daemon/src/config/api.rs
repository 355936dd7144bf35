use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

use super::constants::{
    DEFAULT_API_PORT, DEFAULT_REQUEST_BODY_LIMIT, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SUBMISSIONS_PER_SECOND,
    DEFAULT_SUBMISSION_BURST,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    /// Bearer token for admin routes. Admin routes are open when unset.
    pub admin_token: Option<String>,
    pub request_body_limit: usize,
    pub request_timeout_secs: u64,
    /// Per-client token refill rate on `POST /v1/submissions`.
    pub submissions_per_second: u32,
    pub submission_burst: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_API_PORT,
            admin_token: None,
            request_body_limit: DEFAULT_REQUEST_BODY_LIMIT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            submissions_per_second: DEFAULT_SUBMISSIONS_PER_SECOND,
            submission_burst: DEFAULT_SUBMISSION_BURST,
        }
    }
}
