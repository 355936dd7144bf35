use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::error::ApiError;
use super::state::AppState;

/// Token buckets per client address plus one global bucket.
pub struct ApiRateLimiter {
    tokens_per_sec: f64,
    burst_size: u32,
    state: RwLock<HashMap<IpAddr, TokenBucket>>,
    global: RwLock<TokenBucket>,
}

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(initial: f64) -> Self {
        Self {
            tokens: initial,
            last_update: Instant::now(),
        }
    }

    fn refill(&mut self, rate: f64, max: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        self.tokens = (self.tokens + elapsed * rate).min(max);
    }

    fn try_consume(&mut self, rate: f64, max: f64) -> bool {
        self.refill(rate, max);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl ApiRateLimiter {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            tokens_per_sec: requests_per_second as f64,
            burst_size,
            state: RwLock::new(HashMap::new()),
            global: RwLock::new(TokenBucket::new(burst_size as f64 * 10.0)),
        }
    }

    pub fn check_request(&self, ip: IpAddr) -> RateLimitResult {
        {
            let mut global = self.global.write();
            if !global.try_consume(self.tokens_per_sec * 10.0, self.burst_size as f64 * 10.0) {
                return RateLimitResult::GlobalLimitExceeded;
            }
        }

        let mut state = self.state.write();
        let bucket = state
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(self.burst_size as f64));

        if bucket.try_consume(self.tokens_per_sec, self.burst_size as f64) {
            RateLimitResult::Allowed
        } else {
            RateLimitResult::IpLimitExceeded
        }
    }

    /// Forget clients idle for five minutes.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.state
            .write()
            .retain(|_, bucket| now.duration_since(bucket.last_update).as_secs() < 300);
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            tracked_ips: self.state.read().len(),
            global_tokens_available: self.global.read().tokens as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    IpLimitExceeded,
    GlobalLimitExceeded,
}

#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub tracked_ips: usize,
    pub global_tokens_available: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Authenticated,
    NotRequired,
    MissingToken,
    InvalidFormat,
    InvalidToken,
}

/// Bearer-token check for admin routes.
pub struct ApiAuthenticator {
    token: Option<String>,
}

impl ApiAuthenticator {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    pub fn authenticate(&self, auth_header: Option<&str>) -> AuthResult {
        let Some(expected) = &self.token else {
            return AuthResult::NotRequired;
        };
        let Some(header) = auth_header else {
            return AuthResult::MissingToken;
        };
        let Some(provided) = header.strip_prefix("Bearer ") else {
            return AuthResult::InvalidFormat;
        };

        if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            AuthResult::Authenticated
        } else {
            AuthResult::InvalidToken
        }
    }
}

pub(crate) async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match state.authenticator.authenticate(header) {
        AuthResult::Authenticated | AuthResult::NotRequired => Ok(next.run(request).await),
        AuthResult::MissingToken => Err(ApiError::Unauthorized("Missing bearer token")),
        AuthResult::InvalidFormat => Err(ApiError::Unauthorized("Expected `Authorization: Bearer <token>`")),
        AuthResult::InvalidToken => {
            warn!(path = %request.uri().path(), "Rejected admin request with a wrong token");
            Err(ApiError::Unauthorized("Invalid bearer token"))
        }
    }
}

pub(crate) async fn limit_submissions(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = client_ip(&request);
    match state.rate_limiter.check_request(ip) {
        RateLimitResult::Allowed => Ok(next.run(request).await),
        result => {
            debug!(%ip, ?result, "Submission rate limited");
            Err(ApiError::RateLimited)
        }
    }
}

/// Peer address from the connection; unspecified when served without one (tests).
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_not_required_without_token() {
        let auth = ApiAuthenticator::new(None);
        assert!(!auth.is_enabled());
        assert_eq!(auth.authenticate(None), AuthResult::NotRequired);

        let empty = ApiAuthenticator::new(Some(String::new()));
        assert_eq!(empty.authenticate(None), AuthResult::NotRequired);
    }

    #[test]
    fn test_auth_checks_bearer_token() {
        let auth = ApiAuthenticator::new(Some("s3cret".into()));
        assert_eq!(auth.authenticate(None), AuthResult::MissingToken);
        assert_eq!(auth.authenticate(Some("s3cret")), AuthResult::InvalidFormat);
        assert_eq!(auth.authenticate(Some("Bearer nope")), AuthResult::InvalidToken);
        assert_eq!(auth.authenticate(Some("Bearer s3cre")), AuthResult::InvalidToken);
        assert_eq!(auth.authenticate(Some("Bearer s3cret")), AuthResult::Authenticated);
    }

    #[test]
    fn test_rate_limiter_burst() {
        let limiter = ApiRateLimiter::new(1, 3);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..3 {
            assert_eq!(limiter.check_request(ip), RateLimitResult::Allowed);
        }
        assert_eq!(limiter.check_request(ip), RateLimitResult::IpLimitExceeded);

        let other: IpAddr = "10.0.0.2".parse().unwrap();
        assert_eq!(limiter.check_request(other), RateLimitResult::Allowed);
        assert_eq!(limiter.stats().tracked_ips, 2);
    }
}
