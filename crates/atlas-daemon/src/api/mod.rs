mod error;
mod handlers;
mod middleware;
mod responses;
mod router;
mod server;
mod state;

pub use error::{ApiError, ApiResult, ErrorBody, ErrorDetail};
pub use handlers::{StatsResponse, ATLAS_VERSION_HEADER, CONTENT_ID_HEADER};
pub use middleware::{ApiAuthenticator, ApiRateLimiter, AuthResult, RateLimitResult, RateLimiterStats};
pub use responses::*;
pub use router::router;
pub use server::ApiServer;
pub use state::AppState;

#[cfg(test)]
mod tests;
