use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::{limit_submissions, require_admin};
use super::state::AppState;
use crate::config::ApiConfig;

/// Build the HTTP surface.
///
/// Layer order (outermost first): trace, timeout, body limit, then the
/// per-group admin or rate-limit middleware.
pub fn router(state: AppState, config: &ApiConfig) -> Router {
    let admin = Router::new()
        .route("/v1/jurisdictions", post(handlers::define_jurisdiction))
        .route("/v1/commitments", post(handlers::register_commitment))
        .route("/v1/submissions/:id/status", post(handlers::advance_status))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let submissions = Router::new()
        .route("/v1/submissions", post(handlers::submit))
        .route_layer(from_fn_with_state(state.clone(), limit_submissions));

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::prometheus))
        .route("/v1/jurisdictions/:id", get(handlers::get_jurisdiction))
        .route("/v1/atlas/root", get(handlers::atlas_root))
        .route("/v1/atlas/history", get(handlers::root_history))
        .route("/v1/atlas/paths/:jurisdiction/:leaf_index", get(handlers::inclusion_path))
        .route("/v1/atlas/snapshot", get(handlers::snapshot))
        .route("/v1/submissions/:id", get(handlers::get_submission))
        .route("/v1/stats", get(handlers::stats));

    Router::new()
        .merge(public)
        .merge(admin)
        .merge(submissions)
        .layer(DefaultBodyLimit::max(config.request_body_limit))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
