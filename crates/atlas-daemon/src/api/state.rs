use std::sync::Arc;
use std::time::Instant;

use super::middleware::{ApiAuthenticator, ApiRateLimiter};
use crate::atlas::ShadowAtlas;
use crate::config::ApiConfig;
use crate::metrics::PrometheusExporter;
use crate::services::SubmissionPipeline;

/// Shared handles behind every route.
#[derive(Clone)]
pub struct AppState {
    pub atlas: Arc<ShadowAtlas>,
    pub pipeline: Arc<SubmissionPipeline>,
    pub exporter: Arc<PrometheusExporter>,
    pub authenticator: Arc<ApiAuthenticator>,
    pub rate_limiter: Arc<ApiRateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(atlas: Arc<ShadowAtlas>, pipeline: Arc<SubmissionPipeline>, config: &ApiConfig) -> Self {
        let exporter = PrometheusExporter::new(pipeline.metrics(), atlas.storage_metrics());
        Self {
            atlas,
            pipeline,
            exporter: Arc::new(exporter),
            authenticator: Arc::new(ApiAuthenticator::new(config.admin_token.clone())),
            rate_limiter: Arc::new(ApiRateLimiter::new(
                config.submissions_per_second,
                config.submission_burst,
            )),
            started_at: Instant::now(),
        }
    }
}
