use atlas_types::{AtlasError, AtlasResult};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::middleware::ApiRateLimiter;

pub struct ApiServer {
    addr: SocketAddr,
    router: Router,
    rate_limiter: Arc<ApiRateLimiter>,
    auth_enabled: bool,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, router: Router, rate_limiter: Arc<ApiRateLimiter>, auth_enabled: bool) -> Self {
        Self {
            addr,
            router,
            rate_limiter,
            auth_enabled,
        }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> AtlasResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| AtlasError::Config(format!("Failed to bind API server on {}: {}", self.addr, e)))?;

        info!("API server listening on http://{}", self.addr);
        if self.auth_enabled {
            info!("Admin authentication: ENABLED");
        } else {
            warn!("Admin authentication: DISABLED - admin routes are open");
        }

        let limiter = Arc::clone(&self.rate_limiter);
        let cleanup = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                limiter.cleanup();
            }
        });

        let result = axum::serve(
            listener,
            self.router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AtlasError::Internal(format!("API server error: {}", e)));

        cleanup.abort();
        info!("API server stopped");
        result
    }
}
