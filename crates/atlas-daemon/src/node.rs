use atlas_crypto::CircuitParams;
use atlas_types::{AtlasError, AtlasResult};
use axum::Router;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{self, ApiServer, AppState};
use crate::atlas::ShadowAtlas;
use crate::config::{AtlasConfig, WarningSeverity};
use crate::services::{Groth16Verifier, ProofVerifier, SubmissionPipeline};
use crate::storage::{AtlasStorage, StorageConfig};

/// A fully wired daemon: storage, atlas, verifier, pipeline and API state.
pub struct AtlasNode {
    config: AtlasConfig,
    storage: Arc<AtlasStorage>,
    atlas: Arc<ShadowAtlas>,
    pipeline: Arc<SubmissionPipeline>,
    state: AppState,
    started_at: DateTime<Utc>,
}

impl AtlasNode {
    /// Open storage under `data_dir` and load the Groth16 verifying key.
    pub fn open(config: AtlasConfig) -> AtlasResult<Self> {
        let storage = Arc::new(AtlasStorage::open(StorageConfig::at(config.db_path()))?);
        let verifier = Arc::new(Groth16Verifier::from_config(&config)?);
        Self::with_parts(config, storage, verifier)
    }

    /// Wire a node from already opened parts.
    pub fn with_parts(
        config: AtlasConfig,
        storage: Arc<AtlasStorage>,
        verifier: Arc<dyn ProofVerifier>,
    ) -> AtlasResult<Self> {
        config.validate()?;
        let params = CircuitParams::new(config.atlas.district_depth, config.atlas.global_depth)?;
        let atlas = Arc::new(ShadowAtlas::open(
            Arc::clone(&storage),
            params,
            config.root_history,
        )?);
        let pipeline = Arc::new(SubmissionPipeline::new(
            Arc::clone(&storage),
            verifier,
            atlas.history(),
            Duration::from_millis(config.submissions.transaction_timeout_ms),
        ));
        let state = AppState::new(Arc::clone(&atlas), Arc::clone(&pipeline), &config.api);

        Ok(Self {
            config,
            storage,
            atlas,
            pipeline,
            state,
            started_at: Utc::now(),
        })
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn storage(&self) -> Arc<AtlasStorage> {
        Arc::clone(&self.storage)
    }

    pub fn atlas(&self) -> Arc<ShadowAtlas> {
        Arc::clone(&self.atlas)
    }

    pub fn pipeline(&self) -> Arc<SubmissionPipeline> {
        Arc::clone(&self.pipeline)
    }

    pub fn router(&self) -> Router {
        api::router(self.state.clone(), &self.config.api)
    }

    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    /// Serve the API until `shutdown` resolves, then flush storage.
    pub async fn run<F>(self, shutdown: F) -> AtlasResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.config.log_security_warnings();
        let head = self.atlas.head();
        info!(
            version = head.version,
            root = %head.global_root.short_hex(),
            vk_hash = %short(self.pipeline.verifier_fingerprint()),
            "Shadow Atlas node starting"
        );

        let server = ApiServer::new(
            self.config.api_socket_addr(),
            self.router(),
            Arc::clone(&self.state.rate_limiter),
            self.state.authenticator.is_enabled(),
        );
        let served = server.serve(shutdown).await;

        info!("Flushing storage");
        if let Err(e) = self.storage.flush_async().await {
            warn!("Final flush failed: {}", e);
        }
        served
    }

    pub async fn diagnose(&self) -> DiagnosticReport {
        let mut report = DiagnosticReport::new();

        report.add_check("Storage schema", self.check_schema());
        report.add_check("Atlas head", self.check_head());
        report.add_check("Verifying key", self.check_verifying_key());
        report.add_check("Root history", self.check_history());
        report.add_check("Disk usage", self.check_disk_usage());
        report.add_check("API port", self.check_port_free().await);
        for warning in self.config.check_security_warnings() {
            let message = match warning.severity {
                WarningSeverity::High => format!("{} {}", warning.message, warning.recommendation),
                WarningSeverity::Medium | WarningSeverity::Low => warning.message,
            };
            report.add_check("Security", CheckResult::Warn(message));
        }

        report
    }

    fn check_schema(&self) -> CheckResult {
        match self.storage.schema_version() {
            Ok(version) => CheckResult::Pass(format!("Schema version {}", version)),
            Err(e) => CheckResult::Fail(e.to_string()),
        }
    }

    fn check_head(&self) -> CheckResult {
        let view = self.atlas.view();
        match self.storage.latest_head() {
            Ok(Some(stored)) if stored.global_root == view.head.global_root => CheckResult::Pass(format!(
                "Version {} with {} jurisdictions and {} leaves",
                view.head.version,
                view.jurisdictions.len(),
                view.total_leaves
            )),
            Ok(Some(stored)) => CheckResult::Fail(format!(
                "Published root {} differs from stored root {}",
                view.head.global_root.short_hex(),
                stored.global_root.short_hex()
            )),
            Ok(None) => CheckResult::Fail("No atlas version persisted".into()),
            Err(e) => CheckResult::Fail(e.to_string()),
        }
    }

    fn check_verifying_key(&self) -> CheckResult {
        let fingerprint = self.pipeline.verifier_fingerprint();
        match &self.config.zk.expected_vk_hash {
            Some(expected) if expected.eq_ignore_ascii_case(fingerprint) => {
                CheckResult::Pass(format!("Pinned key {}", short(fingerprint)))
            }
            Some(expected) => CheckResult::Fail(format!(
                "Key {} does not match pinned {}",
                short(fingerprint),
                short(expected)
            )),
            None => CheckResult::Warn(format!(
                "Key {} is not pinned (set zk.expected_vk_hash)",
                short(fingerprint)
            )),
        }
    }

    fn check_history(&self) -> CheckResult {
        let history = self.atlas.history();
        let config = history.config();
        CheckResult::Pass(format!(
            "{} roots retained; window is {} versions / {} s",
            history.len(),
            config.max_versions,
            config.max_age_secs
        ))
    }

    fn check_disk_usage(&self) -> CheckResult {
        if self.storage.is_in_memory() {
            return CheckResult::Pass("In-memory database".into());
        }
        match self.storage.size_on_disk() {
            Ok(bytes) if bytes > 10 * 1024 * 1024 * 1024 => {
                CheckResult::Warn(format!("Database uses {} MiB", bytes / (1024 * 1024)))
            }
            Ok(bytes) => CheckResult::Pass(format!("Database uses {} MiB", bytes / (1024 * 1024))),
            Err(e) => CheckResult::Fail(e.to_string()),
        }
    }

    async fn check_port_free(&self) -> CheckResult {
        let addr = self.config.api_socket_addr();
        match tokio::net::TcpListener::bind(addr).await {
            Ok(_) => CheckResult::Pass(format!("{} is available", addr)),
            Err(e) => CheckResult::Warn(format!("{} cannot be bound: {}", addr, e)),
        }
    }
}

fn short(hex: &str) -> &str {
    hex.get(..16).unwrap_or(hex)
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[derive(Clone, Debug)]
pub enum CheckResult {
    Pass(String),
    Warn(String),
    Fail(String),
}

impl CheckResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, CheckResult::Pass(_))
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, CheckResult::Fail(_))
    }

    pub fn message(&self) -> &str {
        match self {
            CheckResult::Pass(m) | CheckResult::Warn(m) | CheckResult::Fail(m) => m,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DiagnosticReport {
    checks: Vec<(String, CheckResult)>,
    timestamp: DateTime<Utc>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self {
            checks: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn add_check(&mut self, name: &str, result: CheckResult) {
        self.checks.push((name.to_string(), result));
    }

    pub fn checks(&self) -> &[(String, CheckResult)] {
        &self.checks
    }

    pub fn has_failures(&self) -> bool {
        self.checks.iter().any(|(_, r)| r.is_fail())
    }

    pub fn into_result(self) -> AtlasResult<()> {
        if self.has_failures() {
            Err(AtlasError::Config(self.summary()))
        } else {
            Ok(())
        }
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|(_, r)| r.is_pass()).count();
        let failed = self.checks.iter().filter(|(_, r)| r.is_fail()).count();
        let warnings = self.checks.len() - passed - failed;
        format!("{} passed, {} warnings, {} failed", passed, warnings, failed)
    }
}

impl Default for DiagnosticReport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Shadow Atlas Diagnostics")?;
        writeln!(f, "========================")?;
        writeln!(f, "Time: {}", self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f)?;

        for (name, result) in &self.checks {
            let symbol = match result {
                CheckResult::Pass(_) => "[OK]",
                CheckResult::Warn(_) => "[!!]",
                CheckResult::Fail(_) => "[XX]",
            };
            writeln!(f, "{} {}: {}", symbol, name, result.message())?;
        }

        writeln!(f)?;
        writeln!(f, "Summary: {}", self.summary())
    }
}
