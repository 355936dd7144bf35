use super::utils::ensure_dir;
use atlas_daemon::config::AtlasConfig;
use atlas_daemon::node::{shutdown_signal, AtlasNode};
use atlas_types::{AtlasError, AtlasResult};
use std::path::PathBuf;
use tracing::{info, warn};

pub async fn run_node(config: AtlasConfig, pid_file: Option<PathBuf>) -> AtlasResult<()> {
    info!("Starting Shadow Atlas daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {:?}", config.data_dir);
    ensure_dir(&config.data_dir)?;

    if let Some(ref pid_path) = pid_file {
        std::fs::write(pid_path, std::process::id().to_string())
            .map_err(|e| AtlasError::Config(format!("Failed to write PID file: {}", e)))?;
        info!("PID file written: {:?}", pid_path);
    }

    let api_addr = config.api_socket_addr();
    let node = AtlasNode::open(config)?;
    info!("HTTP API listening on http://{}", api_addr);

    let result = node.run(shutdown_signal()).await;

    if let Some(ref pid_path) = pid_file {
        if let Err(e) = std::fs::remove_file(pid_path) {
            warn!("Failed to remove PID file {:?}: {}", pid_path, e);
        }
    }

    info!("Shutdown complete");
    result
}
