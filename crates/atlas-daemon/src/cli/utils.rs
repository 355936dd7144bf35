use super::commands::{Cli, LogFormat};
use atlas_daemon::config::{AtlasConfig, LoggingConfig, CONFIG_FILE_NAME};
use atlas_types::{AtlasError, AtlasResult};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `RUST_LOG` wins over `-v`/`-q`, which win over `logging.level`.
pub fn init_logging(cli: &Cli, config: &LoggingConfig) -> AtlasResult<()> {
    let level = if cli.quiet {
        "warn".to_string()
    } else {
        match cli.verbose {
            0 => config.level.to_string(),
            1 => "info,atlas_daemon=debug,atlas_crypto=debug".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = match cli.log_format {
        Some(LogFormat::Json) => true,
        Some(LogFormat::Text) => false,
        None => config.json,
    };
    let log_file = cli.log_file.clone().or_else(|| config.file.clone());

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AtlasError::Config(format!("Failed to open log file {:?}: {}", path, e)))?;
        let writer = std::sync::Mutex::new(file);
        if json {
            subscriber.with(fmt::layer().json().with_writer(writer)).init();
        } else {
            subscriber.with(fmt::layer().with_writer(writer).with_ansi(false)).init();
        }
    } else if json {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber.with(fmt::layer().with_target(cli.verbose >= 2)).init();
    }

    Ok(())
}

/// Resolve the config path and load it; `--data-dir` overrides the file.
pub fn load_config(cli: &Cli) -> AtlasResult<(PathBuf, AtlasConfig)> {
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| AtlasConfig::default().data_dir);
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME));

    let mut config = AtlasConfig::load(&config_path)?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok((config_path, config))
}

pub fn ensure_dir(path: &std::path::Path) -> AtlasResult<()> {
    std::fs::create_dir_all(path)
        .map_err(|e| AtlasError::Config(format!("Failed to create {:?}: {}", path, e)))
}

pub fn show_version() {
    println!("atlasd {}", BUILD_VERSION);
    println!("Membership circuit {}", atlas_crypto::keys::CIRCUIT_VERSION);
}
