use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "atlasd")]
#[command(version = BUILD_VERSION)]
#[command(about = "Shadow Atlas daemon - jurisdiction Merkle commitments and anonymous membership submissions")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, global = true, value_name = "FILE", help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(short = 'd', long, global = true, value_name = "DIR", help = "Data directory path")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Write logs to file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Log format (defaults to logging.json in the config)")]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the daemon")]
    #[command(long_about = "Start the Shadow Atlas daemon.\n\nOpens the database, loads the membership verifying key and serves the HTTP API until SIGINT or SIGTERM.")]
    Run {
        #[arg(long, value_name = "FILE", help = "Write PID to file")]
        pid_file: Option<PathBuf>,
    },

    #[command(about = "Write a default configuration and create the data directory")]
    Init {
        #[arg(short, long, help = "Overwrite existing configuration")]
        force: bool,
        #[arg(long, value_name = "DEPTH", help = "District tree depth")]
        district_depth: Option<usize>,
        #[arg(long, value_name = "DEPTH", help = "Global tree depth")]
        global_depth: Option<usize>,
    },

    #[command(about = "Generate membership proving and verifying keys for the configured depths")]
    Keygen {
        #[arg(short, long, help = "Replace existing keys")]
        force: bool,
    },

    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    #[command(about = "Run diagnostic checks against the data directory")]
    Check,

    #[command(about = "Export or inspect atlas snapshots")]
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    #[command(about = "Generate a new identity secret and its commitment")]
    Identity,

    #[command(about = "Build a membership proof from a snapshot")]
    #[command(long_about = "Build a membership proof from a snapshot.\n\nPrints a JSON body ready for POST /v1/submissions.")]
    Prove {
        #[arg(long, value_name = "FILE", help = "Snapshot bundle")]
        snapshot: PathBuf,
        #[arg(long, value_name = "HEX", help = "Expected snapshot content id")]
        content_id: Option<String>,
        #[arg(long, value_name = "FILE", help = "File holding the 0x-hex identity secret")]
        secret_file: PathBuf,
        #[arg(long, value_name = "ID", help = "Jurisdiction holding the commitment")]
        jurisdiction: String,
        #[arg(long, value_name = "TEXT", help = "Action context the nullifier is bound to")]
        action: String,
        #[arg(long, value_name = "TEXT", default_value = "", help = "Submission payload")]
        payload: String,
    },

    #[command(about = "Show version information")]
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    #[command(about = "Show effective configuration (secrets redacted)")]
    Show,
    #[command(about = "Validate configuration")]
    Validate,
    #[command(about = "Print the config file path")]
    Path,
}

#[derive(Subcommand)]
pub enum SnapshotAction {
    #[command(about = "Write the current atlas snapshot to a file")]
    Export {
        #[arg(short, long, value_name = "FILE", help = "Output file")]
        output: PathBuf,
    },
    #[command(about = "Open a snapshot file and verify every root")]
    Inspect {
        #[arg(help = "Snapshot file")]
        file: PathBuf,
        #[arg(long, value_name = "HEX", help = "Expected content id")]
        content_id: Option<String>,
    },
}
