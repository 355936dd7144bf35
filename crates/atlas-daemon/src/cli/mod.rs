mod checks;
mod commands;
mod config_cmd;
mod init;
mod keygen;
mod prove;
mod run;
mod snapshot;
mod utils;

pub use checks::run_checks;
pub use commands::{Cli, Commands};
pub use config_cmd::handle_config;
pub use init::init_node;
pub use keygen::handle_keygen;
pub use prove::{new_identity, prove, ProveArgs};
pub use run::run_node;
pub use snapshot::handle_snapshot;
pub use utils::{init_logging, load_config, show_version};
