mod cli;

use atlas_types::AtlasResult;
use clap::Parser;
use cli::{
    handle_config, handle_keygen, handle_snapshot, init_logging, init_node, load_config, new_identity, prove,
    run_checks, run_node, show_version, Cli, Commands, ProveArgs,
};

#[tokio::main]
async fn main() -> AtlasResult<()> {
    let cli = Cli::parse();
    let (config_path, config) = load_config(&cli)?;
    init_logging(&cli, &config.logging)?;

    match cli.command {
        Commands::Run { pid_file } => {
            run_node(config, pid_file).await?;
        }
        Commands::Init {
            force,
            district_depth,
            global_depth,
        } => {
            init_node(&config_path, config, force, district_depth, global_depth)?;
        }
        Commands::Keygen { force } => {
            handle_keygen(&config, force)?;
        }
        Commands::Config { action } => {
            handle_config(&config_path, &config, action)?;
        }
        Commands::Check => {
            run_checks(config).await?;
        }
        Commands::Snapshot { action } => {
            handle_snapshot(&config, action).await?;
        }
        Commands::Identity => {
            new_identity()?;
        }
        Commands::Prove {
            snapshot,
            content_id,
            secret_file,
            jurisdiction,
            action,
            payload,
        } => {
            let args = ProveArgs {
                snapshot,
                content_id,
                secret_file,
                jurisdiction,
                action,
                payload,
            };
            prove(&config, args).await?;
        }
        Commands::Version => {
            show_version();
        }
    }

    Ok(())
}
