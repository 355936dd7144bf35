//! Groth16 key generation for the Shadow Atlas membership circuit.
//!
//! Usage:
//!   atlas-keygen generate --output ./keys --district-depth 20 --global-depth 12
//!   atlas-keygen verify --keys-dir ./keys --expected-hash <hex>
//!   atlas-keygen info --keys-dir ./keys

use atlas_crypto::keys::{read_metadata, CIRCUIT_VERSION};
use atlas_crypto::{load_verifier, CircuitParams, MembershipKeys};
use atlas_types::{DEFAULT_DISTRICT_DEPTH, DEFAULT_GLOBAL_DEPTH};
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use std::path::PathBuf;

/// Membership circuit key generation tool.
#[derive(Parser)]
#[command(name = "atlas-keygen")]
#[command(about = "Generate Groth16 proving and verifying keys for the membership circuit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate new proving and verifying keys.
    Generate {
        /// Output directory for keys.
        #[arg(short, long, default_value = "./atlas-keys")]
        output: PathBuf,

        /// Depth of every district tree.
        #[arg(long, default_value_t = DEFAULT_DISTRICT_DEPTH)]
        district_depth: usize,

        /// Depth of the global tree.
        #[arg(long, default_value_t = DEFAULT_GLOBAL_DEPTH)]
        global_depth: usize,
    },

    /// Check that a key directory loads and matches an expected fingerprint.
    Verify {
        /// Directory containing keys.
        #[arg(short, long, default_value = "./atlas-keys")]
        keys_dir: PathBuf,

        /// Expected VK hash (hex).
        #[arg(short, long)]
        expected_hash: Option<String>,
    },

    /// Show information about existing keys.
    Info {
        /// Directory containing keys.
        #[arg(short, long, default_value = "./atlas-keys")]
        keys_dir: PathBuf,
    },
}

fn generate(output: &PathBuf, district_depth: usize, global_depth: usize) -> anyhow::Result<()> {
    let params = CircuitParams::new(district_depth, global_depth)?;

    println!("Shadow Atlas Key Generator v{}", CIRCUIT_VERSION);
    println!("================================");
    println!("District depth: {}", params.district_depth);
    println!("Global depth:   {}", params.global_depth);
    println!();
    println!("Running circuit-specific setup. This may take several minutes.");

    let keys = MembershipKeys::setup(params, &mut OsRng)?;
    let metadata = keys.save(output)?;

    println!();
    println!("Proving key:   {} bytes", metadata.pk_size);
    println!("Verifying key: {} bytes", metadata.vk_size);
    println!("VK hash:       {}", metadata.vk_hash);
    println!();
    println!("Keys written to {}", output.display());
    println!("Pin the VK hash in the daemon config as zk.expected_vk_hash.");
    Ok(())
}

fn verify(keys_dir: &PathBuf, expected_hash: Option<String>) -> anyhow::Result<()> {
    println!("Verifying keys in {}", keys_dir.display());
    let verifier = load_verifier(keys_dir, expected_hash.as_deref())?;
    println!("Deserialization: OK");
    println!("VK hash: {}", verifier.fingerprint());
    if expected_hash.is_some() {
        println!("Hash match: OK");
    }
    Ok(())
}

fn info(keys_dir: &PathBuf) -> anyhow::Result<()> {
    println!("Shadow Atlas Keys Info");
    println!("======================");
    println!("Directory: {}", keys_dir.display());
    println!();

    if !MembershipKeys::exists(keys_dir) {
        println!("No keys found. Run 'atlas-keygen generate' first.");
        return Ok(());
    }

    let metadata = read_metadata(keys_dir)?;
    println!("Membership circuit:");
    println!("  Version:        {}", metadata.version);
    println!("  District depth: {}", metadata.district_depth);
    println!("  Global depth:   {}", metadata.global_depth);
    println!("  VK hash:        {}", metadata.vk_hash);
    println!("  PK size:        {} bytes", metadata.pk_size);
    println!("  VK size:        {} bytes", metadata.vk_size);
    println!("  Generated:      {}", metadata.generated_at);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            output,
            district_depth,
            global_depth,
        } => generate(&output, district_depth, global_depth),
        Commands::Verify {
            keys_dir,
            expected_hash,
        } => verify(&keys_dir, expected_hash),
        Commands::Info { keys_dir } => info(&keys_dir),
    }
}
