use super::utils::ensure_dir;
use atlas_crypto::MembershipKeys;
use atlas_daemon::config::AtlasConfig;
use atlas_daemon::services::generate_keys;
use atlas_types::AtlasResult;

pub fn handle_keygen(config: &AtlasConfig, force: bool) -> AtlasResult<()> {
    let keys_dir = config.keys_dir();
    if MembershipKeys::exists(&keys_dir) && !force {
        println!("Keys already exist in {:?}", keys_dir);
        println!("Use --force to replace them. Every outstanding proof becomes unverifiable.");
        return Ok(());
    }

    ensure_dir(&keys_dir)?;
    println!(
        "Running setup for depths {}/{}. This may take several minutes.",
        config.atlas.district_depth, config.atlas.global_depth
    );
    let keys = generate_keys(config, &keys_dir)?;

    println!();
    println!("VK hash: {}", keys.vk_fingerprint()?);
    println!("Keys written to {}", keys_dir.display());
    println!("Pin the VK hash in the config as zk.expected_vk_hash.");
    Ok(())
}
