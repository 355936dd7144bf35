use super::utils::ensure_dir;
use atlas_daemon::config::AtlasConfig;
use atlas_types::AtlasResult;
use std::path::Path;

pub fn init_node(
    config_path: &Path,
    mut config: AtlasConfig,
    force: bool,
    district_depth: Option<usize>,
    global_depth: Option<usize>,
) -> AtlasResult<()> {
    if config_path.exists() && !force {
        println!("Configuration already exists at {:?}", config_path);
        println!("Use --force to overwrite");
        return Ok(());
    }

    if let Some(depth) = district_depth {
        config.atlas.district_depth = depth;
    }
    if let Some(depth) = global_depth {
        config.atlas.global_depth = depth;
    }
    config.validate()?;

    ensure_dir(&config.data_dir)?;
    ensure_dir(&config.keys_dir())?;
    config.save(config_path)?;

    println!("[+] Configuration written to {:?}", config_path);
    println!("[+] Data directory {:?}", config.data_dir);
    println!();
    println!("Next steps:");
    println!("  1. Generate membership keys:   atlasd keygen");
    println!("  2. Pin zk.expected_vk_hash and set api.admin_token in the config");
    println!("  3. Start the daemon:           atlasd run");

    Ok(())
}
