use super::commands::ConfigAction;
use atlas_daemon::config::AtlasConfig;
use atlas_types::AtlasResult;
use std::path::Path;

pub fn handle_config(config_path: &Path, config: &AtlasConfig, action: Option<ConfigAction>) -> AtlasResult<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            if !config_path.exists() {
                println!("No configuration file at {:?}; showing defaults", config_path);
                println!();
            }
            print!("{}", config.redacted());
        }
        Some(ConfigAction::Validate) => {
            // load already validated; surface warnings as well
            println!("[+] Configuration is valid");
            for warning in config.check_security_warnings() {
                println!("[!] {:?}: {}", warning.severity, warning.message);
                println!("    -> {}", warning.recommendation);
            }
        }
        Some(ConfigAction::Path) => println!("{}", config_path.display()),
    }
    Ok(())
}
