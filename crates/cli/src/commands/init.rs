//! `toolpilot init`: Write a default config file.

use std::path::Path;
use toolpilot_config::AppConfig;

use super::GlobalArgs;

pub fn run(globals: &GlobalArgs, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = globals.config_path();

    if write_default_config(&config_path, force)? {
        println!("Created config at: {}", config_path.display());
        println!();
        println!("Next steps:");
        println!("  1. Set TOOLPILOT_API_KEY (or ANTHROPIC_API_KEY / OPENAI_API_KEY)");
        println!("  2. Run: toolpilot chat");
    } else {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or re-run with --force.");
    }
    Ok(())
}

/// Write the default config to `path`. Returns `false` when a file exists
/// and `force` is not set.
fn write_default_config(path: &Path, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
