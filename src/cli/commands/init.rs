//! Init command handler

use std::path::Path;

use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    let path = Path::new("config.toml");
    if path.exists() {
        println!("config.toml already exists, leaving it untouched.");
        return Ok(());
    }

    Config::default().save_to_path(path)?;
    println!("Created default config file: {}", path.display());
    Ok(())
}
