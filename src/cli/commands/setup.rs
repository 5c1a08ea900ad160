//! Schema setup and reset command handlers

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_setup(config: &Config) -> anyhow::Result<()> {
    let store = Store::from_config(config).await?;
    store.setup().await?;

    println!("Database ready at {}", config.general.database_path);
    Ok(())
}

pub async fn cmd_reset(config: &Config, confirmed: bool) -> anyhow::Result<()> {
    if !confirmed {
        println!("This deletes every user and log entry.");
        println!("Re-run with: logbook reset --yes");
        return Ok(());
    }

    let store = Store::from_config(config).await?;
    store.reset().await?;
    store.setup().await?;

    println!("Database reset.");
    Ok(())
}
