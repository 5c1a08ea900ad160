//! User administration command handlers

use anyhow::Context;

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_list_users(config: &Config) -> anyhow::Result<()> {
    let store = Store::from_config(config).await?;
    let users = store.list_users().await?;

    if users.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<40}", "");

    for user in users {
        let entries = store
            .count_log_entries(&user.username)
            .await
            .with_context(|| format!("Failed to count entries for '{}'", user.username))?;
        let status = if user.is_active { "active" } else { "inactive" };
        println!("{:<25} {:<9} {} entries", user.username, status, entries);
    }

    Ok(())
}

pub async fn cmd_set_active(config: &Config, username: &str, is_active: bool) -> anyhow::Result<()> {
    let store = Store::from_config(config).await?;
    store
        .set_user_active(username, is_active)
        .await
        .with_context(|| format!("Failed to update user '{username}'"))?;

    let verb = if is_active { "Activated" } else { "Deactivated" };
    println!("{verb} {username}");
    Ok(())
}
