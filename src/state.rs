use chrono_tz::Tz;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub default_timezone: Tz,
}

impl SharedState {
    /// Open the store, create missing tables and wire the services.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::from_config(&config).await?;
        store.setup().await?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let default_timezone: Tz = config
            .logbook
            .default_timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid default timezone: {e}"))?;

        let auth_service = Arc::new(SeaOrmAuthService::new(store.clone())) as Arc<dyn AuthService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            auth_service,
            default_timezone,
        })
    }
}
