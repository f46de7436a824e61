use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{MemoryStore, PgStore, TaskStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Connects to Postgres and applies pending migrations.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(PgStore::connect(&config.database_url).await?);
        if let Err(e) = store.migrate().await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }
        Ok(Self::from_parts(store.clone(), store, Arc::new(config)))
    }

    pub fn from_parts(
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            users,
            tasks,
            config,
        }
    }

    /// State backed by a fresh in-process store.
    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(store.clone(), store, Arc::new(config))
    }
}
