use crate::{MemoryRecordStore, PgRecordStore, RecordStore};
use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use vitrine_core::Config;

/// Connect to Postgres when `DATABASE_URL` is set, otherwise fall back to the in-memory store.
pub async fn create_record_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    let Some(database_url) = config.database_url() else {
        tracing::warn!("DATABASE_URL not set, using in-memory record store");
        return Ok(Arc::new(MemoryRecordStore::new()));
    };

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections(),
        "Database connected successfully"
    );

    let store = PgRecordStore::new(pool);
    store.migrate().await?;
    Ok(Arc::new(store))
}
