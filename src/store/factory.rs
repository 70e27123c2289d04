//! Message store factory

use std::sync::Arc;

use crate::config::Settings;
use crate::postgres::PostgresPool;

use super::backend::{MessageStore, StoreError};
use super::memory_backend::MemoryMessageStore;
use super::postgres_backend::PostgresMessageStore;

/// Create a message store based on configuration.
///
/// - `"postgres"`: connects a pool from `settings.database` and prepares the schema
/// - `"memory"` (default): in-process store, messages are lost on restart
///
/// Unlike optional backends elsewhere there is no silent fallback: a failure to
/// reach PostgreSQL is returned to the caller so startup fails loudly.
pub async fn create_message_store(settings: &Settings) -> Result<Arc<dyn MessageStore>, StoreError> {
    match settings.store.backend.as_str() {
        "postgres" => {
            let pool = PostgresPool::new(&settings.database)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            tracing::info!(
                backend = "postgres",
                database = %pool.database_url_masked(),
                table = %settings.database.table,
                "Creating PostgreSQL message store"
            );

            let store = PostgresMessageStore::new(pool.pool().clone(), settings.database.table.clone())?;
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory message store");
            Ok(Arc::new(MemoryMessageStore::new()))
        }
        other => Err(StoreError::Unavailable(format!(
            "unknown store backend: {}",
            other
        ))),
    }
}
