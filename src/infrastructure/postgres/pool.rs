//! PostgreSQL connection pool.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::config::DatabaseConfig;

/// Errors that can occur with the PostgreSQL pool.
#[derive(Debug, Error)]
pub enum PostgresPoolError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// PostgreSQL connection pool used by the message store.
#[derive(Clone)]
pub struct PostgresPool {
    /// The underlying connection pool
    pool: PgPool,

    /// Database URL (for logging purposes)
    database_url: String,
}

impl PostgresPool {
    /// Create a new PostgreSQL pool from configuration.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, PostgresPoolError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds as u64))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds as u64))
            .connect(&config.url)
            .await?;

        tracing::info!(
            pool_size = config.pool_size,
            database = %mask_url(&config.url),
            "PostgreSQL connection pool created"
        );

        Ok(Self {
            pool,
            database_url: config.url.clone(),
        })
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the database URL (masked for logging).
    pub fn database_url_masked(&self) -> String {
        mask_url(&self.database_url)
    }
}

/// Mask the password in a connection URL for safe logging
fn mask_url(url: &str) -> String {
    let authority_start = url.find("://").map(|i| i + 3).unwrap_or(0);
    let authority = &url[authority_start..];

    if let Some(at_pos) = authority.find('@') {
        if let Some(colon_pos) = authority[..at_pos].find(':') {
            let prefix = &url[..authority_start + colon_pos + 1];
            let suffix = &authority[at_pos..];
            return format!("{}***{}", prefix, suffix);
        }
    }
    url.to_string()
}
