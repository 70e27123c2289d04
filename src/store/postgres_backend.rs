//! PostgreSQL-based message store.
//!
//! Messages live in a single table whose primary key is generated by the
//! database, so identity is only assigned once the insert has committed.
//! A B-tree index on `expires_at` keeps the sweeper's range delete cheap;
//! it is an optimization only, the sweeper is what enforces expiry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::chat::{ChatMessage, MessageId, NewChatMessage};

use super::backend::{MessageStore, StoreError};

type MessageRow = (Uuid, String, String, DateTime<Utc>, DateTime<Utc>);

/// PostgreSQL-based message store.
///
/// Table structure (`chat_messages` by default):
/// - `id UUID PRIMARY KEY DEFAULT gen_random_uuid()`
/// - `username TEXT`, `message TEXT`
/// - `created_at TIMESTAMPTZ`, `expires_at TIMESTAMPTZ` (indexed)
pub struct PostgresMessageStore {
    pool: PgPool,
    table: String,
}

impl PostgresMessageStore {
    /// Create a store over `table`, which must be a plain SQL identifier.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        if !is_valid_table_name(&table) {
            return Err(StoreError::Unavailable(format!(
                "invalid table name: {}",
                table
            )));
        }

        Ok(Self { pool, table })
    }

    /// Create the messages table and its expiry index if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                username TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                CHECK (expires_at > created_at)
            )
            "#,
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_expires_at_idx ON {table} (expires_at)",
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        tracing::info!(table = %self.table, "Chat message schema ready");

        Ok(())
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn save(&self, message: NewChatMessage) -> Result<MessageId, StoreError> {
        let (id,): (Uuid,) = sqlx::query_as(&format!(
            r#"
            INSERT INTO {table} (username, message, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
            table = self.table
        ))
        .bind(&message.username)
        .bind(&message.message)
        .bind(message.created_at)
        .bind(message.expires_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::trace!(message_id = %id, "Message stored in PostgreSQL");

        Ok(MessageId::new(id))
    }

    async fn find_recent(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let limit = i64::try_from(limit)
            .map_err(|_| StoreError::InvalidData(format!("limit out of range: {}", limit)))?;

        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            r#"
            SELECT id, username, message, created_at, expires_at
            FROM {table}
            WHERE expires_at > $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            table = self.table
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let messages = rows
            .into_iter()
            .map(|(id, username, message, created_at, expires_at)| ChatMessage {
                id: MessageId::new(id),
                username,
                message,
                created_at,
                expires_at,
            })
            .collect();

        Ok(messages)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE expires_at <= $1",
            table = self.table
        ))
        .bind(now)
        .execute(&self.pool)
        .await?;

        let removed = result.rows_affected();

        if removed > 0 {
            tracing::debug!(
                table = %self.table,
                removed = removed,
                "Deleted expired messages from PostgreSQL"
            );
        }

        Ok(removed)
    }
}

/// Table names are interpolated into SQL, so only lowercase identifiers are accepted
fn is_valid_table_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 48 {
        return false;
    }

    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
