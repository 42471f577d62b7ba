//! SQLite storage layer for Channel Pulse.
//!
//! Durable state is small and always read and written whole, so it is kept as
//! named records in a single table:
//!
//! - `chat_binding`: the bound chat id
//! - `report_baseline`: see [`crate::baseline`]
//! - `analytics_cache:<key>`: see [`crate::cache`]
//!
//! Each write is a single upsert, so a record is either fully replaced or left
//! untouched.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::model::ChatId;

/// Record name of the chat binding.
const CHAT_BINDING_RECORD: &str = "chat_binding";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:channel_pulse.db?mode=rwc" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // One long-lived connection keeps `sqlite::memory:` databases alive and shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS state_records (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Read a record body, or `None` if it was never written.
    pub async fn get_record(&self, name: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT body FROM state_records WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("body")))
    }

    /// Replace a record body in one statement.
    pub async fn put_record(
        &self,
        name: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO state_records (name, body, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(body)
        .bind(now.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the bound chat id.
    ///
    /// A stored value that is not an integer is treated as no binding.
    pub async fn load_chat_binding(&self) -> anyhow::Result<Option<ChatId>> {
        let body = self.get_record(CHAT_BINDING_RECORD).await?;
        Ok(body.and_then(|b| b.trim().parse().ok()))
    }

    /// Persist the bound chat id.
    pub async fn save_chat_binding(&self, chat_id: ChatId) -> anyhow::Result<()> {
        self.put_record(CHAT_BINDING_RECORD, &chat_id.to_string(), Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_record() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();

        let body = storage.get_record("nothing-here").await.unwrap();
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let now = Utc::now();

        storage.put_record("k", "first", now).await.unwrap();
        storage.put_record("k", "second", now).await.unwrap();

        let body = storage.get_record("k").await.unwrap();
        assert_eq!(body.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_chat_binding_round_trip() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();

        assert_eq!(storage.load_chat_binding().await.unwrap(), None);

        storage.save_chat_binding(-100123).await.unwrap();
        assert_eq!(storage.load_chat_binding().await.unwrap(), Some(-100123));
    }

    #[tokio::test]
    async fn test_garbage_chat_binding_is_unset() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();

        storage
            .put_record(CHAT_BINDING_RECORD, "not-a-number", Utc::now())
            .await
            .unwrap();

        assert_eq!(storage.load_chat_binding().await.unwrap(), None);
    }
}
