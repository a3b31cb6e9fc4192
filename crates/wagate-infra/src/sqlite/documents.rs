//! SQLite document store implementation.
//!
//! Implements `DocumentStore` from `wagate-core` over a single `documents`
//! table. Values are stored as JSON text and deserialized on read.

use chrono::{DateTime, Utc};
use sqlx::Row;
use wagate_core::store::DocumentStore;
use wagate_core::store::keys::is_valid_key;
use wagate_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `DocumentStore`.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: DatabasePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// When a document was last written.
    pub async fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        check_key(key)?;
        let row = sqlx::query("SELECT updated_at FROM documents WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let raw: String = row
                    .try_get("updated_at")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                parse_datetime(&raw).map(Some)
            }
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_key(key: &str) -> Result<(), RepositoryError> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(RepositoryError::InvalidKey(key.to_string()))
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// DocumentStore implementation
// ---------------------------------------------------------------------------

impl DocumentStore for SqliteDocumentStore {
    async fn read_doc(&self, key: &str) -> Result<Option<serde_json::Value>, RepositoryError> {
        check_key(key)?;
        let row = sqlx::query("SELECT value FROM documents WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row
            .try_get("value")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| RepositoryError::InvalidDocument(format!("{key}: {e}")))
    }

    async fn write_doc(&self, key: &str, value: &serde_json::Value) -> Result<(), RepositoryError> {
        check_key(key)?;
        let now = format_datetime(&Utc::now());
        let raw = serde_json::to_string(value)
            .map_err(|e| RepositoryError::InvalidDocument(format!("{key}: {e}")))?;

        sqlx::query(
            r#"INSERT INTO documents (key, value, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?3)
               ON CONFLICT (key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at"#,
        )
        .bind(key)
        .bind(&raw)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn delete_doc(&self, key: &str) -> Result<(), RepositoryError> {
        check_key(key)?;
        sqlx::query("DELETE FROM documents WHERE key = ?1")
            .bind(key)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT key FROM documents WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )
        .bind(prefix)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get("key")
                    .map_err(|e| RepositoryError::Query(e.to_string()))
            })
            .collect()
    }
}
