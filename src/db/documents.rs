//! Remote document store abstraction.
//!
//! Full-document reads and replaces, no field patching: callers observe each
//! document as one atomic unit.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;

/// Document read/write primitives offered by the hosted store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, or `None` if it has never been written.
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError>;

    /// Replace the full document body.
    async fn set_document(&self, collection: &str, id: &str, body: &Value)
        -> Result<(), AppError>;
}

/// SQLite-backed document store.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, AppError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                let value = serde_json::from_str(&body).map_err(|e| {
                    AppError::Database(format!("Corrupt document {}/{}: {}", collection, id, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let body = serde_json::to_string(body).map_err(|e| {
            AppError::Database(format!(
                "Unserializable document {}/{}: {}",
                collection, id, e
            ))
        })?;

        sqlx::query(
            r#"INSERT INTO documents (collection, id, body, updated_at) VALUES (?, ?, ?, ?)
               ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at"#,
        )
        .bind(collection)
        .bind(id)
        .bind(&body)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
