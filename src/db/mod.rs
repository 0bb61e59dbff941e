//! SQLite persistence for the document store and the local draft store.
//!
//! Two separate databases: the document database stands in for the hosted
//! store, the draft database belongs to the local device alone.

mod documents;
mod kv;
mod records;

pub use documents::*;
pub use kv::*;
pub use records::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the document database connection pool and run migrations.
pub async fn init_document_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    let pool = open_pool(db_path).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        );
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

/// Initialize the draft database connection pool and run migrations.
pub async fn init_draft_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    let pool = open_pool(db_path).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS drafts (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            saved_at TEXT NOT NULL
        );
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

async fn open_pool(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}
