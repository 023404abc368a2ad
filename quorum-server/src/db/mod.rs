//! Conversation store
//!
//! Narrow, append-only persistence for review sessions: conversations,
//! their ordered messages, and chat-platform account links. No updates
//! beyond `updated_at` bookkeeping, no multi-record transactions.

pub mod conversations;
pub mod init;
pub mod links;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

/// Open (creating if missing) the SQLite database and ensure the schema
pub async fn connect(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init::create_schema(&pool).await?;
    Ok(pool)
}

/// In-memory database for tests
pub async fn connect_memory() -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init::create_schema(&pool).await?;
    Ok(pool)
}
