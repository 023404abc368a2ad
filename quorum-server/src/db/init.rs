//! Schema initialization
//!
//! Creates the conversation store tables if they do not exist. Timestamps
//! are stored as RFC 3339 text; ids as UUID text.

use sqlx::SqlitePool;
use tracing::info;

/// Create all tables used by the conversation store
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversations (
            id          TEXT PRIMARY KEY,
            title       TEXT,
            user_id     TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            role            TEXT NOT NULL,
            content         TEXT NOT NULL,
            metadata        TEXT,
            created_at      TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_conversation
         ON messages(conversation_id, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS discord_links (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL,
            discord_user_id  TEXT UNIQUE,
            discord_username TEXT,
            code             TEXT UNIQUE,
            code_expires_at  TEXT,
            linked_at        TEXT,
            created_at       TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Conversation store schema ready");
    Ok(())
}
