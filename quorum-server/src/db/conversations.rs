//! Conversation and message queries
//!
//! Conversations group one review session: the first user/assistant pair
//! is the original input and its aggregate result (outcome set serialized
//! into the assistant message's metadata); later pairs are follow-ups,
//! ordered by creation time.

use chrono::{DateTime, Utc};
use quorum_common::review::AgentOutcome;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// A persisted review session
#[derive(Debug, Clone, serde::Serialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One message within a conversation
#[derive(Debug, Clone, serde::Serialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The newest persisted review: its conversation and deserialized outcomes
#[derive(Debug, Clone)]
pub struct LatestReview {
    pub conversation: Conversation,
    pub outcomes: Vec<AgentOutcome>,
}

fn conversation_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, sqlx::Error> {
    Ok(Conversation {
        id: parse_uuid(row.get("id"))?,
        title: row.get("title"),
        user_id: row.get("user_id"),
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

fn parse_uuid(text: String) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(&text).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn parse_timestamp(text: String) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Create a conversation record
pub async fn create_conversation(
    db: &SqlitePool,
    id: Uuid,
    title: Option<&str>,
    user_id: &str,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO conversations (id, title, user_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(title)
    .bind(user_id)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;
    Ok(())
}

/// Append a message to a conversation
pub async fn create_message(
    db: &SqlitePool,
    conversation_id: Uuid,
    role: &str,
    content: &str,
    metadata: Option<&str>,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO messages (id, conversation_id, role, content, metadata, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(conversation_id.to_string())
    .bind(role)
    .bind(content)
    .bind(metadata)
    .bind(Utc::now().to_rfc3339())
    .execute(db)
    .await?;

    // Derived bookkeeping only; conversations are otherwise immutable
    sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(conversation_id.to_string())
        .execute(db)
        .await?;

    Ok(id)
}

pub async fn get_conversation_by_id(
    db: &SqlitePool,
    id: Uuid,
) -> Result<Option<Conversation>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;
    row.as_ref().map(conversation_from_row).transpose()
}

/// Messages in creation order
pub async fn get_messages_by_conversation(
    db: &SqlitePool,
    conversation_id: Uuid,
) -> Result<Vec<Message>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at, id",
    )
    .bind(conversation_id.to_string())
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(Message {
                id: parse_uuid(row.get("id"))?,
                conversation_id: parse_uuid(row.get("conversation_id"))?,
                role: row.get("role"),
                content: row.get("content"),
                metadata: row.get("metadata"),
                created_at: parse_timestamp(row.get("created_at"))?,
            })
        })
        .collect()
}

/// Conversations owned by `user_id`, newest first
pub async fn get_conversations_by_user(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Conversation>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT * FROM conversations WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    rows.iter().map(conversation_from_row).collect()
}

/// Newest conversation holding a completed review (an assistant message
/// with metadata), optionally restricted to one owner.
pub async fn get_latest_review(
    db: &SqlitePool,
    user_id: Option<&str>,
) -> Result<Option<LatestReview>, sqlx::Error> {
    let row = match user_id {
        Some(user_id) => {
            sqlx::query(
                "SELECT c.id AS cid, m.metadata AS metadata
                 FROM conversations c
                 JOIN messages m ON m.conversation_id = c.id
                 WHERE m.role = 'assistant' AND m.metadata IS NOT NULL AND c.user_id = ?
                 ORDER BY c.created_at DESC, m.created_at DESC
                 LIMIT 1",
            )
            .bind(user_id)
            .fetch_optional(db)
            .await?
        }
        None => {
            sqlx::query(
                "SELECT c.id AS cid, m.metadata AS metadata
                 FROM conversations c
                 JOIN messages m ON m.conversation_id = c.id
                 WHERE m.role = 'assistant' AND m.metadata IS NOT NULL
                 ORDER BY c.created_at DESC, m.created_at DESC
                 LIMIT 1",
            )
            .fetch_optional(db)
            .await?
        }
    };

    let Some(row) = row else { return Ok(None) };
    let conversation_id = parse_uuid(row.get("cid"))?;
    let metadata: String = row.get("metadata");
    let outcomes = serde_json::from_str(&metadata).unwrap_or_default();

    let conversation = get_conversation_by_id(db, conversation_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    Ok(Some(LatestReview {
        conversation,
        outcomes,
    }))
}
