//! Chat-platform account links
//!
//! One-time codes generated on the web side let a chat-platform user bind
//! their platform identity to a web identity, unlocking persisted reviews
//! from the deferred commands.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// A pending or confirmed account link
#[derive(Debug, Clone)]
pub struct DiscordLink {
    pub id: Uuid,
    pub user_id: String,
    pub discord_user_id: Option<String>,
    pub discord_username: Option<String>,
    pub code: Option<String>,
    pub code_expires_at: Option<DateTime<Utc>>,
    pub linked_at: Option<DateTime<Utc>>,
}

impl DiscordLink {
    pub fn is_linked(&self) -> bool {
        self.discord_user_id.is_some() && self.linked_at.is_some()
    }

    pub fn code_expired(&self, now: DateTime<Utc>) -> bool {
        self.code_expires_at.is_some_and(|expires| expires < now)
    }
}

fn link_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<DiscordLink, sqlx::Error> {
    let id: String = row.get("id");
    Ok(DiscordLink {
        id: Uuid::parse_str(&id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        user_id: row.get("user_id"),
        discord_user_id: row.get("discord_user_id"),
        discord_username: row.get("discord_username"),
        code: row.get("code"),
        code_expires_at: parse_optional_time(row.get("code_expires_at"))?,
        linked_at: parse_optional_time(row.get("linked_at"))?,
    })
}

fn parse_optional_time(text: Option<String>) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    text.map(|t| {
        DateTime::parse_from_rfc3339(&t)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    })
    .transpose()
}

/// Create a pending link with a one-time code
pub async fn create_link_code(
    db: &SqlitePool,
    user_id: &str,
    code: &str,
    expires_at: DateTime<Utc>,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO discord_links (id, user_id, code, code_expires_at, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(user_id)
    .bind(code)
    .bind(expires_at.to_rfc3339())
    .bind(Utc::now().to_rfc3339())
    .execute(db)
    .await?;
    Ok(id)
}

/// Look up a pending, unexpired link by its one-time code
pub async fn get_link_by_code(
    db: &SqlitePool,
    code: &str,
) -> Result<Option<DiscordLink>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT * FROM discord_links
         WHERE code = ? AND discord_user_id IS NULL",
    )
    .bind(code)
    .fetch_optional(db)
    .await?;

    let Some(row) = row else { return Ok(None) };
    let link = link_from_row(&row)?;
    if let Some(expires) = link.code_expires_at {
        if expires < Utc::now() {
            return Ok(None);
        }
    }
    Ok(Some(link))
}

/// Bind a platform identity to a pending link, consuming the code
pub async fn confirm_link(
    db: &SqlitePool,
    link_id: Uuid,
    discord_user_id: &str,
    discord_username: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE discord_links
         SET discord_user_id = ?, discord_username = ?, linked_at = ?, code = NULL
         WHERE id = ?",
    )
    .bind(discord_user_id)
    .bind(discord_username)
    .bind(Utc::now().to_rfc3339())
    .bind(link_id.to_string())
    .execute(db)
    .await?;
    Ok(())
}

/// Newest link record (pending or confirmed) owned by `user_id`
pub async fn get_link_by_user_id(
    db: &SqlitePool,
    user_id: &str,
) -> Result<Option<DiscordLink>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT * FROM discord_links WHERE user_id = ? ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    row.as_ref().map(link_from_row).transpose()
}

/// Remove any link owned by `user_id`
pub async fn delete_link(db: &SqlitePool, user_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM discord_links WHERE user_id = ?")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Web identity bound to a platform identity, if any
pub async fn get_user_id_by_discord_id(
    db: &SqlitePool,
    discord_user_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query("SELECT user_id FROM discord_links WHERE discord_user_id = ?")
        .bind(discord_user_id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(|r| r.get("user_id")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;
    use chrono::Duration;

    #[tokio::test]
    async fn link_lifecycle() {
        let db = connect_memory().await.unwrap();
        let expires = Utc::now() + Duration::minutes(10);
        let link_id = create_link_code(&db, "web-user", "ABC123", expires)
            .await
            .unwrap();

        let link = get_link_by_code(&db, "ABC123").await.unwrap().unwrap();
        assert_eq!(link.id, link_id);
        assert_eq!(link.user_id, "web-user");

        confirm_link(&db, link_id, "discord-1", "tester").await.unwrap();
        assert_eq!(
            get_user_id_by_discord_id(&db, "discord-1").await.unwrap(),
            Some("web-user".to_string())
        );
        // Code is consumed on confirmation
        assert!(get_link_by_code(&db, "ABC123").await.unwrap().is_none());

        delete_link(&db, "web-user").await.unwrap();
        assert!(get_user_id_by_discord_id(&db, "discord-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn expired_codes_are_not_returned() {
        let db = connect_memory().await.unwrap();
        let expired = Utc::now() - Duration::minutes(1);
        create_link_code(&db, "web-user", "OLD999", expired)
            .await
            .unwrap();
        assert!(get_link_by_code(&db, "OLD999").await.unwrap().is_none());
    }
}
