//! Chat-platform account linking
//!
//! Web-side half of the link flow: the user generates a one-time code
//! here, then redeems it with the `/connect` command in the chat channel.
//! Identity is the same opaque `user_id` the rest of the API uses; the
//! auth layer in front of it is external.

use crate::db::links;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

/// One-time codes are valid for ten minutes
const CODE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub user_id: String,
}

/// Six uppercase hex characters, matching what `/connect` normalizes to
fn generate_code() -> String {
    use rand::Rng;
    let bytes: [u8; 3] = rand::thread_rng().gen();
    hex::encode(bytes).to_uppercase()
}

fn identity(user_id: &str) -> ApiResult<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Unauthorized("Unauthorized".to_string()));
    }
    Ok(trimmed)
}

/// GET /api/discord/link?user_id=
///
/// Reports `none`, `pending` (with the outstanding code), or `linked`.
/// Expired pending codes are removed on sight.
pub async fn link_status(
    State(state): State<AppState>,
    Query(query): Query<LinkQuery>,
) -> ApiResult<Json<Value>> {
    let user_id = identity(&query.user_id)?;

    let Some(link) = links::get_link_by_user_id(&state.db, user_id).await? else {
        return Ok(Json(json!({ "status": "none" })));
    };

    if link.is_linked() {
        return Ok(Json(json!({
            "status": "linked",
            "discordUsername": link.discord_username,
            "linkedAt": link.linked_at,
        })));
    }

    if link.code.is_some() {
        if link.code_expired(Utc::now()) {
            links::delete_link(&state.db, user_id).await?;
            return Ok(Json(json!({ "status": "none" })));
        }
        return Ok(Json(json!({
            "status": "pending",
            "code": link.code,
            "expiresAt": link.code_expires_at,
        })));
    }

    Ok(Json(json!({ "status": "none" })))
}

/// POST /api/discord/link
///
/// Generates a fresh one-time code, replacing any pending one. Rejected
/// with 409 while an account is already linked.
pub async fn create_link(
    State(state): State<AppState>,
    Json(request): Json<LinkRequest>,
) -> ApiResult<Json<Value>> {
    let user_id = identity(&request.user_id)?;

    if let Some(existing) = links::get_link_by_user_id(&state.db, user_id).await? {
        if existing.is_linked() {
            return Err(ApiError::Conflict(
                "Already linked. Unlink first.".to_string(),
            ));
        }
        links::delete_link(&state.db, user_id).await?;
    }

    let code = generate_code();
    let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);
    links::create_link_code(&state.db, user_id, &code, expires_at).await?;

    Ok(Json(json!({
        "status": "pending",
        "code": code,
        "expiresAt": expires_at,
    })))
}

/// DELETE /api/discord/link?user_id=
pub async fn unlink(
    State(state): State<AppState>,
    Query(query): Query<LinkQuery>,
) -> ApiResult<Json<Value>> {
    let user_id = identity(&query.user_id)?;
    links::delete_link(&state.db, user_id).await?;
    Ok(Json(json!({ "status": "none" })))
}
