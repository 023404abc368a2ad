//! HTTP request handlers
//!
//! Persisted review retrieval, follow-up chat, conversation listing, and
//! health.

use crate::analyzer::ChatTurn;
use crate::db::conversations::{self, Message};
use crate::error::{ApiError, ApiResult};
use crate::ratelimit::rate_limit_key;
use crate::state::AppState;
use crate::{analyzer, format};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use quorum_common::review::{AgentOutcome, MessageRole};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    id: String,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationsQuery {
    user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub conversation_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "quorum-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/review/history?id=<uuid>
///
/// Returns the persisted session: the original code, the outcome set, any
/// commit metadata, and follow-up messages after the first pair.
pub async fn review_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Value>> {
    let id = Uuid::parse_str(&query.id)
        .map_err(|_| ApiError::BadRequest("Missing or invalid id".to_string()))?;

    let conversation = conversations::get_conversation_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;

    // Ownership check applies only when the caller presents an identity
    if let Some(user_id) = query.user_id.as_deref().filter(|u| !u.is_empty()) {
        if conversation.user_id != user_id {
            return Err(ApiError::NotFound("Not found".to_string()));
        }
    }

    let messages = conversations::get_messages_by_conversation(&state.db, id).await?;

    let user_message = messages.iter().find(|m| m.role == "user");
    let assistant_message = messages.iter().find(|m| m.role == "assistant");

    let results: Option<Vec<AgentOutcome>> = assistant_message
        .and_then(|m| m.metadata.as_deref())
        .and_then(|metadata| serde_json::from_str(metadata).ok());

    let commit_meta: Option<Value> = user_message
        .and_then(|m| m.metadata.as_deref())
        .and_then(|metadata| serde_json::from_str::<Value>(metadata).ok())
        .and_then(|parsed| parsed.get("commitMeta").cloned());

    let follow_ups = follow_up_messages(&messages);

    Ok(Json(json!({
        "conversation": conversation,
        "code": user_message.map(|m| m.content.clone()),
        "results": results,
        "commitMeta": commit_meta,
        "followUpMessages": follow_ups,
    })))
}

/// Everything after the first user/assistant pair, in creation order
fn follow_up_messages(messages: &[Message]) -> Vec<Value> {
    let mut skipped_user = false;
    let mut skipped_assistant = false;
    let mut follow_ups = Vec::new();

    for message in messages {
        if !skipped_user && message.role == "user" {
            skipped_user = true;
            continue;
        }
        if !skipped_assistant && message.role == "assistant" {
            skipped_assistant = true;
            continue;
        }
        if skipped_user && skipped_assistant {
            follow_ups.push(json!({
                "id": message.id,
                "role": message.role,
                "content": message.content,
            }));
        }
    }
    follow_ups
}

/// GET /api/conversations?user_id=<id>
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationsQuery>,
) -> ApiResult<Json<Value>> {
    let conversations = conversations::get_conversations_by_user(&state.db, &query.user_id).await?;
    Ok(Json(json!({ "conversations": conversations })))
}

/// POST /api/review/chat
///
/// One follow-up exchange on a persisted review: rate limited, answered
/// with full review context, and appended to the conversation.
pub async fn follow_up_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<Value>> {
    if request.messages.is_empty() {
        return Err(ApiError::BadRequest("Missing data".to_string()));
    }
    let conversation_id = Uuid::parse_str(&request.conversation_id)
        .map_err(|_| ApiError::BadRequest("Missing data".to_string()))?;

    let key = rate_limit_key(request.user_id.as_deref(), &headers);
    let decision = state.chat_limiter.check(&key);
    if !decision.allowed {
        return Err(ApiError::RateLimited {
            reset_ms: decision.reset_ms,
        });
    }

    let conversation = conversations::get_conversation_by_id(&state.db, conversation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;
    if let Some(user_id) = request.user_id.as_deref().filter(|u| !u.is_empty()) {
        if conversation.user_id != user_id {
            return Err(ApiError::NotFound("Not found".to_string()));
        }
    }

    let stored = conversations::get_messages_by_conversation(&state.db, conversation_id).await?;
    let code = stored
        .iter()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
        .unwrap_or_default();
    let outcomes: Vec<AgentOutcome> = stored
        .iter()
        .find(|m| m.role == "assistant" && m.metadata.is_some())
        .and_then(|m| m.metadata.as_deref())
        .and_then(|metadata| serde_json::from_str(metadata).ok())
        .unwrap_or_default();

    let system_prompt = analyzer::prompts::follow_up_system_prompt(&format::review_context(
        &code, &outcomes,
    ));

    let turns: Vec<ChatTurn> = request
        .messages
        .iter()
        .filter_map(|m| {
            MessageRole::parse(&m.role).map(|role| ChatTurn {
                role,
                content: m.content.clone(),
            })
        })
        .collect();

    let question = request
        .messages
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();

    // The new user message is durable before the responder runs
    conversations::create_message(&state.db, conversation_id, "user", &question, None).await?;

    let answer = state
        .responder
        .respond(&system_prompt, &turns)
        .await
        .map_err(ApiError::Common)?;

    conversations::create_message(&state.db, conversation_id, "assistant", &answer, None).await?;

    Ok(Json(json!({ "message": answer })))
}
