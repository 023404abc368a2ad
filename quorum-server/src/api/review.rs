//! Live review stream
//!
//! POST /api/review fans the input out to the analyzer panel and streams
//! named frames over SSE: the roster first, any metadata frames, then one
//! result frame per analyzer in completion order, then the terminal frame.
//! The terminal frame is emitted only after all N outcomes have been
//! observed; if the transport drops earlier, its absence is the signal
//! that the session is incomplete.

use crate::db::conversations;
use crate::error::{ApiError, ApiResult};
use crate::ratelimit::rate_limit_key;
use crate::state::AppState;
use crate::{github, orchestrator};
use axum::{
    extract::State,
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use quorum_common::commit::CommitMeta;
use quorum_common::events::ReviewEvent;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub commit_url: Option<String>,
    /// Opaque identity from the (external) auth layer; absent for
    /// anonymous submissions, which are streamed but not persisted
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Input resolved from the request: the text under review, a derived
/// title, and commit metadata when the input was a commit reference
struct ResolvedInput {
    text: String,
    title: String,
    commit_meta: Option<CommitMeta>,
}

pub async fn submit_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Validation, then admission, both before any work starts
    let has_code = request.code.as_deref().is_some_and(|c| !c.trim().is_empty());
    let has_commit = request
        .commit_url
        .as_deref()
        .is_some_and(|u| !u.trim().is_empty());
    if !has_code && !has_commit {
        return Err(ApiError::BadRequest("No code provided".to_string()));
    }

    let key = rate_limit_key(request.user_id.as_deref(), &headers);
    let decision = state.review_limiter.check(&key);
    if !decision.allowed {
        return Err(ApiError::RateLimited {
            reset_ms: decision.reset_ms,
        });
    }

    let input = resolve_input(&state, &request).await?;
    let user_id = request.user_id.clone().filter(|u| !u.is_empty());

    let agents = state.panel.roster();
    let mut outcomes_rx = orchestrator::run_streaming(state.panel.clone(), input.text.clone());
    let expected = agents.len();

    let stream = async_stream::stream! {
        yield frame(&ReviewEvent::AgentsStarted { agents });

        if let Some(meta) = &input.commit_meta {
            yield frame(&ReviewEvent::CommitMetadata(meta.clone()));
        }

        // Persist the session up front so the client can reference it;
        // best-effort only, the stream continues either way
        let conversation_id = match &user_id {
            Some(user_id) => {
                match persist_request(&state, user_id, &input).await {
                    Ok(id) => {
                        yield frame(&ReviewEvent::ConversationCreated { id });
                        Some(id)
                    }
                    Err(err) => {
                        warn!("failed to persist review request: {err}");
                        None
                    }
                }
            }
            None => None,
        };

        let mut outcomes = Vec::with_capacity(expected);
        while let Some(outcome) = outcomes_rx.recv().await {
            yield frame(&ReviewEvent::AgentResult(outcome.clone()));
            outcomes.push(outcome);
        }
        debug!(outcomes = outcomes.len(), "review stream complete");

        if let Some(conversation_id) = conversation_id {
            if let Err(err) = persist_result(&state, conversation_id, &outcomes).await {
                warn!("failed to persist review result: {err}");
            }
        }

        yield frame(&ReviewEvent::Done);
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

fn frame(event: &ReviewEvent) -> Result<Event, Infallible> {
    Ok(Event::default()
        .event(event.name())
        .data(event.payload().to_string()))
}

async fn resolve_input(state: &AppState, request: &ReviewRequest) -> ApiResult<ResolvedInput> {
    if let Some(commit_url) = request.commit_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let commit = github::parse_commit_input(commit_url)
            .ok_or_else(|| ApiError::BadRequest("Invalid commit URL format".to_string()))?;
        let data = github::fetch_commit(&state.http, &state.config.github_token, &commit)
            .await
            .map_err(ApiError::Common)?;
        return Ok(ResolvedInput {
            title: data.meta.message.clone(),
            commit_meta: Some(data.meta),
            text: data.diff,
        });
    }

    let code = request.code.clone().unwrap_or_default();
    let title: String = code.chars().take(80).collect::<String>().replace('\n', " ");
    Ok(ResolvedInput {
        text: code,
        title,
        commit_meta: None,
    })
}

async fn persist_request(
    state: &AppState,
    user_id: &str,
    input: &ResolvedInput,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    conversations::create_conversation(&state.db, id, Some(&input.title), user_id).await?;

    let metadata = input
        .commit_meta
        .as_ref()
        .and_then(|meta| serde_json::to_string(&serde_json::json!({ "commitMeta": meta })).ok());
    conversations::create_message(&state.db, id, "user", &input.text, metadata.as_deref())
        .await?;
    Ok(id)
}

async fn persist_result(
    state: &AppState,
    conversation_id: Uuid,
    outcomes: &[quorum_common::review::AgentOutcome],
) -> Result<(), sqlx::Error> {
    let metadata = serde_json::to_string(outcomes).unwrap_or_else(|_| "[]".to_string());
    conversations::create_message(
        &state.db,
        conversation_id,
        "assistant",
        "Multi-agent review complete",
        Some(&metadata),
    )
    .await?;
    Ok(())
}
