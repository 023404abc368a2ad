//! Deferred command execution
//!
//! Runs after the synchronous acknowledgment has already been sent. Each
//! command executes under an inner timeout strictly below the platform's
//! hard ceiling, leaving margin to deliver an error message. Delivery is
//! at-most-once: a result or one truncated error, never a retry.

use crate::analyzer::ChatTurn;
use crate::db::{conversations, links};
use crate::error::ApiError;
use crate::state::AppState;
use crate::{format, github, orchestrator};
use quorum_common::review::{AgentOutcome, MessageRole};
use quorum_common::truncate::{truncate_message, CHANNEL_MESSAGE_LIMIT};
use serde_json::json;
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

/// A verified, classified command invocation. Ephemeral: lives only for
/// the duration of the background execution.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub name: String,
    pub options: HashMap<String, String>,
    pub discord_user_id: String,
    pub username: String,
    /// Per-invocation callback token for follow-up delivery
    pub token: String,
}

/// Entry point for the detached background task
pub async fn execute(state: AppState, ctx: CommandContext) {
    let budget = state.config.command_timeout();

    let content = match tokio::time::timeout(budget, dispatch(&state, &ctx)).await {
        Ok(Ok(content)) => content,
        Ok(Err(err)) => {
            warn!(command = %ctx.name, "command failed: {err}");
            format!("**{} failed:** {err}", command_label(&ctx.name))
        }
        Err(_) => {
            warn!(command = %ctx.name, "command exceeded {}s budget", budget.as_secs());
            format!(
                "**{} timed out** after {}s. Please try again.",
                command_label(&ctx.name),
                budget.as_secs()
            )
        }
    };

    // Single delivery attempt; on failure the invocation is dropped.
    follow_up(&state, &ctx, &content).await;
}

fn command_label(name: &str) -> String {
    format!("/{name}")
}

async fn dispatch(state: &AppState, ctx: &CommandContext) -> Result<String, ApiError> {
    match ctx.name.as_str() {
        "review" => handle_review(state, ctx).await,
        "summary" => handle_summary(state, ctx).await,
        "followup" => handle_followup(state, ctx).await,
        "connect" => handle_connect(state, ctx).await,
        "disconnect" => handle_disconnect(state, ctx).await,
        _ => Ok("Unknown command.".to_string()),
    }
}

/// Deliver `content` to the per-invocation callback, truncated to the
/// channel limit. At most one attempt, no retry.
async fn follow_up(state: &AppState, ctx: &CommandContext, content: &str) {
    let truncated = truncate_message(content, CHANNEL_MESSAGE_LIMIT);
    let url = format!(
        "{}/webhooks/{}/{}",
        state.config.discord_api_base, state.config.discord_application_id, ctx.token
    );

    match state
        .http
        .post(&url)
        .json(&json!({ "content": truncated }))
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            info!(command = %ctx.name, chars = truncated.chars().count(), "follow-up delivered");
        }
        Ok(response) => {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(command = %ctx.name, %status, "follow-up rejected: {body}");
        }
        Err(err) => {
            error!(command = %ctx.name, "follow-up delivery failed: {err}");
        }
    }
}

async fn handle_review(state: &AppState, ctx: &CommandContext) -> Result<String, ApiError> {
    let code = ctx.options.get("code");
    let commit_url = ctx.options.get("commit_url");

    let (input, title) = match (code, commit_url) {
        (None, None) => {
            return Ok("Please provide either `code` or `commit_url`.\n\
                       Example: `/review code:function add(a,b){return a+b}`\n\
                       Example: `/review commit_url:https://github.com/owner/repo/commit/abc123`"
                .to_string());
        }
        (_, Some(commit_url)) => {
            let Some(commit) = github::parse_commit_input(commit_url) else {
                return Ok("**Invalid commit URL format.** Use a GitHub commit URL like \
                           `https://github.com/owner/repo/commit/sha`"
                    .to_string());
            };
            let data = github::fetch_commit(&state.http, &state.config.github_token, &commit)
                .await
                .map_err(ApiError::Common)?;
            let title = data.meta.message.clone();
            (data.diff, title)
        }
        (Some(code), None) => {
            let title: String = code.chars().take(80).collect::<String>().replace('\n', " ");
            (code.clone(), title)
        }
    };

    let outcomes = orchestrator::run_batch(state.panel.clone(), input.clone()).await;
    let summary = format::channel_summary(&outcomes);

    // Persist only for linked users; anonymous reviews are fire-and-forget
    let mut note = String::new();
    match links::get_user_id_by_discord_id(&state.db, &ctx.discord_user_id).await {
        Ok(Some(user_id)) => {
            if let Err(err) = persist_review(state, &user_id, &title, &input, &outcomes).await {
                warn!("failed to persist deferred review: {err}");
            } else {
                note = "\n\n_Use `/followup message:your question` to ask about this review._"
                    .to_string();
            }
        }
        Ok(None) => {}
        Err(err) => warn!("link lookup failed: {err}"),
    }

    Ok(format!("{summary}{note}"))
}

async fn persist_review(
    state: &AppState,
    user_id: &str,
    title: &str,
    input: &str,
    outcomes: &[AgentOutcome],
) -> Result<(), sqlx::Error> {
    let conversation_id = Uuid::new_v4();
    conversations::create_conversation(&state.db, conversation_id, Some(title), user_id).await?;
    conversations::create_message(&state.db, conversation_id, "user", input, None).await?;
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

async fn handle_summary(state: &AppState, ctx: &CommandContext) -> Result<String, ApiError> {
    if let Some(id_text) = ctx.options.get("id") {
        let Ok(id) = Uuid::parse_str(id_text) else {
            return Ok(format!("**Not found** — no review with ID `{id_text}`."));
        };
        let Some(conversation) = conversations::get_conversation_by_id(&state.db, id).await?
        else {
            return Ok(format!("**Not found** — no review with ID `{id_text}`."));
        };

        let messages = conversations::get_messages_by_conversation(&state.db, id).await?;
        let Some(metadata) = messages
            .iter()
            .find(|m| m.role == "assistant" && m.metadata.is_some())
            .and_then(|m| m.metadata.clone())
        else {
            return Ok("That conversation has no review results yet.".to_string());
        };

        let outcomes: Vec<AgentOutcome> = serde_json::from_str(&metadata).unwrap_or_default();
        let title = conversation
            .title
            .unwrap_or_else(|| short_title(conversation.id));
        return Ok(format!(
            "📋 **{title}**\n\n{}",
            format::channel_summary(&outcomes)
        ));
    }

    // No id given: the caller's latest review, else the latest overall
    let user_id = links::get_user_id_by_discord_id(&state.db, &ctx.discord_user_id).await?;
    let latest = match user_id {
        Some(ref uid) => match conversations::get_latest_review(&state.db, Some(uid)).await? {
            Some(latest) => Some(latest),
            None => conversations::get_latest_review(&state.db, None).await?,
        },
        None => conversations::get_latest_review(&state.db, None).await?,
    };

    let Some(latest) = latest else {
        return Ok("No reviews found. Submit a review on the web app first!".to_string());
    };

    let title = latest
        .conversation
        .title
        .unwrap_or_else(|| short_title(latest.conversation.id));
    Ok(format!(
        "📋 **{title}**\n\n{}",
        format::channel_summary(&latest.outcomes)
    ))
}

fn short_title(id: Uuid) -> String {
    format!("Review {}", &id.to_string()[..8])
}

async fn handle_followup(state: &AppState, ctx: &CommandContext) -> Result<String, ApiError> {
    let Some(question) = ctx.options.get("message").filter(|m| !m.trim().is_empty()) else {
        return Ok("Please provide a message: `/followup message:your question`".to_string());
    };

    let Some(user_id) = links::get_user_id_by_discord_id(&state.db, &ctx.discord_user_id).await?
    else {
        return Ok("**Account not linked.** `/followup` needs access to your reviews.\n\
                   Link your account: go to **Settings** in the web app, generate a code, \
                   then use `/connect CODE` here."
            .to_string());
    };

    let conversation = match ctx.options.get("id") {
        Some(id_text) => {
            let conversation = match Uuid::parse_str(id_text) {
                Ok(id) => conversations::get_conversation_by_id(&state.db, id).await?,
                Err(_) => None,
            };
            match conversation.filter(|c| c.user_id == user_id) {
                Some(c) => c,
                None => {
                    return Ok(format!(
                        "**Not found** — no review with ID `{id_text}` in your account."
                    ))
                }
            }
        }
        None => {
            match conversations::get_latest_review(&state.db, Some(&user_id)).await? {
                Some(latest) => latest.conversation,
                None => return Ok("No reviews found. Run `/review` first!".to_string()),
            }
        }
    };

    let messages =
        conversations::get_messages_by_conversation(&state.db, conversation.id).await?;

    let code = messages
        .iter()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
        .unwrap_or_default();
    let outcomes: Vec<AgentOutcome> = messages
        .iter()
        .find(|m| m.role == "assistant" && m.metadata.is_some())
        .and_then(|m| m.metadata.as_deref())
        .and_then(|metadata| serde_json::from_str(metadata).ok())
        .unwrap_or_default();

    let system_prompt = crate::analyzer::prompts::follow_up_system_prompt(
        &format::review_context(&code, &outcomes),
    );

    // Prior exchange plus the new question; result metadata stays out of
    // the chat transcript
    let mut turns: Vec<ChatTurn> = messages
        .iter()
        .filter(|m| m.metadata.is_none() || m.role == "user")
        .filter_map(|m| {
            MessageRole::parse(&m.role).map(|role| ChatTurn {
                role,
                content: m.content.clone(),
            })
        })
        .collect();
    turns.push(ChatTurn {
        role: MessageRole::User,
        content: question.clone(),
    });

    let answer = state
        .responder
        .respond(&system_prompt, &turns)
        .await
        .map_err(ApiError::Common)?;

    conversations::create_message(&state.db, conversation.id, "user", question, None).await?;
    conversations::create_message(&state.db, conversation.id, "assistant", &answer, None).await?;

    Ok(answer)
}

async fn handle_connect(state: &AppState, ctx: &CommandContext) -> Result<String, ApiError> {
    let code = ctx
        .options
        .get("code")
        .map(|c| c.trim().to_uppercase())
        .unwrap_or_default();

    if code.is_empty() {
        return Ok("Please provide a link code: `/connect CODE`\n\n\
                   Get a code from **Settings** in the web app."
            .to_string());
    }

    if links::get_user_id_by_discord_id(&state.db, &ctx.discord_user_id)
        .await?
        .is_some()
    {
        return Ok(
            "Your Discord account is already linked. Use `/disconnect` first to re-link."
                .to_string(),
        );
    }

    let Some(link) = links::get_link_by_code(&state.db, &code).await? else {
        return Ok(
            "**Invalid or expired code.** Generate a new one from Settings in the web app."
                .to_string(),
        );
    };

    links::confirm_link(&state.db, link.id, &ctx.discord_user_id, &ctx.username).await?;
    Ok("**Account linked!** `/summary` will now show your personal reviews.".to_string())
}

async fn handle_disconnect(state: &AppState, ctx: &CommandContext) -> Result<String, ApiError> {
    let Some(user_id) = links::get_user_id_by_discord_id(&state.db, &ctx.discord_user_id).await?
    else {
        return Ok(
            "Your Discord account is not linked. Use `/connect CODE` to link it.".to_string(),
        );
    };

    links::delete_link(&state.db, &user_id).await?;
    Ok("**Account unlinked.** `/summary` will now show global reviews.".to_string())
}
