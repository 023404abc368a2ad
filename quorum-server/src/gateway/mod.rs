//! Deferred command gateway
//!
//! Webhook endpoint for the chat platform. The platform's synchronous
//! response window is far shorter than review time, so the flow is:
//! verify the request signature against the raw body, classify the
//! payload, answer immediately (pong for liveness probes, a "processing"
//! marker for commands), and run the actual command in a detached task
//! that delivers its result through a follow-up callback.
//!
//! Signature verification happens before any other processing; a request
//! that fails it terminates with 401 and no side effects.

pub mod commands;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

/// Interaction types from the platform
const INTERACTION_PING: u8 = 1;
const INTERACTION_APPLICATION_COMMAND: u8 = 2;

/// Synchronous acknowledgment codes
const RESPONSE_PONG: u8 = 1;
const RESPONSE_DEFERRED: u8 = 5;

#[derive(Debug, Deserialize)]
struct Interaction {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    data: Option<InteractionData>,
    #[serde(default)]
    member: Option<Member>,
    #[serde(default)]
    user: Option<PlatformUser>,
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
struct InteractionData {
    name: String,
    #[serde(default)]
    options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize)]
struct CommandOption {
    name: String,
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Member {
    user: PlatformUser,
}

#[derive(Debug, Deserialize)]
struct PlatformUser {
    id: String,
    #[serde(default)]
    username: String,
}

/// Verify the platform signature over `timestamp || body`.
///
/// Called before the payload is parsed; failure means 401 and nothing else
/// happens.
pub fn verify_signature(
    key: &VerifyingKey,
    signature_hex: &str,
    timestamp: &str,
    body: &[u8],
) -> ApiResult<()> {
    let signature_bytes = hex::decode(signature_hex)
        .map_err(|_| ApiError::Unauthorized("malformed signature".to_string()))?;
    let signature_bytes: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| ApiError::Unauthorized("malformed signature".to_string()))?;
    let signature = Signature::from_bytes(&signature_bytes);

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);

    key.verify(&message, &signature)
        .map_err(|_| ApiError::Unauthorized("invalid request signature".to_string()))
}

/// POST /api/webhooks/discord
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle(state, headers, body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// GET /api/webhooks/discord - liveness probe for operators
pub async fn webhook_probe(State(state): State<AppState>) -> Response {
    if state.webhook_key.is_some() {
        "Discord webhook active".into_response()
    } else {
        ApiError::NotConfigured("Discord bot not configured".to_string()).into_response()
    }
}

async fn handle(state: AppState, headers: HeaderMap, body: Bytes) -> ApiResult<Response> {
    let key = state
        .webhook_key
        .as_ref()
        .ok_or_else(|| ApiError::NotConfigured("Discord bot not configured".to_string()))?;

    let signature = header_str(&headers, "x-signature-ed25519")?;
    let timestamp = header_str(&headers, "x-signature-timestamp")?;
    verify_signature(key, signature, timestamp, &body)?;

    let interaction: Interaction = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("malformed interaction payload: {e}")))?;

    match interaction.kind {
        INTERACTION_PING => Ok(Json(json!({ "type": RESPONSE_PONG })).into_response()),
        INTERACTION_APPLICATION_COMMAND => {
            let ctx = command_context(interaction)?;
            info!(command = %ctx.name, user = %ctx.username, "deferring command");

            // Acknowledge now, deliver later: the task is detached from
            // this request's lifetime and bounded only by the inner
            // command timeout.
            tokio::spawn(commands::execute(state.clone(), ctx));

            Ok(Json(json!({ "type": RESPONSE_DEFERRED })).into_response())
        }
        other => {
            warn!(kind = other, "unsupported interaction type");
            Err(ApiError::BadRequest(format!(
                "unsupported interaction type {other}"
            )))
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> ApiResult<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))
}

fn command_context(interaction: Interaction) -> ApiResult<commands::CommandContext> {
    let data = interaction
        .data
        .ok_or_else(|| ApiError::BadRequest("command interaction without data".to_string()))?;

    let user = interaction
        .member
        .map(|m| m.user)
        .or(interaction.user)
        .ok_or_else(|| ApiError::BadRequest("command interaction without user".to_string()))?;

    let options: HashMap<String, String> = data
        .options
        .into_iter()
        .map(|o| {
            let value = match o.value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (o.name, value)
        })
        .collect();

    Ok(commands::CommandContext {
        name: data.name,
        options,
        discord_user_id: user.id,
        username: user.username,
        token: interaction.token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair() -> (SigningKey, VerifyingKey) {
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        let verifying = signing.verifying_key();
        (signing, verifying)
    }

    #[test]
    fn accepts_valid_signature() {
        let (signing, verifying) = keypair();
        let timestamp = "1700000000";
        let body = br#"{"type":1}"#;

        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        let signature = hex::encode(signing.sign(&message).to_bytes());

        assert!(verify_signature(&verifying, &signature, timestamp, body).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let (signing, verifying) = keypair();
        let timestamp = "1700000000";
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(br#"{"type":1}"#);
        let signature = hex::encode(signing.sign(&message).to_bytes());

        let result = verify_signature(&verifying, &signature, timestamp, br#"{"type":2}"#);
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn rejects_garbage_signature() {
        let (_, verifying) = keypair();
        let result = verify_signature(&verifying, "zz-not-hex", "123", b"{}");
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));

        let short = hex::encode([1u8; 10]);
        let result = verify_signature(&verifying, &short, "123", b"{}");
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }
}
