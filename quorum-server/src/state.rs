//! Shared application state
//!
//! One explicit service object constructed at process start and passed by
//! reference to every handler; nothing here is lazily re-created.

use crate::analyzer::{FollowUpResponder, ReviewPanel};
use crate::config::Config;
use crate::ratelimit::RateLimiter;
use ed25519_dalek::VerifyingKey;
use quorum_common::{Error, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// The configured analyzer panel
    pub panel: Arc<ReviewPanel>,
    /// Follow-up question capability shared by web chat and `/followup`
    pub responder: Arc<dyn FollowUpResponder>,
    /// Outbound HTTP client for callbacks and commit fetching
    pub http: reqwest::Client,
    /// Admission gate for new analyses
    pub review_limiter: Arc<RateLimiter>,
    /// Admission gate for follow-up messages
    pub chat_limiter: Arc<RateLimiter>,
    /// Webhook verification key; gateway is disabled when absent
    pub webhook_key: Option<VerifyingKey>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        panel: Arc<ReviewPanel>,
        responder: Arc<dyn FollowUpResponder>,
        config: Config,
    ) -> Result<Self> {
        let webhook_key = config
            .discord_public_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(parse_verifying_key)
            .transpose()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            db,
            panel,
            responder,
            http,
            review_limiter: Arc::new(RateLimiter::new(
                Duration::from_secs(config.review_window_secs),
                config.review_limit,
            )),
            chat_limiter: Arc::new(RateLimiter::new(
                Duration::from_secs(config.chat_window_secs),
                config.chat_limit,
            )),
            webhook_key,
            config: Arc::new(config),
        })
    }
}

/// Parse a hex-encoded Ed25519 public key
pub fn parse_verifying_key(hex_key: &str) -> Result<VerifyingKey> {
    let bytes = hex::decode(hex_key)
        .map_err(|e| Error::Config(format!("invalid webhook public key hex: {e}")))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::Config("webhook public key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| Error::Config(format!("invalid webhook public key: {e}")))
}
