//! quorum-server configuration
//!
//! Command-line arguments take priority over environment variables, which
//! take priority over compiled defaults.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Multi-analyzer code review service
#[derive(Parser, Debug, Clone)]
#[command(name = "quorum-server", version)]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, env = "QUORUM_BIND_ADDR", default_value = "127.0.0.1:5740")]
    pub bind_addr: String,

    /// SQLite database path for the conversation store
    #[arg(long, env = "QUORUM_DB_PATH", default_value = "quorum.db")]
    pub db_path: PathBuf,

    /// Hex-encoded Ed25519 public key for webhook signature verification.
    /// The chat gateway is disabled when unset.
    #[arg(long, env = "DISCORD_PUBLIC_KEY")]
    pub discord_public_key: Option<String>,

    /// Application id used to build follow-up callback URLs
    #[arg(long, env = "DISCORD_APPLICATION_ID", default_value = "")]
    pub discord_application_id: String,

    /// Base URL of the chat platform API
    #[arg(
        long,
        env = "DISCORD_API_BASE",
        default_value = "https://discord.com/api/v10"
    )]
    pub discord_api_base: String,

    /// Base URL of the OpenAI-compatible analyzer endpoint
    #[arg(long, env = "LLM_API_BASE", default_value = "https://api.openai.com/v1")]
    pub llm_api_base: String,

    /// API key for the analyzer endpoint
    #[arg(long, env = "LLM_API_KEY", default_value = "")]
    pub llm_api_key: String,

    /// Model name requested from the analyzer endpoint
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-5-nano")]
    pub llm_model: String,

    /// Token for the code-hosting API (unauthenticated when empty)
    #[arg(long, env = "GITHUB_TOKEN", default_value = "")]
    pub github_token: String,

    /// Inner timeout for deferred command execution, in seconds.
    /// Must stay below the platform's hard execution ceiling so a
    /// last-resort error message can still be delivered.
    #[arg(long, env = "QUORUM_COMMAND_TIMEOUT_SECS", default_value_t = 120)]
    pub command_timeout_secs: u64,

    /// Review rate limit: maximum requests per window
    #[arg(long, env = "QUORUM_REVIEW_LIMIT", default_value_t = 10)]
    pub review_limit: usize,

    /// Review rate limit: window length in seconds
    #[arg(long, env = "QUORUM_REVIEW_WINDOW_SECS", default_value_t = 3600)]
    pub review_window_secs: u64,

    /// Follow-up chat rate limit: maximum requests per window
    #[arg(long, env = "QUORUM_CHAT_LIMIT", default_value_t = 30)]
    pub chat_limit: usize,

    /// Follow-up chat rate limit: window length in seconds
    #[arg(long, env = "QUORUM_CHAT_WINDOW_SECS", default_value_t = 3600)]
    pub chat_window_secs: u64,
}

impl Config {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}
