//! Common error types for quorum

use thiserror::Error;

/// Common result type for quorum operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the quorum workspace
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or invalid credentials, including webhook signatures
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller exceeded a rate-limit window; `reset_ms` is the time until
    /// the oldest request in the window expires
    #[error("Rate limited: retry in {reset_ms}ms")]
    RateLimited { reset_ms: u64 },

    /// An upstream collaborator (analyzer, code-hosting API) failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A bounded operation exceeded its inner deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
