//! quorum-server library - multi-analyzer code review service
//!
//! Fans review requests out to a panel of independent analyzers, streams
//! per-analyzer verdicts over SSE as they complete, persists review
//! sessions for follow-up discussion, and bridges a chat platform whose
//! synchronous ack window is shorter than review time.

pub mod analyzer;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod gateway;
pub mod github;
pub mod orchestrator;
pub mod ratelimit;
pub mod state;

pub use api::server::build_router;
pub use state::AppState;
