//! HTTP API
//!
//! Router setup plus the handlers for the live review stream, persisted
//! review retrieval, follow-up chat, account linking, and health.

pub mod handlers;
pub mod link;
pub mod review;
pub mod server;
