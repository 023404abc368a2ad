//! Shared types for the quorum review service
//!
//! Holds the review data model (agents, findings, outcomes, aggregates),
//! the named stream frame types, the common error type, and the channel
//! truncation utility. Everything here is plain data shared between the
//! server and its tests.

pub mod commit;
pub mod error;
pub mod events;
pub mod review;
pub mod truncate;

pub use error::{Error, Result};
