//! Commit metadata carried alongside a review
//!
//! When a review is submitted by commit reference instead of raw code, the
//! resolved commit details ride along in a metadata stream frame and in the
//! persisted user message.

use serde::{Deserialize, Serialize};

/// One changed file within a commit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitFile {
    pub filename: String,
    pub status: String,
    pub additions: u32,
    pub deletions: u32,
}

/// Line-change totals for a commit
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CommitStats {
    pub additions: u32,
    pub deletions: u32,
    pub total: u32,
}

/// Resolved commit details from the code-hosting API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMeta {
    pub sha: String,
    /// First line of the commit message
    pub message: String,
    pub author: String,
    pub stats: CommitStats,
    pub files: Vec<CommitFile>,
    pub html_url: String,
}
