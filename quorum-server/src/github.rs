//! Narrow client for commit-diff fetching
//!
//! Accepts a full commit URL or `owner/repo@sha` shorthand, fetches the
//! commit from the code-hosting API, and assembles a size-capped diff for
//! the analyzers. Everything beyond this interface is external.

use once_cell::sync::Lazy;
use quorum_common::commit::{CommitFile, CommitMeta, CommitStats};
use quorum_common::{Error, Result};
use regex::Regex;
use serde::Deserialize;

static COMMIT_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://github\.com/([^/]+)/([^/]+)/commit/([a-f0-9]{4,40})$")
        .expect("commit URL regex")
});

static SHORTHAND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([^/\s]+)/([^@\s]+)@([a-f0-9]{4,40})$").expect("commit shorthand regex")
});

/// Upper bound on the diff text handed to analyzers
const MAX_DIFF_CHARS: usize = 15_000;

/// Parsed commit reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub owner: String,
    pub repo: String,
    pub sha: String,
}

/// Resolved commit: metadata plus the assembled diff text
#[derive(Debug, Clone)]
pub struct CommitData {
    pub meta: CommitMeta,
    pub diff: String,
}

/// Parse a commit URL or `owner/repo@sha` shorthand
pub fn parse_commit_input(input: &str) -> Option<CommitRef> {
    let trimmed = input.trim();
    let captures = COMMIT_URL_RE
        .captures(trimmed)
        .or_else(|| SHORTHAND_RE.captures(trimmed))?;
    Some(CommitRef {
        owner: captures[1].to_string(),
        repo: captures[2].to_string(),
        sha: captures[3].to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    commit: ApiCommitDetail,
    html_url: String,
    #[serde(default)]
    stats: Option<ApiStats>,
    #[serde(default)]
    files: Vec<ApiFile>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitDetail {
    message: String,
    author: Option<ApiAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStats {
    additions: u32,
    deletions: u32,
    total: u32,
}

#[derive(Debug, Deserialize)]
struct ApiFile {
    filename: String,
    status: String,
    additions: u32,
    deletions: u32,
    patch: Option<String>,
}

/// Fetch one commit and assemble its diff
pub async fn fetch_commit(
    client: &reqwest::Client,
    token: &str,
    commit: &CommitRef,
) -> Result<CommitData> {
    let url = format!(
        "https://api.github.com/repos/{}/{}/commits/{}",
        commit.owner, commit.repo, commit.sha
    );

    let mut request = client
        .get(&url)
        .header("Accept", "application/vnd.github.v3+json")
        .header("User-Agent", "quorum-review");
    if !token.is_empty() {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::Upstream(format!("commit fetch failed: {e}")))?;

    let status = response.status();
    if status.as_u16() == 404 {
        return Err(Error::NotFound(format!(
            "commit {} not found in {}/{}",
            commit.sha, commit.owner, commit.repo
        )));
    }
    if !status.is_success() {
        return Err(Error::Upstream(format!(
            "code-hosting API returned {status}"
        )));
    }

    let api: ApiCommit = response
        .json()
        .await
        .map_err(|e| Error::Upstream(format!("malformed commit response: {e}")))?;

    Ok(assemble(api))
}

fn assemble(api: ApiCommit) -> CommitData {
    let mut diff = String::new();
    for file in &api.files {
        let Some(patch) = &file.patch else { continue };
        let remaining = MAX_DIFF_CHARS.saturating_sub(diff.chars().count());
        if remaining == 0 {
            break;
        }
        diff.push_str(&format!("--- {}\n", file.filename));
        let take: String = patch.chars().take(remaining).collect();
        diff.push_str(&take);
        diff.push('\n');
    }

    let stats = api
        .stats
        .map(|s| CommitStats {
            additions: s.additions,
            deletions: s.deletions,
            total: s.total,
        })
        .unwrap_or_default();

    let first_line = api
        .commit
        .message
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(80)
        .collect::<String>();

    CommitData {
        meta: CommitMeta {
            sha: api.sha,
            message: first_line,
            author: api
                .commit
                .author
                .and_then(|a| a.name)
                .unwrap_or_else(|| "unknown".to_string()),
            stats,
            files: api
                .files
                .into_iter()
                .map(|f| CommitFile {
                    filename: f.filename,
                    status: f.status,
                    additions: f.additions,
                    deletions: f.deletions,
                })
                .collect(),
            html_url: api.html_url,
        },
        diff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_commit_url() {
        let parsed =
            parse_commit_input("https://github.com/owner/repo/commit/abc123def456").unwrap();
        assert_eq!(parsed.owner, "owner");
        assert_eq!(parsed.repo, "repo");
        assert_eq!(parsed.sha, "abc123def456");
    }

    #[test]
    fn parses_shorthand() {
        let parsed = parse_commit_input(" owner/repo@beef1234 ").unwrap();
        assert_eq!(parsed.owner, "owner");
        assert_eq!(parsed.repo, "repo");
        assert_eq!(parsed.sha, "beef1234");
    }

    #[test]
    fn rejects_non_commit_input() {
        assert!(parse_commit_input("https://github.com/owner/repo").is_none());
        assert!(parse_commit_input("owner/repo@nothex!").is_none());
        assert!(parse_commit_input("just some text").is_none());
    }

    #[test]
    fn diff_is_capped() {
        let api = ApiCommit {
            sha: "abc".into(),
            commit: ApiCommitDetail {
                message: "subject line\n\nbody".into(),
                author: None,
            },
            html_url: "https://example.test".into(),
            stats: None,
            files: vec![ApiFile {
                filename: "big.rs".into(),
                status: "modified".into(),
                additions: 1,
                deletions: 0,
                patch: Some("x".repeat(MAX_DIFF_CHARS * 2)),
            }],
        };
        let data = assemble(api);
        assert!(data.diff.chars().count() <= MAX_DIFF_CHARS + "--- big.rs\n\n".len());
        assert_eq!(data.meta.message, "subject line");
        assert_eq!(data.meta.author, "unknown");
    }
}
