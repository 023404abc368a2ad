//! LLM-backed analyzer and follow-up responder
//!
//! Thin client for an OpenAI-compatible chat completion endpoint. The
//! model is asked for a single JSON object matching the report schema;
//! anything else is an upstream failure for that agent alone.

use crate::analyzer::{prompts, Analyzer, ChatTurn, FollowUpResponder};
use async_trait::async_trait;
use quorum_common::review::{AgentKind, AgentReport};
use quorum_common::{Error, Result};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout against the completion endpoint
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Shared connection to the completion endpoint
pub struct LlmClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

impl LlmClient {
    pub fn new(api_base: &str, api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// One chat completion call; returns the assistant text
    async fn complete(&self, system: &str, messages: &[serde_json::Value]) -> Result<String> {
        let mut all_messages = vec![json!({ "role": "system", "content": system })];
        all_messages.extend_from_slice(messages);

        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": all_messages,
            }))
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "completion endpoint returned {status}: {body}"
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("malformed completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Upstream("completion response had no choices".to_string()))
    }
}

/// One agent of the standard panel, backed by the shared LLM client
pub struct LlmAnalyzer {
    kind: AgentKind,
    system_prompt: String,
    client: Arc<LlmClient>,
}

impl LlmAnalyzer {
    pub fn new(kind: AgentKind, client: Arc<LlmClient>) -> Self {
        Self {
            kind,
            system_prompt: prompts::system_prompt(kind),
            client,
        }
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn analyze(&self, input: &str) -> Result<AgentReport> {
        let user = json!({
            "role": "user",
            "content": format!("Review the following code:\n\n{input}"),
        });
        let text = self.client.complete(&self.system_prompt, &[user]).await?;
        debug!(agent = %self.kind, chars = text.len(), "analyzer response received");
        parse_report(&text)
    }
}

/// Parse the model's JSON report, tolerating a fenced code block wrapper.
/// Scores outside 0-10 are an upstream failure, not data.
fn parse_report(text: &str) -> Result<AgentReport> {
    let body = strip_code_fence(text.trim());
    let report: AgentReport = serde_json::from_str(body)
        .map_err(|e| Error::Upstream(format!("analyzer returned malformed report: {e}")))?;
    if report.score > 10 {
        return Err(Error::Upstream(format!(
            "analyzer reported score {} outside the 0-10 range",
            report.score
        )));
    }
    Ok(report)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the fence line
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}

#[async_trait]
impl FollowUpResponder for LlmClient {
    async fn respond(&self, system_prompt: &str, turns: &[ChatTurn]) -> Result<String> {
        let messages: Vec<serde_json::Value> = turns
            .iter()
            .map(|t| json!({ "role": t.role.as_str(), "content": t.content }))
            .collect();
        self.complete(system_prompt, &messages).await
    }
}
