//! Analyzer capability seam
//!
//! An analyzer scores and critiques a text input along one specialization
//! axis. The service treats analyzers as opaque, possibly slow, black
//! boxes; the only implementation shipped here is an LLM-backed one, but
//! the orchestrator and tests depend on the trait alone.

pub mod llm;
pub mod prompts;

use async_trait::async_trait;
use quorum_common::review::{AgentKind, AgentReport, MessageRole};
use quorum_common::Result;
use std::sync::Arc;

/// Opaque analyzer capability.
///
/// Implementations must not share mutable state across concurrent
/// invocations; the orchestrator calls `analyze` from independent tasks.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Fixed identity of this analyzer within the panel
    fn kind(&self) -> AgentKind;

    /// Produce a structured verdict for `input`, or fail with a message
    async fn analyze(&self, input: &str) -> Result<AgentReport>;
}

/// One turn of a follow-up exchange
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

/// Opaque capability answering follow-up questions about a finished
/// review. Shared by the web chat route and the deferred `/followup`
/// command.
#[async_trait]
pub trait FollowUpResponder: Send + Sync {
    async fn respond(&self, system_prompt: &str, turns: &[ChatTurn]) -> Result<String>;
}

/// The configured set of analyzers for this process.
///
/// Constructed once at startup and passed by reference to handlers; never
/// lazily re-created.
pub struct ReviewPanel {
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl ReviewPanel {
    pub fn new(analyzers: Vec<Arc<dyn Analyzer>>) -> Self {
        Self { analyzers }
    }

    /// Build the standard four-agent LLM panel
    pub fn standard(client: llm::LlmClient) -> Self {
        let client = Arc::new(client);
        let analyzers = AgentKind::ALL
            .iter()
            .map(|&kind| {
                Arc::new(llm::LlmAnalyzer::new(kind, client.clone())) as Arc<dyn Analyzer>
            })
            .collect();
        Self { analyzers }
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Agent identities in declaration order (the roster)
    pub fn roster(&self) -> Vec<AgentKind> {
        self.analyzers.iter().map(|a| a.kind()).collect()
    }

    pub fn analyzers(&self) -> &[Arc<dyn Analyzer>] {
        &self.analyzers
    }
}
