//! Named stream frames for the live review flow
//!
//! A review stream emits, in order: one roster frame, zero or more metadata
//! frames, one result frame per analyzer outcome in completion order, and
//! exactly one terminal frame. Consumers must ignore unrecognized frame
//! names for forward compatibility; absence of the terminal frame means
//! the session is incomplete.

use crate::commit::CommitMeta;
use crate::review::{AgentKind, AgentOutcome};
use serde_json::json;
use uuid::Uuid;

/// One frame of the review stream
#[derive(Debug, Clone)]
pub enum ReviewEvent {
    /// Metadata frame: the request was persisted under this conversation
    ConversationCreated { id: Uuid },
    /// Metadata frame: resolved commit details for commit-reference reviews
    CommitMetadata(CommitMeta),
    /// Roster frame naming all configured agents, sent before any result
    AgentsStarted { agents: Vec<AgentKind> },
    /// One per analyzer outcome, in completion order
    AgentResult(AgentOutcome),
    /// Terminal frame; the stream closes after this
    Done,
}

impl ReviewEvent {
    /// Frame name carried in the SSE `event:` field
    pub fn name(&self) -> &'static str {
        match self {
            ReviewEvent::ConversationCreated { .. } => "conversation-id",
            ReviewEvent::CommitMetadata(_) => "commit-metadata",
            ReviewEvent::AgentsStarted { .. } => "agents-started",
            ReviewEvent::AgentResult(_) => "agent-result",
            ReviewEvent::Done => "done",
        }
    }

    /// JSON payload carried in the SSE `data:` field
    pub fn payload(&self) -> serde_json::Value {
        match self {
            ReviewEvent::ConversationCreated { id } => json!({ "id": id }),
            ReviewEvent::CommitMetadata(meta) => {
                serde_json::to_value(meta).unwrap_or_else(|_| json!({}))
            }
            ReviewEvent::AgentsStarted { agents } => json!({ "agents": agents }),
            ReviewEvent::AgentResult(outcome) => {
                serde_json::to_value(outcome).unwrap_or_else(|_| json!({}))
            }
            ReviewEvent::Done => json!({ "message": "All agents complete" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names_are_stable() {
        assert_eq!(
            ReviewEvent::AgentsStarted { agents: vec![] }.name(),
            "agents-started"
        );
        assert_eq!(ReviewEvent::Done.name(), "done");
        assert_eq!(
            ReviewEvent::ConversationCreated { id: Uuid::nil() }.name(),
            "conversation-id"
        );
    }

    #[test]
    fn roster_payload_lists_agents() {
        let event = ReviewEvent::AgentsStarted {
            agents: AgentKind::ALL.to_vec(),
        };
        let payload = event.payload();
        let agents = payload["agents"].as_array().unwrap();
        assert_eq!(agents.len(), 4);
        assert_eq!(agents[0], "code-reviewer");
    }
}
