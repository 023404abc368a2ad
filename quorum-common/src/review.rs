//! Review data model
//!
//! Agent identities, findings, per-agent outcomes, and the aggregate
//! computed over a completed outcome set. Outcomes arrive in completion
//! order, so consumers index by agent identity rather than position.

use serde::{Deserialize, Serialize};

/// Finding severity, highest precedence first.
///
/// Declaration order gives `Info < Low < Medium < High < Critical` through
/// the derived ordering, so severity comparison never depends on string
/// comparison or serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, highest precedence first
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }

    /// Capitalized label for user-facing summaries
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Info => "Info",
        }
    }
}

/// One specific issue reported by an analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    /// Free-text category, e.g. "SQL Injection" or "Missing Test"
    pub category: String,
    pub title: String,
    pub description: String,
    pub suggestion: String,
    /// Relevant line number or range, e.g. "line 15" or "lines 20-25"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_reference: Option<String>,
}

/// Structured success payload from one analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    /// Brief overall assessment of the input
    pub summary: String,
    pub findings: Vec<Finding>,
    /// Overall score from 0 (worst) to 10 (best)
    pub score: u8,
}

/// The fixed set of configured analyzer identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    CodeReviewer,
    Security,
    Performance,
    Testing,
}

impl AgentKind {
    /// All agents, in declaration order (roster order, not completion order)
    pub const ALL: [AgentKind; 4] = [
        AgentKind::CodeReviewer,
        AgentKind::Security,
        AgentKind::Performance,
        AgentKind::Testing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::CodeReviewer => "code-reviewer",
            AgentKind::Security => "security",
            AgentKind::Performance => "performance",
            AgentKind::Testing => "testing",
        }
    }

    /// Display label for summaries and UI
    pub fn label(&self) -> &'static str {
        match self {
            AgentKind::CodeReviewer => "Code Reviewer",
            AgentKind::Security => "Security",
            AgentKind::Performance => "Performance",
            AgentKind::Testing => "Testing",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-agent result: exactly one per agent identity per request.
///
/// Either `result` is present (success payload) or `error` carries the
/// failure text; a failed agent never aborts the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub agent: AgentKind,
    pub result: Option<AgentReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentOutcome {
    pub fn success(agent: AgentKind, report: AgentReport) -> Self {
        Self {
            agent,
            result: Some(report),
            error: None,
        }
    }

    pub fn failure(agent: AgentKind, message: impl Into<String>) -> Self {
        Self {
            agent,
            result: None,
            error: Some(message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.result.is_none()
    }
}

/// Message role within a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// Finding counts by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub info: u32,
}

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
    }
}

/// Error entry for an agent that failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentError {
    pub agent: AgentKind,
    pub message: String,
}

/// Aggregate over a completed outcome set.
///
/// There is no combined score; callers display per-agent scores and an
/// error indicator for failed agents. Failed agents contribute zero
/// findings plus an entry in `errors`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewAggregate {
    pub total_findings: u32,
    pub severity_counts: SeverityCounts,
    pub errors: Vec<AgentError>,
}

impl ReviewAggregate {
    pub fn from_outcomes(outcomes: &[AgentOutcome]) -> Self {
        let mut aggregate = ReviewAggregate::default();
        for outcome in outcomes {
            match &outcome.result {
                Some(report) => {
                    for finding in &report.findings {
                        aggregate.total_findings += 1;
                        aggregate.severity_counts.bump(finding.severity);
                    }
                }
                None => aggregate.errors.push(AgentError {
                    agent: outcome.agent,
                    message: outcome
                        .error
                        .clone()
                        .unwrap_or_else(|| "No result".to_string()),
                }),
            }
        }
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity) -> Finding {
        Finding {
            severity,
            category: "Test".to_string(),
            title: "t".to_string(),
            description: "d".to_string(),
            suggestion: "s".to_string(),
            line_reference: None,
        }
    }

    #[test]
    fn severity_ordering_follows_fixed_precedence() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"critical\""
        );
        let parsed: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Severity::Medium);
    }

    #[test]
    fn agent_kind_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&AgentKind::CodeReviewer).unwrap(),
            "\"code-reviewer\""
        );
        let parsed: AgentKind = serde_json::from_str("\"security\"").unwrap();
        assert_eq!(parsed, AgentKind::Security);
    }

    #[test]
    fn aggregate_counts_findings_and_errors() {
        // A succeeds with no findings, B with one low, C fails,
        // D with one critical and one medium
        let outcomes = vec![
            AgentOutcome::success(
                AgentKind::CodeReviewer,
                AgentReport {
                    summary: "fine".into(),
                    findings: vec![],
                    score: 8,
                },
            ),
            AgentOutcome::success(
                AgentKind::Security,
                AgentReport {
                    summary: "ok".into(),
                    findings: vec![finding(Severity::Low)],
                    score: 9,
                },
            ),
            AgentOutcome::failure(AgentKind::Performance, "upstream timeout"),
            AgentOutcome::success(
                AgentKind::Testing,
                AgentReport {
                    summary: "weak".into(),
                    findings: vec![finding(Severity::Critical), finding(Severity::Medium)],
                    score: 3,
                },
            ),
        ];

        let aggregate = ReviewAggregate::from_outcomes(&outcomes);
        assert_eq!(aggregate.total_findings, 3);
        assert_eq!(aggregate.severity_counts.critical, 1);
        assert_eq!(aggregate.severity_counts.medium, 1);
        assert_eq!(aggregate.severity_counts.low, 1);
        assert_eq!(aggregate.severity_counts.high, 0);
        assert_eq!(aggregate.errors.len(), 1);
        assert_eq!(aggregate.errors[0].agent, AgentKind::Performance);
        assert_eq!(aggregate.errors[0].message, "upstream timeout");
    }

    #[test]
    fn outcome_round_trips_through_json() {
        let outcome = AgentOutcome::failure(AgentKind::Security, "boom");
        let json = serde_json::to_string(&outcome).unwrap();
        let back: AgentOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back.agent, AgentKind::Security);
        assert!(back.is_failure());
        assert_eq!(back.error.as_deref(), Some("boom"));
    }
}
