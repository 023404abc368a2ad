//! Orchestrator integration tests
//!
//! Covers independent settlement: every configured analyzer produces
//! exactly one outcome, failures are contained to their own slot, and
//! outcomes arrive in completion order rather than declaration order.

use async_trait::async_trait;
use quorum_common::review::{AgentKind, AgentOutcome, AgentReport, Finding, Severity};
use quorum_common::{Error, Result};
use quorum_server::analyzer::{Analyzer, ReviewPanel};
use quorum_server::orchestrator;
use std::sync::Arc;
use std::time::Duration;

/// Analyzer with scripted latency and result
struct MockAnalyzer {
    kind: AgentKind,
    delay: Duration,
    response: std::result::Result<AgentReport, String>,
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    async fn analyze(&self, _input: &str) -> Result<AgentReport> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.response {
            Ok(report) => Ok(report.clone()),
            Err(message) => Err(Error::Upstream(message.clone())),
        }
    }
}

/// Analyzer that panics mid-flight
struct PanickingAnalyzer(AgentKind);

#[async_trait]
impl Analyzer for PanickingAnalyzer {
    fn kind(&self) -> AgentKind {
        self.0
    }

    async fn analyze(&self, _input: &str) -> Result<AgentReport> {
        panic!("scripted panic");
    }
}

fn report(score: u8, findings: Vec<Finding>) -> AgentReport {
    AgentReport {
        summary: format!("score {score}"),
        findings,
        score,
    }
}

fn finding(severity: Severity) -> Finding {
    Finding {
        severity,
        category: "Test".into(),
        title: "t".into(),
        description: "d".into(),
        suggestion: "s".into(),
        line_reference: None,
    }
}

fn ok_analyzer(kind: AgentKind, delay_ms: u64, score: u8) -> Arc<dyn Analyzer> {
    Arc::new(MockAnalyzer {
        kind,
        delay: Duration::from_millis(delay_ms),
        response: Ok(report(score, vec![])),
    })
}

fn failing_analyzer(kind: AgentKind, delay_ms: u64, message: &str) -> Arc<dyn Analyzer> {
    Arc::new(MockAnalyzer {
        kind,
        delay: Duration::from_millis(delay_ms),
        response: Err(message.to_string()),
    })
}

#[tokio::test]
async fn batch_yields_one_outcome_per_analyzer() {
    let panel = Arc::new(ReviewPanel::new(vec![
        ok_analyzer(AgentKind::CodeReviewer, 0, 8),
        ok_analyzer(AgentKind::Security, 0, 9),
        ok_analyzer(AgentKind::Performance, 0, 7),
        ok_analyzer(AgentKind::Testing, 0, 6),
    ]));

    let outcomes = orchestrator::run_batch(panel, "fn f() {}".into()).await;
    assert_eq!(outcomes.len(), 4);

    // Exactly one outcome per identity
    for kind in AgentKind::ALL {
        assert_eq!(outcomes.iter().filter(|o| o.agent == kind).count(), 1);
    }
}

#[tokio::test]
async fn failures_never_abort_the_batch() {
    // All but one analyzer fails
    let panel = Arc::new(ReviewPanel::new(vec![
        failing_analyzer(AgentKind::CodeReviewer, 0, "boom 1"),
        failing_analyzer(AgentKind::Security, 0, "boom 2"),
        ok_analyzer(AgentKind::Performance, 10, 7),
        failing_analyzer(AgentKind::Testing, 0, "boom 3"),
    ]));

    let outcomes = orchestrator::run_batch(panel, "x".into()).await;
    assert_eq!(outcomes.len(), 4);

    let survivor = outcomes
        .iter()
        .find(|o| o.agent == AgentKind::Performance)
        .unwrap();
    assert!(!survivor.is_failure());

    assert_eq!(outcomes.iter().filter(|o| o.is_failure()).count(), 3);
}

#[tokio::test]
async fn a_panicking_analyzer_settles_as_a_failure_outcome() {
    let panel = Arc::new(ReviewPanel::new(vec![
        Arc::new(PanickingAnalyzer(AgentKind::Security)),
        ok_analyzer(AgentKind::Testing, 0, 5),
    ]));

    let outcomes = orchestrator::run_batch(panel, "x".into()).await;
    assert_eq!(outcomes.len(), 2);

    let panicked = outcomes
        .iter()
        .find(|o| o.agent == AgentKind::Security)
        .unwrap();
    assert!(panicked.is_failure());
}

#[tokio::test]
async fn outcomes_arrive_in_completion_order() {
    // Declared slow-first; the fast one must still arrive first
    let panel = Arc::new(ReviewPanel::new(vec![
        ok_analyzer(AgentKind::CodeReviewer, 150, 8),
        ok_analyzer(AgentKind::Security, 0, 9),
    ]));

    let mut rx = orchestrator::run_streaming(panel, "x".into());
    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert!(rx.recv().await.is_none());

    assert_eq!(first.agent, AgentKind::Security);
    assert_eq!(second.agent, AgentKind::CodeReviewer);
}

#[tokio::test]
async fn empty_panel_streams_nothing() {
    let panel = Arc::new(ReviewPanel::new(vec![]));
    let mut rx = orchestrator::run_streaming(panel, "x".into());
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn aggregate_matches_reference_scenario() {
    // A: score 8, no findings; B: score 9, 1 low; C fails; D: score 3,
    // 1 critical + 1 medium
    let panel = Arc::new(ReviewPanel::new(vec![
        Arc::new(MockAnalyzer {
            kind: AgentKind::CodeReviewer,
            delay: Duration::ZERO,
            response: Ok(report(8, vec![])),
        }),
        Arc::new(MockAnalyzer {
            kind: AgentKind::Security,
            delay: Duration::ZERO,
            response: Ok(report(9, vec![finding(Severity::Low)])),
        }),
        Arc::new(MockAnalyzer {
            kind: AgentKind::Performance,
            delay: Duration::ZERO,
            response: Err("upstream timeout".to_string()),
        }),
        Arc::new(MockAnalyzer {
            kind: AgentKind::Testing,
            delay: Duration::ZERO,
            response: Ok(report(
                3,
                vec![finding(Severity::Critical), finding(Severity::Medium)],
            )),
        }),
    ]));

    let outcomes = orchestrator::run_batch(panel, "fn trivial() {}".into()).await;
    let aggregate = orchestrator::aggregate(&outcomes);

    assert_eq!(aggregate.total_findings, 3);
    assert_eq!(aggregate.severity_counts.critical, 1);
    assert_eq!(aggregate.severity_counts.medium, 1);
    assert_eq!(aggregate.severity_counts.low, 1);
    assert_eq!(aggregate.errors.len(), 1);
    assert_eq!(aggregate.errors[0].agent, AgentKind::Performance);
    assert!(aggregate.errors[0].message.contains("upstream timeout"));
}

#[tokio::test]
async fn late_outcomes_are_dropped_when_consumer_disconnects() {
    let panel = Arc::new(ReviewPanel::new(vec![
        ok_analyzer(AgentKind::Security, 0, 9),
        ok_analyzer(AgentKind::CodeReviewer, 100, 8),
    ]));

    let mut rx = orchestrator::run_streaming(panel, "x".into());
    let first = rx.recv().await.unwrap();
    assert_eq!(first.agent, AgentKind::Security);

    // Consumer disconnects mid-stream; the slow analyzer's send fails
    // silently and nothing panics or retries
    drop(rx);
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn failure_outcome_carries_the_error_text() {
    let outcomes = orchestrator::run_batch(
        Arc::new(ReviewPanel::new(vec![failing_analyzer(
            AgentKind::Testing,
            0,
            "model unavailable",
        )])),
        "x".into(),
    )
    .await;

    assert_eq!(outcomes.len(), 1);
    let outcome: &AgentOutcome = &outcomes[0];
    assert!(outcome.error.as_deref().unwrap().contains("model unavailable"));
}
