//! Multi-analyzer orchestration
//!
//! Fans one input out to every analyzer on the panel concurrently and
//! settles each independently: an error (or panic) in one analyzer becomes
//! a failure outcome for that agent only and never delays or cancels the
//! others. Outcomes are delivered through a bounded channel in completion
//! order; the channel closes after exactly N outcomes.
//!
//! If the consumer goes away mid-stream (client disconnect), in-flight
//! analyzer tasks are not cancelled; their late outcomes fail to send and
//! are dropped. That is the documented policy, not an oversight.

use crate::analyzer::{Analyzer, ReviewPanel};
use quorum_common::review::{AgentOutcome, ReviewAggregate};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Launch all analyzers against `input` and stream outcomes as they settle.
///
/// Returns a receiver yielding exactly one `AgentOutcome` per panel member,
/// then `None`. The channel is bounded at the panel size so producers never
/// block on a live consumer.
pub fn run_streaming(panel: Arc<ReviewPanel>, input: String) -> mpsc::Receiver<AgentOutcome> {
    let capacity = panel.len().max(1);
    let (tx, rx) = mpsc::channel(capacity);

    for analyzer in panel.analyzers() {
        let analyzer = analyzer.clone();
        let input = input.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let kind = analyzer.kind();
            // Inner task so a panicking analyzer settles as a failure
            // outcome instead of taking the send down with it
            let handle = tokio::spawn(async move { run_single(analyzer, &input).await });
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    warn!(agent = %kind, "analyzer task panicked: {join_err}");
                    AgentOutcome::failure(kind, "Agent failed unexpectedly")
                }
            };

            if tx.send(outcome).await.is_err() {
                debug!(agent = %kind, "consumer gone, outcome dropped");
            }
        });
    }

    // Producers hold the remaining senders; the channel closes once all
    // N outcomes are sent.
    rx
}

/// Batch variant: collect all outcomes for non-streaming callers.
///
/// Never fails on analyzer errors; each failure is one outcome slot.
pub async fn run_batch(panel: Arc<ReviewPanel>, input: String) -> Vec<AgentOutcome> {
    let expected = panel.len();
    let mut rx = run_streaming(panel, input);
    let mut outcomes = Vec::with_capacity(expected);
    while let Some(outcome) = rx.recv().await {
        outcomes.push(outcome);
    }
    outcomes
}

/// Aggregate a completed outcome set
pub fn aggregate(outcomes: &[AgentOutcome]) -> ReviewAggregate {
    ReviewAggregate::from_outcomes(outcomes)
}

async fn run_single(analyzer: Arc<dyn Analyzer>, input: &str) -> AgentOutcome {
    let kind = analyzer.kind();
    match analyzer.analyze(input).await {
        Ok(report) => {
            debug!(agent = %kind, findings = report.findings.len(), score = report.score,
                   "analyzer completed");
            AgentOutcome::success(kind, report)
        }
        Err(err) => {
            warn!(agent = %kind, "analyzer failed: {err}");
            AgentOutcome::failure(kind, err.to_string())
        }
    }
}
