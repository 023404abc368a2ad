//! Text formatting for review results
//!
//! Channel summaries for the chat gateway and the follow-up context block
//! handed to the responder.

use quorum_common::review::{AgentOutcome, ReviewAggregate, Severity};

/// Format a completed outcome set as a markdown summary for the chat
/// channel. Truncation to the channel limit happens at send time.
pub fn channel_summary(outcomes: &[AgentOutcome]) -> String {
    let mut lines: Vec<String> = vec!["## Code Review Summary\n".to_string()];

    for outcome in outcomes {
        let label = outcome.agent.label();
        let Some(report) = &outcome.result else {
            let error = outcome.error.as_deref().unwrap_or("No result");
            lines.push(format!("### {label} -- Error\n{error}\n"));
            continue;
        };

        lines.push(format!("### {label} — Score: {}/10", report.score));
        for finding in &report.findings {
            let reference = finding
                .line_reference
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            lines.push(format!(
                "- **{}**: {}{} — {}",
                finding.severity.label(),
                finding.title,
                reference,
                finding.suggestion,
            ));
        }
        lines.push(String::new());
    }

    let aggregate = ReviewAggregate::from_outcomes(outcomes);
    let counts = Severity::ALL
        .iter()
        .filter_map(|&s| {
            let n = aggregate.severity_counts.get(s);
            (n > 0).then(|| format!("{n} {}", s.as_str()))
        })
        .collect::<Vec<_>>()
        .join(", ");

    lines.push(format!(
        "**Overall**: {} findings ({counts})",
        aggregate.total_findings
    ));

    lines.join("\n")
}

/// Context block for the follow-up responder: the original input plus
/// every agent's verdict.
pub fn review_context(code: &str, outcomes: &[AgentOutcome]) -> String {
    let mut context = format!("## Original Code Under Review\n```\n{code}\n```\n\n");
    context.push_str("## Review Results\n\n");

    for outcome in outcomes {
        match &outcome.result {
            Some(report) => {
                context.push_str(&format!(
                    "### {} (Score: {}/10)\n{}\n\n",
                    outcome.agent, report.score, report.summary
                ));
                for finding in &report.findings {
                    let reference = finding
                        .line_reference
                        .as_deref()
                        .map(|r| format!(" ({r})"))
                        .unwrap_or_default();
                    context.push_str(&format!(
                        "- **[{}] {}**{}: {}\n  Suggestion: {}\n",
                        finding.severity.as_str().to_uppercase(),
                        finding.title,
                        reference,
                        finding.description,
                        finding.suggestion,
                    ));
                }
            }
            None => {
                context.push_str(&format!(
                    "### {} (Score: N/A/10)\nNo summary\n",
                    outcome.agent
                ));
            }
        }
        context.push('\n');
    }

    context
}
