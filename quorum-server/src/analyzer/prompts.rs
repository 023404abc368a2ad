//! System prompts for the standard analyzer panel

use quorum_common::review::AgentKind;

/// JSON output contract shared by all analyzer prompts
const OUTPUT_CONTRACT: &str = r#"Respond with a single JSON object:
{"summary": "<brief overall assessment>",
 "findings": [{"severity": "critical|high|medium|low|info",
               "category": "<short category>",
               "title": "<short title>",
               "description": "<detailed explanation>",
               "suggestion": "<actionable fix>",
               "lineReference": "<optional, e.g. 'lines 20-25'>"}],
 "score": <integer 0-10>}
No prose outside the JSON object."#;

const CODE_REVIEWER: &str = "You are an expert code reviewer focused on code quality, readability, \
and best practices. Analyze the submitted code for organization, naming, \
error handling, duplication, anti-patterns, type safety, and edge cases. \
Rate it from 0 (terrible) to 10 (excellent) and report the most impactful \
issues first.";

const SECURITY: &str = "You are a security-focused code reviewer specializing in vulnerabilities \
and security risks: injection, authentication and authorization flaws, \
sensitive data exposure, input validation gaps, insecure cryptography, \
CSRF/SSRF, and unsafe deserialization or file handling. Rate the code's \
security from 0 (severely vulnerable) to 10 (hardened), prioritizing \
critical and high severity findings.";

const PERFORMANCE: &str = "You are a performance-focused code reviewer specializing in bottlenecks \
and optimization opportunities: algorithmic complexity, memory usage, \
N+1 queries, missing caching, inefficient data structures, and resource \
leaks. Rate the code's performance from 0 (critically slow) to 10 \
(highly optimized), most impactful issues first.";

const TESTING: &str = "You are a testing-focused code reviewer specializing in test coverage \
and quality assurance: missing coverage for critical paths, untested edge \
cases and error paths, testability problems from tight coupling, and \
async or race-condition testing concerns. Rate the code's testability \
and coverage from 0 (untestable) to 10 (well-tested), prioritizing gaps \
that could cause production bugs.";

/// Full system prompt for one agent specialization
pub fn system_prompt(kind: AgentKind) -> String {
    let role = match kind {
        AgentKind::CodeReviewer => CODE_REVIEWER,
        AgentKind::Security => SECURITY,
        AgentKind::Performance => PERFORMANCE,
        AgentKind::Testing => TESTING,
    };
    format!("{role}\n\n{OUTPUT_CONTRACT}")
}

/// System prompt for the follow-up responder, with full review context
pub fn follow_up_system_prompt(review_context: &str) -> String {
    format!(
        "You are a helpful code review assistant. You have full context of \
         a multi-agent code review. Answer follow-up questions about the \
         findings, explain issues, suggest fixes, or discuss the code.\n\n\
         {review_context}\n\n\
         Be concise but thorough. Use markdown formatting. When referencing \
         findings, quote them precisely. When suggesting code fixes, use \
         fenced code blocks."
    )
}
