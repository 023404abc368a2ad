//! Deferred command gateway integration tests
//!
//! Drives the webhook endpoint through the full router with a real
//! keypair: liveness pings, signature rejection, the deferred ack for
//! commands, and the unconfigured-gateway path.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use ed25519_dalek::{Signer, SigningKey};
use quorum_common::review::{AgentKind, AgentReport};
use quorum_common::truncate::CHANNEL_MESSAGE_LIMIT;
use quorum_common::Result;
use quorum_server::analyzer::{Analyzer, ChatTurn, FollowUpResponder, ReviewPanel};
use quorum_server::config::Config;
use quorum_server::state::AppState;
use quorum_server::{build_router, db};
use serde_json::{json, Value};
use sqlx::Row;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tower::ServiceExt;

// ============================================================================
// Test Helpers
// ============================================================================

struct MockAnalyzer {
    kind: AgentKind,
    delay: Duration,
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
        Ok(AgentReport {
            summary: "fine".to_string(),
            findings: vec![],
            score: 8,
        })
    }
}

struct StubResponder;

#[async_trait]
impl FollowUpResponder for StubResponder {
    async fn respond(&self, _system_prompt: &str, _turns: &[ChatTurn]) -> Result<String> {
        Ok("stub answer".to_string())
    }
}

fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        db_path: "unused.db".into(),
        discord_public_key: None,
        discord_application_id: "app-id".to_string(),
        // Unreachable loopback port so detached follow-up posts fail fast
        discord_api_base: "http://127.0.0.1:9".to_string(),
        llm_api_base: "http://127.0.0.1:9".to_string(),
        llm_api_key: String::new(),
        llm_model: "test-model".to_string(),
        github_token: String::new(),
        command_timeout_secs: 5,
        review_limit: 10,
        review_window_secs: 3600,
        chat_limit: 30,
        chat_window_secs: 3600,
    }
}

fn keypair() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

async fn setup_with(panel_delay: Duration, config: Config) -> (axum::Router, AppState) {
    let panel = ReviewPanel::new(vec![Arc::new(MockAnalyzer {
        kind: AgentKind::CodeReviewer,
        delay: panel_delay,
    })]);

    let pool = db::connect_memory().await.unwrap();
    let state = AppState::new(pool, Arc::new(panel), Arc::new(StubResponder), config).unwrap();
    (build_router(state.clone()), state)
}

async fn setup(panel_delay: Duration, config_public_key: Option<String>) -> (axum::Router, AppState) {
    let mut config = test_config();
    config.discord_public_key = config_public_key;
    setup_with(panel_delay, config).await
}

/// Local stand-in for the platform's follow-up callback endpoint; every
/// delivered body is forwarded to the returned channel.
async fn spawn_callback_sink() -> (String, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(4);
    let app = axum::Router::new().route(
        "/webhooks/:app_id/:token",
        axum::routing::post(move |body: String| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(body).await;
                "{}"
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), rx)
}

fn sign(signing: &SigningKey, timestamp: &str, body: &str) -> String {
    let mut message = timestamp.as_bytes().to_vec();
    message.extend_from_slice(body.as_bytes());
    hex::encode(signing.sign(&message).to_bytes())
}

fn signed_request(signing: &SigningKey, body: &Value) -> Request<Body> {
    let body_text = body.to_string();
    let timestamp = "1700000000";
    let signature = sign(signing, timestamp, &body_text);

    Request::builder()
        .method("POST")
        .uri("/api/webhooks/discord")
        .header("content-type", "application/json")
        .header("x-signature-ed25519", signature)
        .header("x-signature-timestamp", timestamp)
        .body(Body::from(body_text))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn conversation_count(state: &AppState) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM conversations")
        .fetch_one(&state.db)
        .await
        .unwrap()
        .get("n")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn ping_with_valid_signature_gets_pong() {
    let signing = keypair();
    let public_key = hex::encode(signing.verifying_key().to_bytes());
    let (app, _state) = setup(Duration::ZERO, Some(public_key)).await;

    let response = app
        .oneshot(signed_request(&signing, &json!({ "type": 1 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["type"], 1);
}

#[tokio::test]
async fn invalid_signature_is_rejected_without_side_effects() {
    let signing = keypair();
    let public_key = hex::encode(signing.verifying_key().to_bytes());
    let (app, state) = setup(Duration::ZERO, Some(public_key)).await;

    // Signed over a different body than the one sent
    let body_text = json!({
        "type": 2,
        "data": { "name": "review", "options": [{ "name": "code", "value": "fn x() {}" }] },
        "member": { "user": { "id": "u1", "username": "alice" } },
        "token": "tok"
    })
    .to_string();
    let timestamp = "1700000000";
    let signature = sign(&signing, timestamp, "something else entirely");

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/discord")
        .header("content-type", "application/json")
        .header("x-signature-ed25519", signature)
        .header("x-signature-timestamp", timestamp)
        .body(Body::from(body_text))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // No command ran, nothing was persisted
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(conversation_count(&state).await, 0);
}

#[tokio::test]
async fn missing_signature_headers_is_unauthorized() {
    let signing = keypair();
    let public_key = hex::encode(signing.verifying_key().to_bytes());
    let (app, _state) = setup(Duration::ZERO, Some(public_key)).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/webhooks/discord")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "type": 1 }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn command_is_acked_deferred_before_work_completes() {
    let signing = keypair();
    let public_key = hex::encode(signing.verifying_key().to_bytes());
    // Analyzer slower than any acceptable ack latency
    let (app, _state) = setup(Duration::from_secs(2), Some(public_key)).await;

    let interaction = json!({
        "type": 2,
        "data": { "name": "review", "options": [{ "name": "code", "value": "fn x() {}" }] },
        "member": { "user": { "id": "u1", "username": "alice" } },
        "token": "tok"
    });

    let started = Instant::now();
    let response = app
        .oneshot(signed_request(&signing, &interaction))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        elapsed < Duration::from_secs(1),
        "ack took {elapsed:?}, command must not run before the ack"
    );
    let body = response_json(response).await;
    assert_eq!(body["type"], 5);
}

#[tokio::test]
async fn timed_out_command_delivers_exactly_one_error_follow_up() {
    let signing = keypair();
    let (callback_base, mut callbacks) = spawn_callback_sink().await;

    let mut config = test_config();
    config.discord_public_key = Some(hex::encode(signing.verifying_key().to_bytes()));
    config.discord_api_base = callback_base;
    config.command_timeout_secs = 1;

    // Analyzer far slower than the command budget
    let (app, _state) = setup_with(Duration::from_secs(30), config).await;

    let interaction = json!({
        "type": 2,
        "data": { "name": "review", "options": [{ "name": "code", "value": "fn x() {}" }] },
        "member": { "user": { "id": "u1", "username": "alice" } },
        "token": "tok"
    });

    let response = app
        .oneshot(signed_request(&signing, &interaction))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["type"], 5);

    // The budget elapses and one truncated error message is delivered
    let delivered = tokio::time::timeout(Duration::from_secs(5), callbacks.recv())
        .await
        .expect("no follow-up delivered within 5s")
        .unwrap();
    let payload: Value = serde_json::from_str(&delivered).unwrap();
    let content = payload["content"].as_str().unwrap();
    assert!(content.contains("/review timed out"), "got: {content}");
    assert!(content.chars().count() <= CHANNEL_MESSAGE_LIMIT);

    // At most one delivery attempt, never a retry
    assert!(
        tokio::time::timeout(Duration::from_millis(500), callbacks.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn unsupported_interaction_type_is_bad_request() {
    let signing = keypair();
    let public_key = hex::encode(signing.verifying_key().to_bytes());
    let (app, _state) = setup(Duration::ZERO, Some(public_key)).await;

    let response = app
        .oneshot(signed_request(&signing, &json!({ "type": 3 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unconfigured_gateway_returns_service_unavailable() {
    let (app, _state) = setup(Duration::ZERO, None).await;

    let signing = keypair();
    let response = app
        .clone()
        .oneshot(signed_request(&signing, &json!({ "type": 1 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Probe endpoint reports the same
    let probe = Request::builder()
        .method("GET")
        .uri("/api/webhooks/discord")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(probe).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn probe_reports_active_when_configured() {
    let signing = keypair();
    let public_key = hex::encode(signing.verifying_key().to_bytes());
    let (app, _state) = setup(Duration::ZERO, Some(public_key)).await;

    let probe = Request::builder()
        .method("GET")
        .uri("/api/webhooks/discord")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(probe).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
