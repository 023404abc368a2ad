//! Router setup

use crate::api::{handlers, link, review};
use crate::gateway;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/review", post(review::submit_review))
        .route("/api/review/history", get(handlers::review_history))
        .route("/api/review/chat", post(handlers::follow_up_chat))
        .route("/api/conversations", get(handlers::list_conversations))
        .route(
            "/api/discord/link",
            get(link::link_status)
                .post(link::create_link)
                .delete(link::unlink),
        )
        .route(
            "/api/webhooks/discord",
            post(gateway::webhook).get(gateway::webhook_probe),
        )
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
