//! quorum-server - multi-analyzer code review service
//!
//! Streams per-analyzer review verdicts over SSE, persists review sessions
//! for follow-up discussion, and bridges deferred chat-platform commands.

use anyhow::Result;
use clap::Parser;
use quorum_server::analyzer::llm::LlmClient;
use quorum_server::analyzer::ReviewPanel;
use quorum_server::config::Config;
use quorum_server::{build_router, db, AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting quorum-server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::parse();

    let pool = db::connect(&config.db_path).await?;
    info!("Connected to conversation store at {}", config.db_path.display());

    // One panel and one responder for the life of the process
    let llm = LlmClient::new(&config.llm_api_base, &config.llm_api_key, &config.llm_model)?;
    let responder = Arc::new(LlmClient::new(
        &config.llm_api_base,
        &config.llm_api_key,
        &config.llm_model,
    )?);
    let panel = Arc::new(ReviewPanel::standard(llm));
    info!("Analyzer panel ready ({} agents)", panel.len());

    if config.discord_public_key.is_none() {
        info!("Discord public key not configured; webhook gateway disabled");
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(pool, panel, responder, config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("quorum-server listening on http://{bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
