mod config;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod routes;
mod screening;
mod state;
mod timing;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::FileTextExtractor;
use crate::llm_client::LlmClient;
use crate::routes::{build_router, cors_layer};
use crate::screening::{BatchProcessor, ScoringEngine};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed numeric env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;
    info!("Upload directory: {}", config.upload_dir.display());

    // Initialize judgment service client
    let llm = LlmClient::new(config.llm_settings())?;
    info!(
        "LLM client initialized (host: {}, model: {})",
        config.ollama_host,
        llm.model()
    );

    let engine = ScoringEngine::new(Arc::new(llm), config.scoring_limits());
    let batch_options = config.batch_options();
    info!(
        "Batch options: {} concurrent files, {:?} per file",
        batch_options.max_concurrent_files, batch_options.file_timeout
    );
    let processor = BatchProcessor::new(Arc::new(FileTextExtractor), engine, batch_options);

    // Build app state
    let state = AppState {
        config: config.clone(),
        processor,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
