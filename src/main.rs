//! # Corpus Chat — Entry Point
//!
//! Reads configuration, builds application state via
//! [`corpus_chat::build_state`], and serves the HTTP API.
//!
//! The server accepts connections the instant it binds. The embedder is
//! wrapped in its own single-flight `OnceCell` (see
//! [`corpus_chat::embedder::EmbedderGateway`]), so the first request that
//! actually needs embeddings pays the model-load cost once; every request
//! after that reuses the already-initialized backend.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use corpus_chat::config::AppConfig;
use corpus_chat::{build_state, web};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("corpus-chat starting");

    let config = Arc::new(AppConfig::from_env());
    let port = config.port;
    let state = build_state(config);
    let app = web::create_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
