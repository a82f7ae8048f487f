//! # Corpus Chat — Library Root
//!
//! Every component lives here as a module; `main.rs` only reads
//! configuration, builds [`web::state::AppState`] via [`build_state`], and
//! serves [`web::create_router`]. Keeping the binary this thin is what lets
//! the integration suite under `tests/` drive the real router with fake
//! embedder/LLM backends instead of a second, parallel test harness.

pub mod chunk;
pub mod config;
pub mod conversation;
pub mod embedder;
pub mod error;
pub mod extract;
pub mod index;
pub mod keywords;
pub mod llm;
pub mod model;
pub mod router;
pub mod web;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::conversation::ConversationStore;
use crate::embedder::{EmbedderConfig, EmbedderGateway};
use crate::index::Corpus;
use crate::llm::{HttpProvider, LlmGateway, LlmProvider, ProviderType};
use crate::web::state::AppState;

/// Wires up the three provider tiers in priority order: local self-hosted
/// first, then hosted provider A, then hosted provider B. A tier whose
/// base URL / API key isn't configured is simply omitted — the gateway
/// degrades gracefully rather than failing to start.
pub fn build_llm_gateway(config: &AppConfig) -> LlmGateway {
    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();

    if config.local_model_base_url.is_some() {
        providers.push(Arc::new(HttpProvider::local(
            config.local_model_base_url.clone(),
            "local-model",
        )));
    }
    if let Some(api_key) = &config.provider_a_api_key {
        providers.push(Arc::new(HttpProvider::hosted(
            ProviderType::HostedA,
            "hosted-a",
            config.provider_a_base_url.as_str(),
            Some(api_key.clone()),
            config.provider_a_model.as_str(),
        )));
    }
    if let (Some(api_key), Some(base_url)) =
        (&config.provider_b_api_key, &config.provider_b_base_url)
    {
        providers.push(Arc::new(HttpProvider::hosted(
            ProviderType::HostedB,
            "hosted-b",
            base_url.as_str(),
            Some(api_key.clone()),
            config.provider_b_model.as_str(),
        )));
    }

    if providers.is_empty() {
        tracing::warn!("no LLM provider configured — chat will respond in degraded mode");
    }

    LlmGateway::new(providers)
}

/// Assembles the full application state from configuration: fresh corpus
/// and conversation stores, a lazily-initialized embedder, and the
/// priority-ordered LLM gateway.
pub fn build_state(config: Arc<AppConfig>) -> AppState {
    let corpus = Arc::new(Corpus::new());
    let conversations = Arc::new(ConversationStore::new());
    let embedder = Arc::new(EmbedderGateway::new(EmbedderConfig {
        repo_id: config.embedder_model.clone(),
        batch_size: config.embed_batch_size,
    }));
    let llm = Arc::new(build_llm_gateway(&config));

    AppState {
        config,
        corpus,
        conversations,
        embedder,
        llm,
    }
}
