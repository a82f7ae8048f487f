//! Shared Axum application state: a small `Clone` struct of `Arc`-wrapped
//! shared resources passed into every handler via `axum::extract::State`.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::conversation::ConversationStore;
use crate::embedder::EmbedderGateway;
use crate::index::Corpus;
use crate::llm::LlmGateway;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub corpus: Arc<Corpus>,
    pub conversations: Arc<ConversationStore>,
    pub embedder: Arc<EmbedderGateway>,
    pub llm: Arc<LlmGateway>,
}
