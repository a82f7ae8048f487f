//! # Configuration — Environment-Backed Settings
//!
//! All tunables are read from environment variables with defaults matching
//! the documented values. There is no config file format here (unlike a
//! TOML/YAML-driven agent config) because every value the service needs is
//! small enough to live directly in the process environment, the way a
//! container deployment would set it.

use std::env;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Chunking, retrieval, and routing knobs shared across the crate.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port the HTTP server binds to.
    pub port: u16,
    /// HuggingFace repo id used by the embedding backend.
    pub embedder_model: String,
    /// Chat model id surfaced by `/models` and used unless overridden.
    pub default_model: String,
    /// Target chunk size in characters (C2).
    pub chunk_size: usize,
    /// Overlap in characters between consecutive chunks (C2).
    pub chunk_overlap: usize,
    /// Max concurrent embed requests per batch (C4).
    pub embed_batch_size: usize,
    /// Minimum combined score for a chunk to count as relevant (C7).
    pub relevance_threshold: f32,
    /// Lower-bound threshold used only when the primary pass yields nothing (C7).
    pub fallback_threshold: f32,
    /// Top-k passed to hybrid search during grounded retrieval (C7).
    pub retrieval_k: usize,
    /// Max chunks kept from the fallback pass (C7).
    pub fallback_k: usize,
    /// Trailing history messages included in the prompt (C7/C9).
    pub history_window: usize,
    /// Root API URL of a local, self-hosted model server (no trailing
    /// `/chat/completions`), if reachable.
    pub local_model_base_url: Option<String>,
    /// API key for hosted provider A.
    pub provider_a_api_key: Option<String>,
    /// Root API URL for hosted provider A. Must speak the OpenAI-compatible
    /// `{base_url}/chat/completions` wire shape (see
    /// [`crate::llm::http_provider`]). Defaults to OpenAI's own endpoint,
    /// which does.
    pub provider_a_base_url: String,
    /// Chat model id sent to hosted provider A.
    pub provider_a_model: String,
    /// API key for hosted provider B.
    pub provider_b_api_key: Option<String>,
    /// Root API URL for hosted provider B, same wire-shape requirement as
    /// `provider_a_base_url`. No default: unlike provider A, there's no
    /// universally-safe OpenAI-compatible endpoint to assume, so the
    /// provider is only wired up when this is explicitly set.
    pub provider_b_base_url: Option<String>,
    /// Chat model id sent to hosted provider B.
    pub provider_b_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            embedder_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            default_model: "local".to_string(),
            chunk_size: 800,
            chunk_overlap: 200,
            embed_batch_size: 20,
            relevance_threshold: 0.15,
            fallback_threshold: 0.10,
            retrieval_k: 8,
            fallback_k: 5,
            history_window: 6,
            local_model_base_url: None,
            provider_a_api_key: None,
            provider_a_base_url: "https://api.openai.com/v1".to_string(),
            provider_a_model: "gpt-4o-mini".to_string(),
            provider_b_api_key: None,
            provider_b_base_url: None,
            provider_b_model: "default".to_string(),
        }
    }
}

impl AppConfig {
    /// Build a config from the process environment, falling back to the
    /// documented defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_or("PORT", defaults.port),
            embedder_model: env_string_or("EMBEDDER_MODEL", &defaults.embedder_model),
            default_model: env_string_or("DEFAULT_MODEL", &defaults.default_model),
            chunk_size: env_or("CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_or("CHUNK_OVERLAP", defaults.chunk_overlap),
            embed_batch_size: env_or("EMBED_BATCH_SIZE", defaults.embed_batch_size),
            relevance_threshold: env_or("RELEVANCE_THRESHOLD", defaults.relevance_threshold),
            fallback_threshold: env_or("FALLBACK_THRESHOLD", defaults.fallback_threshold),
            retrieval_k: env_or("RETRIEVAL_K", defaults.retrieval_k),
            fallback_k: env_or("FALLBACK_K", defaults.fallback_k),
            history_window: env_or("HISTORY_WINDOW", defaults.history_window),
            local_model_base_url: env::var("LOCAL_MODEL_BASE_URL").ok(),
            provider_a_api_key: env::var("PROVIDER_A_API_KEY").ok(),
            provider_a_base_url: env_string_or("PROVIDER_A_BASE_URL", &defaults.provider_a_base_url),
            provider_a_model: env_string_or("PROVIDER_A_MODEL", &defaults.provider_a_model),
            provider_b_api_key: env::var("PROVIDER_B_API_KEY").ok(),
            provider_b_base_url: env::var("PROVIDER_B_BASE_URL").ok(),
            provider_b_model: env_string_or("PROVIDER_B_MODEL", &defaults.provider_b_model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.chunk_size, 800);
        assert_eq!(cfg.chunk_overlap, 200);
        assert_eq!(cfg.embed_batch_size, 20);
        assert!((cfg.relevance_threshold - 0.15).abs() < 1e-6);
        assert!((cfg.fallback_threshold - 0.10).abs() < 1e-6);
        assert_eq!(cfg.retrieval_k, 8);
        assert_eq!(cfg.fallback_k, 5);
        assert_eq!(cfg.history_window, 6);
    }
}
