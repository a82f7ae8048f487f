//! # LLM Gateway (C9)
//!
//! A uniform interface over multiple chat-completion providers:
//! `complete(system, history, user, params)`, `available_providers()`,
//! `set_active(provider_id)`, and graceful degradation to a "no backend
//! available" signal instead of a hard error when nothing is reachable.

pub mod http_provider;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::model::Message;

pub use http_provider::HttpProvider;

const HISTORY_LIMIT: usize = 6;

/// One provider's identity and where it sits in the fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Local,
    HostedA,
    HostedB,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderType::Local => "local",
            ProviderType::HostedA => "hosted-a",
            ProviderType::HostedB => "hosted-b",
        };
        write!(f, "{s}")
    }
}

/// Sampling parameters for a single completion request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A single chat-completion backend. Implementations decide for themselves
/// whether they're currently reachable (credentials present, host up).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn provider_type(&self) -> ProviderType;
    fn name(&self) -> &str;
    /// Whether this provider can currently construct a request: credentials
    /// present and, where checkable cheaply, the host configured.
    fn is_available(&self) -> bool;
    async fn complete(
        &self,
        system: &str,
        history: &[Message],
        user: &str,
        params: CompletionParams,
    ) -> anyhow::Result<String>;
}

const GROUNDED_SYSTEM_PROMPT: &str = "You are a careful research assistant. Answer only using the provided source excerpts. Cite sources by their bracketed number. If the excerpts do not contain the answer, say so plainly rather than inventing one. Be concise.";

const OPEN_SYSTEM_PROMPT: &str =
    "You are a helpful, knowledgeable assistant. Answer from your general knowledge, clearly and concisely.";

pub fn grounded_system_prompt() -> &'static str {
    GROUNDED_SYSTEM_PROMPT
}

pub fn open_system_prompt() -> &'static str {
    OPEN_SYSTEM_PROMPT
}

/// Truncate history to the most recent [`HISTORY_LIMIT`] messages —
/// always applied before a provider ever sees it.
pub fn truncate_history(history: &[Message]) -> &[Message] {
    let start = history.len().saturating_sub(HISTORY_LIMIT);
    &history[start..]
}

/// Uniform gateway over every configured provider, preference-ordered.
/// `set_active` pins the gateway to one provider id; `None` (the default)
/// means "pick the first available by priority order" on every call.
pub struct LlmGateway {
    providers: Vec<Arc<dyn LlmProvider>>,
    active: RwLock<Option<ProviderType>>,
}

impl LlmGateway {
    /// Providers must already be given in priority order: local
    /// self-hosted first, then hosted provider A, then hosted provider B.
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self {
            providers,
            active: RwLock::new(None),
        }
    }

    /// Providers the gateway could currently route to, in priority order.
    pub fn available_providers(&self) -> Vec<ProviderType> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.provider_type())
            .collect()
    }

    pub fn set_active(&self, provider_id: Option<ProviderType>) {
        *self.active.write() = provider_id;
    }

    pub fn active(&self) -> Option<ProviderType> {
        *self.active.read()
    }

    fn pick(&self) -> Option<Arc<dyn LlmProvider>> {
        if let Some(active) = *self.active.read() {
            if let Some(p) = self
                .providers
                .iter()
                .find(|p| p.provider_type() == active && p.is_available())
            {
                return Some(p.clone());
            }
        }
        self.providers.iter().find(|p| p.is_available()).cloned()
    }

    /// Runs a completion against the first available provider. Returns
    /// `Ok(None)` (degraded mode) rather than an error when nothing is
    /// available — "no backend" is a routing signal, not a failure.
    pub async fn complete(
        &self,
        system: &str,
        history: &[Message],
        user: &str,
        params: CompletionParams,
    ) -> anyhow::Result<Option<String>> {
        let Some(provider) = self.pick() else {
            tracing::warn!("no llm provider available, returning degraded mode");
            return Ok(None);
        };
        let trimmed = truncate_history(history);
        let text = provider.complete(system, trimmed, user, params).await?;
        Ok(Some(text))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use async_trait::async_trait;

    /// Always-available canned-response provider, for router tests.
    pub struct FakeProvider {
        pub provider_type: ProviderType,
        pub available: bool,
        pub response: String,
    }

    #[async_trait]
    impl LlmProvider for FakeProvider {
        fn provider_type(&self) -> ProviderType {
            self.provider_type
        }
        fn name(&self) -> &str {
            "fake"
        }
        fn is_available(&self) -> bool {
            self.available
        }
        async fn complete(
            &self,
            _system: &str,
            _history: &[Message],
            _user: &str,
            _params: CompletionParams,
        ) -> anyhow::Result<String> {
            Ok(self.response.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeProvider;
    use super::*;

    fn params() -> CompletionParams {
        CompletionParams {
            temperature: 0.3,
            max_tokens: 512,
        }
    }

    #[tokio::test]
    async fn degrades_when_nothing_available() {
        let gateway = LlmGateway::new(vec![Arc::new(FakeProvider {
            provider_type: ProviderType::Local,
            available: false,
            response: "unused".to_string(),
        })]);
        let result = gateway.complete("sys", &[], "hi", params()).await.unwrap();
        assert!(result.is_none());
        assert!(gateway.available_providers().is_empty());
    }

    #[tokio::test]
    async fn picks_first_available_by_priority() {
        let gateway = LlmGateway::new(vec![
            Arc::new(FakeProvider {
                provider_type: ProviderType::Local,
                available: false,
                response: "local".to_string(),
            }),
            Arc::new(FakeProvider {
                provider_type: ProviderType::HostedA,
                available: true,
                response: "hosted-a".to_string(),
            }),
        ]);
        let result = gateway.complete("sys", &[], "hi", params()).await.unwrap();
        assert_eq!(result.unwrap(), "hosted-a");
    }

    #[tokio::test]
    async fn set_active_pins_provider() {
        let gateway = LlmGateway::new(vec![
            Arc::new(FakeProvider {
                provider_type: ProviderType::HostedA,
                available: true,
                response: "a".to_string(),
            }),
            Arc::new(FakeProvider {
                provider_type: ProviderType::HostedB,
                available: true,
                response: "b".to_string(),
            }),
        ]);
        gateway.set_active(Some(ProviderType::HostedB));
        let result = gateway.complete("sys", &[], "hi", params()).await.unwrap();
        assert_eq!(result.unwrap(), "b");
    }

    #[test]
    fn history_truncation_keeps_most_recent_six() {
        let history: Vec<Message> = (0..10)
            .map(|i| Message {
                role: crate::model::Role::User,
                content: format!("m{i}"),
                timestamp: chrono::Utc::now(),
                mode: None,
                sources: None,
            })
            .collect();
        let truncated = truncate_history(&history);
        assert_eq!(truncated.len(), 6);
        assert_eq!(truncated[0].content, "m4");
    }
}
