//! Concrete HTTP-backed [`LlmProvider`] implementations.
//!
//! Both the local self-hosted provider and the two hosted providers speak
//! an OpenAI-compatible chat-completions wire format, so one struct covers
//! all three — only the base URL, auth header, and "is this provider even
//! configured" check differ.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CompletionParams, LlmProvider, ProviderType};
use crate::model::{Message, Role};

/// An OpenAI-compatible chat-completions endpoint.
pub struct HttpProvider {
    provider_type: ProviderType,
    name: String,
    base_url: Option<String>,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl HttpProvider {
    /// A local, self-hosted server (e.g. an Ollama-compatible endpoint).
    /// Available whenever a base URL is configured — no API key required.
    pub fn local(base_url: Option<String>, model: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::Local,
            name: "local".to_string(),
            base_url,
            api_key: None,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// A hosted provider gated on an API key being present.
    pub fn hosted(
        provider_type: ProviderType,
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider_type,
            name: name.into(),
            base_url: Some(base_url.into()),
            api_key,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        match self.provider_type {
            ProviderType::Local => self.base_url.is_some(),
            ProviderType::HostedA | ProviderType::HostedB => {
                self.base_url.is_some() && self.api_key.is_some()
            }
        }
    }

    async fn complete(
        &self,
        system: &str,
        history: &[Message],
        user: &str,
        params: CompletionParams,
    ) -> anyhow::Result<String> {
        let base_url = self
            .base_url
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("{} has no base url configured", self.name))?;

        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        }];
        for m in history {
            messages.push(ChatMessage {
                role: role_str(m.role).to_string(),
                content: m.content.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user.to_string(),
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let mut request = self
            .client
            .post(format!("{base_url}/chat/completions"))
            .json(&body)
            .timeout(std::time::Duration::from_secs(60));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let parsed: ChatResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("{} returned no choices", self.name))?;
        Ok(text)
    }
}
