//! OpenRouter HTTP backend
//!
//! OpenAI-compatible chat completions over the OpenRouter gateway.
//! Embeddings are proxied to OpenAI models through the same gateway, so
//! this backend counts as embedding-capable for fallback purposes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use athanor_config::ProviderConfig;

use crate::http_client::HttpClient;
use crate::types::{
    DEFAULT_EMBEDDING_TIMEOUT, GenerateRequest, GenerateResponse, PROVIDER_OPENROUTER, Provider,
    ProviderError,
};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "openrouter/auto";
const DEFAULT_EMBEDDING_MODEL: &str = "openai/text-embedding-3-small";

/// OpenRouter backend configuration and client.
pub struct OpenRouterProvider {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    model: String,
    embedding_model: String,
}

impl OpenRouterProvider {
    /// Construct from the `providers.openrouter` config section.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Misconfiguration` if the HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key_env = config
            .api_key_env
            .as_deref()
            .unwrap_or("OPENROUTER_API_KEY");
        let api_key = std::env::var(api_key_env).ok();

        Ok(Self {
            client: HttpClient::new()?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            embedding_model: config
                .embedding_model
                .clone()
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::Unavailable("OpenRouter API key not configured".to_string())
        })
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn name(&self) -> &str {
        PROVIDER_OPENROUTER
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    fn embedding_model(&self) -> Option<&str> {
        Some(&self.embedding_model)
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let api_key = self.api_key()?;

        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: req.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: req.prompt.clone(),
                },
            ],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        debug!(
            provider = PROVIDER_OPENROUTER,
            model = %self.model,
            "Invoking OpenRouter chat completion"
        );

        let request = reqwest::Client::new()
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, req.timeout, PROVIDER_OPENROUTER)
            .await?;

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::Transport(format!("failed to parse OpenRouter response: {e}"))
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            ProviderError::Transport("OpenRouter response contained no choices".to_string())
        })?;

        Ok(GenerateResponse {
            content: choice.message.content,
            model: parsed.model,
            tokens_used: parsed.usage.map_or(0, |u| u.total_tokens),
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let api_key = self.api_key()?;

        let body = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: vec![text.to_string()],
        };

        let request = reqwest::Client::new()
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, DEFAULT_EMBEDDING_TIMEOUT, PROVIDER_OPENROUTER)
            .await?;

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            ProviderError::Transport(format!("failed to parse OpenRouter embedding response: {e}"))
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                ProviderError::Transport("OpenRouter returned no embedding data".to_string())
            })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_makes_provider_unavailable() {
        let config = ProviderConfig {
            api_key_env: Some("OPENROUTER_KEY_THAT_DOES_NOT_EXIST".to_string()),
            ..ProviderConfig::default()
        };
        let provider = OpenRouterProvider::from_config(&config).unwrap();
        assert!(!provider.is_available().await);
        assert!(provider.supports_embeddings());
    }
}
