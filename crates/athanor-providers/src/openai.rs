//! OpenAI HTTP backend
//!
//! Chat Completions for generation and the embeddings endpoint for
//! vectors. This is the default canonical embedding backend, so its
//! embedding model is what keeps vectors comparable across providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use athanor_config::ProviderConfig;

use crate::http_client::HttpClient;
use crate::types::{
    DEFAULT_EMBEDDING_TIMEOUT, GenerateRequest, GenerateResponse, PROVIDER_OPENAI, Provider,
    ProviderError,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// OpenAI backend configuration and client.
pub struct OpenAiProvider {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    model: String,
    embedding_model: String,
}

impl OpenAiProvider {
    /// Construct from the `providers.openai` config section.
    ///
    /// A missing API key is not an error here; it makes the provider
    /// unavailable, which registry availability filtering surfaces.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Misconfiguration` if the HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key_env = config.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
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
            ProviderError::Unavailable("OpenAI API key not configured".to_string())
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER_OPENAI
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
            provider = PROVIDER_OPENAI,
            model = %self.model,
            temperature = req.temperature,
            max_tokens = req.max_tokens,
            "Invoking OpenAI chat completion"
        );

        let request = reqwest::Client::new()
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, req.timeout, PROVIDER_OPENAI)
            .await?;

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::Transport(format!("failed to parse OpenAI response: {e}"))
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            ProviderError::Transport("OpenAI response contained no choices".to_string())
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
            .execute_with_retry(request, DEFAULT_EMBEDDING_TIMEOUT, PROVIDER_OPENAI)
            .await?;

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            ProviderError::Transport(format!("failed to parse OpenAI embedding response: {e}"))
        })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                ProviderError::Transport("OpenAI returned no embedding data".to_string())
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

    fn provider_without_key() -> OpenAiProvider {
        let config = ProviderConfig {
            api_key_env: Some("OPENAI_KEY_THAT_DOES_NOT_EXIST".to_string()),
            ..ProviderConfig::default()
        };
        OpenAiProvider::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn missing_key_makes_provider_unavailable() {
        let provider = provider_without_key();
        assert!(!provider.is_available().await);
    }

    #[tokio::test]
    async fn generate_without_key_fails_fast() {
        let provider = provider_without_key();
        let result = provider.generate(GenerateRequest::new("sys", "prompt")).await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let provider = provider_without_key();
        assert_eq!(provider.model, DEFAULT_MODEL);
        assert_eq!(provider.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert!(provider.supports_embeddings());
    }
}
