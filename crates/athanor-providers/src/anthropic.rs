//! Anthropic HTTP backend
//!
//! Messages API for generation. Anthropic has no native embedding
//! endpoint, so embedding requests for prompts generated here are routed
//! through the registry's fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use athanor_config::ProviderConfig;

use crate::http_client::HttpClient;
use crate::types::{
    GenerateRequest, GenerateResponse, PROVIDER_ANTHROPIC, Provider, ProviderError,
};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic backend configuration and client.
pub struct AnthropicProvider {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl AnthropicProvider {
    /// Construct from the `providers.anthropic` config section.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Misconfiguration` if the HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key_env = config
            .api_key_env
            .as_deref()
            .unwrap_or("ANTHROPIC_API_KEY");
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
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        PROVIDER_ANTHROPIC
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::Unavailable("Anthropic API key not configured".to_string())
        })?;

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            system: Some(req.system_prompt.clone()),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: req.prompt.clone(),
            }],
        };

        debug!(
            provider = PROVIDER_ANTHROPIC,
            model = %self.model,
            max_tokens = req.max_tokens,
            temperature = req.temperature,
            timeout_secs = req.timeout.as_secs(),
            "Invoking Anthropic backend"
        );

        let request = reqwest::Client::new()
            .post(&self.base_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, req.timeout, PROVIDER_ANTHROPIC)
            .await?;

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            ProviderError::Transport(format!("failed to parse Anthropic response: {e}"))
        })?;

        // Concatenate the text blocks; tool/other block types are ignored.
        let content: String = parsed
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if content.is_empty() {
            return Err(ProviderError::Transport(
                "Anthropic response missing text content".to_string(),
            ));
        }

        let tokens_used = parsed
            .usage
            .map_or(0, |u| u.input_tokens + u.output_tokens);

        Ok(GenerateResponse {
            content,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            tokens_used,
        })
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: Option<String>,
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_makes_provider_unavailable() {
        let config = ProviderConfig {
            api_key_env: Some("ANTHROPIC_KEY_THAT_DOES_NOT_EXIST".to_string()),
            ..ProviderConfig::default()
        };
        let provider = AnthropicProvider::from_config(&config).unwrap();
        assert!(!provider.is_available().await);
        assert!(!provider.supports_embeddings());
    }

    #[tokio::test]
    async fn embed_is_unsupported() {
        let config = ProviderConfig::default();
        let provider = AnthropicProvider::from_config(&config).unwrap();
        let result = provider.embed("text").await;
        assert!(matches!(
            result,
            Err(ProviderError::EmbeddingUnsupported { .. })
        ));
    }
}
