//! Ollama local backend
//!
//! Talks to a locally running Ollama server. Availability is a live
//! reachability probe rather than a credential check, and generation gets
//! a longer default timeout because local models are slower than hosted
//! ones.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use athanor_config::ProviderConfig;

use crate::http_client::HttpClient;
use crate::types::{
    DEFAULT_EMBEDDING_TIMEOUT, DEFAULT_OLLAMA_GENERATION_TIMEOUT, GenerateRequest,
    GenerateResponse, PROVIDER_OLLAMA, Provider, ProviderError,
};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3";
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Timeout for the availability probe against `/api/tags`.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Ollama backend configuration and client.
pub struct OllamaProvider {
    client: HttpClient,
    base_url: String,
    model: String,
    embedding_model: String,
    generation_timeout: Duration,
}

impl OllamaProvider {
    /// Construct from the `providers.ollama` config section.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Misconfiguration` if the HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            embedding_model: config
                .embedding_model
                .clone()
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            generation_timeout: config
                .generation_timeout_secs
                .map_or(DEFAULT_OLLAMA_GENERATION_TIMEOUT, Duration::from_secs),
        })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        PROVIDER_OLLAMA
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    fn embedding_model(&self) -> Option<&str> {
        Some(&self.embedding_model)
    }

    async fn is_available(&self) -> bool {
        // A local server has no credentials; reachability is the check.
        let probe = reqwest::Client::new()
            .get(format!("{}/api/tags", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;
        matches!(probe, Ok(response) if response.status().is_success())
    }

    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let body = OllamaGenerateRequest {
            model: self.model.clone(),
            system: req.system_prompt.clone(),
            prompt: req.prompt.clone(),
            stream: false,
            options: OllamaOptions {
                temperature: req.temperature,
                num_predict: req.max_tokens,
            },
        };

        // Callers that left the stock timeout in place get the longer
        // local-model default; explicit timeouts are honored as-is.
        let timeout = if req.timeout == crate::types::DEFAULT_GENERATION_TIMEOUT {
            self.generation_timeout
        } else {
            req.timeout
        };

        debug!(
            provider = PROVIDER_OLLAMA,
            model = %self.model,
            timeout_secs = timeout.as_secs(),
            "Invoking Ollama generation"
        );

        let request = reqwest::Client::new()
            .post(format!("{}/api/generate", self.base_url))
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, timeout, PROVIDER_OLLAMA)
            .await?;

        let parsed: OllamaGenerateResponse = response.json().await.map_err(|e| {
            ProviderError::Transport(format!("failed to parse Ollama response: {e}"))
        })?;

        Ok(GenerateResponse {
            content: parsed.response,
            model: parsed.model,
            tokens_used: parsed.eval_count.unwrap_or(0),
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = OllamaEmbeddingRequest {
            model: self.embedding_model.clone(),
            prompt: text.to_string(),
        };

        let request = reqwest::Client::new()
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, DEFAULT_EMBEDDING_TIMEOUT, PROVIDER_OLLAMA)
            .await?;

        let parsed: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            ProviderError::Transport(format!("failed to parse Ollama embedding response: {e}"))
        })?;

        if parsed.embedding.is_empty() {
            return Err(ProviderError::Transport(
                "Ollama returned an empty embedding".to_string(),
            ));
        }
        Ok(parsed.embedding)
    }
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    system: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    model: String,
    response: String,
    eval_count: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_overrides_generation_timeout() {
        let config = ProviderConfig {
            generation_timeout_secs: Some(600),
            ..ProviderConfig::default()
        };
        let provider = OllamaProvider::from_config(&config).unwrap();
        assert_eq!(provider.generation_timeout, Duration::from_secs(600));
    }

    #[test]
    fn defaults_apply_without_config() {
        let provider = OllamaProvider::from_config(&ProviderConfig::default()).unwrap();
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(provider.model, DEFAULT_MODEL);
        assert_eq!(
            provider.generation_timeout,
            DEFAULT_OLLAMA_GENERATION_TIMEOUT
        );
        assert!(provider.supports_embeddings());
    }
}
