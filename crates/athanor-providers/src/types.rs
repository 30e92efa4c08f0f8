//! Core types for the provider abstraction

use std::time::Duration;

use async_trait::async_trait;

/// Canonical provider names.
pub const PROVIDER_OPENAI: &str = "openai";
pub const PROVIDER_ANTHROPIC: &str = "anthropic";
pub const PROVIDER_OPENROUTER: &str = "openrouter";
pub const PROVIDER_OLLAMA: &str = "ollama";

/// Default timeout for one generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Local models are slower; ollama generation gets a longer default.
pub const DEFAULT_OLLAMA_GENERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Embedding calls are expected to be fast.
pub const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors surfaced by provider backends.
///
/// Transient errors are not retried above the transport layer: the HTTP
/// client retries 5xx and network failures internally, and everything
/// else is the caller's decision.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Credentials missing or the backend is unreachable.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected our credentials.
    #[error("provider authentication failed: {0}")]
    Auth(String),

    /// The backend throttled us.
    #[error("provider rate limited: {0}")]
    RateLimited(String),

    /// The call exceeded its deadline.
    #[error("provider call timed out after {}s", duration.as_secs())]
    Timeout { duration: Duration },

    /// Network or protocol failure.
    #[error("provider transport error: {0}")]
    Transport(String),

    /// Invalid provider configuration.
    #[error("provider misconfigured: {0}")]
    Misconfiguration(String),

    /// The provider cannot produce embeddings.
    #[error("provider '{provider}' does not support embeddings")]
    EmbeddingUnsupported { provider: String },
}

/// A generation request as seen by one provider backend.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// System prompt framing the task.
    pub system_prompt: String,
    /// The prompt content itself.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Output token budget.
    pub max_tokens: u32,
    /// Deadline for the call.
    pub timeout: Duration,
}

impl GenerateRequest {
    /// Build a request with the default generation timeout.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the output token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the call deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A completed generation.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// Generated text.
    pub content: String,
    /// Model the backend reports having used.
    pub model: String,
    /// Tokens consumed, as reported by the backend (0 when unknown).
    pub tokens_used: u32,
}

/// Interface implemented by every LLM backend.
///
/// The orchestrator and the ranking engine treat providers uniformly
/// through this trait; which concrete backend serves a phase is purely a
/// configuration decision.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable provider name used in configuration and candidate metadata.
    fn name(&self) -> &str;

    /// Whether this backend can produce embedding vectors.
    fn supports_embeddings(&self) -> bool {
        false
    }

    /// Whether this backend is currently usable. Cloud providers check
    /// credential presence; local providers probe reachability.
    async fn is_available(&self) -> bool;

    /// Generate text for the given request.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` for auth, quota, timeout, and transport
    /// failures.
    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, ProviderError>;

    /// Produce an embedding vector for `text`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::EmbeddingUnsupported` unless the backend
    /// overrides this; capability gaps are resolved by the registry's
    /// fallback, not here.
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::EmbeddingUnsupported {
            provider: self.name().to_string(),
        })
    }

    /// Model used for embeddings, when the backend embeds.
    fn embedding_model(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_overrides() {
        let req = GenerateRequest::new("system", "prompt")
            .with_temperature(0.2)
            .with_max_tokens(512)
            .with_timeout(Duration::from_secs(30));
        assert_eq!(req.temperature, 0.2);
        assert_eq!(req.max_tokens, 512);
        assert_eq!(req.timeout, Duration::from_secs(30));
    }

    #[test]
    fn timeout_error_reports_seconds() {
        let err = ProviderError::Timeout {
            duration: Duration::from_secs(120),
        };
        assert_eq!(err.to_string(), "provider call timed out after 120s");
    }
}
