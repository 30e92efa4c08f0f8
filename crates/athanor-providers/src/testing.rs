//! Scripted stub provider for tests
//!
//! Lets tests exercise the registry, the orchestrator, and ranking
//! without network access or API keys. The stub can be configured to
//! embed or not, to report itself unavailable, and to fail on specific
//! invocations.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::types::{GenerateRequest, GenerateResponse, Provider, ProviderError};

/// Deterministic scripted provider.
///
/// Generation responses echo a counter so tests can tell invocations
/// apart; embeddings hash the input into a fixed-dimension vector so
/// identical text always embeds identically.
pub struct StubProvider {
    name: String,
    supports_embeddings: bool,
    available: bool,
    tokens_per_response: u32,
    calls: AtomicUsize,
    // Invocation indices (0-based, across all generate calls) that fail.
    fail_on_calls: Mutex<Vec<usize>>,
    canned_response: Option<String>,
}

impl StubProvider {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supports_embeddings: false,
            available: true,
            tokens_per_response: 64,
            calls: AtomicUsize::new(0),
            fail_on_calls: Mutex::new(Vec::new()),
            canned_response: None,
        }
    }

    /// Make the stub embedding-capable.
    #[must_use]
    pub fn with_embeddings(mut self) -> Self {
        self.supports_embeddings = true;
        self
    }

    /// Make the availability check fail.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Report this many tokens used per generation.
    #[must_use]
    pub fn with_tokens_per_response(mut self, tokens: u32) -> Self {
        self.tokens_per_response = tokens;
        self
    }

    /// Always return this content instead of the synthesized default.
    #[must_use]
    pub fn with_canned_response(mut self, content: impl Into<String>) -> Self {
        self.canned_response = Some(content.into());
        self
    }

    /// Fail the nth generate call (0-based, counted across the stub's
    /// lifetime).
    #[must_use]
    pub fn failing_on_call(self, index: usize) -> Self {
        self.fail_on_calls
            .lock()
            .expect("stub lock poisoned")
            .push(index);
        self
    }

    /// Number of generate calls made so far.
    #[must_use]
    pub fn generate_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    fn embedding_model(&self) -> Option<&str> {
        self.supports_embeddings.then_some("stub-embed-32")
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.available {
            return Err(ProviderError::Unavailable(format!(
                "stub '{}' is offline",
                self.name
            )));
        }

        let should_fail = self
            .fail_on_calls
            .lock()
            .expect("stub lock poisoned")
            .contains(&call);
        if should_fail {
            return Err(ProviderError::Transport(format!(
                "stub '{}' scripted failure on call {call}",
                self.name
            )));
        }

        let content = self.canned_response.clone().unwrap_or_else(|| {
            format!(
                "[{}#{call}] refined: {}",
                self.name,
                req.prompt.chars().take(120).collect::<String>()
            )
        });

        Ok(GenerateResponse {
            content,
            model: format!("{}-stub", self.name),
            tokens_used: self.tokens_per_response,
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if !self.supports_embeddings {
            return Err(ProviderError::EmbeddingUnsupported {
                provider: self.name.clone(),
            });
        }
        Ok(deterministic_embedding(text))
    }
}

/// Hash the text into a stable 32-dimension unit-ish vector.
#[must_use]
pub fn deterministic_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; 32];
    for (i, byte) in text.bytes().enumerate() {
        vector[i % 32] += f32::from(byte) / 255.0;
    }
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_failure_hits_exact_call() {
        let stub = StubProvider::new("s").failing_on_call(1);
        let req = GenerateRequest::new("sys", "p");

        assert!(stub.generate(req.clone()).await.is_ok());
        assert!(stub.generate(req.clone()).await.is_err());
        assert!(stub.generate(req).await.is_ok());
        assert_eq!(stub.generate_calls(), 3);
    }

    #[tokio::test]
    async fn embedding_is_deterministic() {
        let stub = StubProvider::new("s").with_embeddings();
        let a = stub.embed("same text").await.unwrap();
        let b = stub.embed("same text").await.unwrap();
        let c = stub.embed("different text").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }
}
