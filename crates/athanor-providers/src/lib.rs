//! LLM provider abstraction for multi-provider support
//!
//! Trait-based backends over HTTP plus an immutable registry with
//! deterministic embedding fallback. The orchestrator works against the
//! [`Provider`] trait and never sees wire formats; which backend serves a
//! phase is purely configuration.

mod anthropic;
pub(crate) mod http_client;
mod ollama;
mod openai;
mod openrouter;
mod registry;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use anthropic::AnthropicProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterProvider;
pub use registry::{ProviderRegistry, RegistryBuilder, RegistryError};
pub use types::{
    DEFAULT_EMBEDDING_TIMEOUT, DEFAULT_GENERATION_TIMEOUT, DEFAULT_OLLAMA_GENERATION_TIMEOUT,
    GenerateRequest, GenerateResponse, PROVIDER_ANTHROPIC, PROVIDER_OLLAMA, PROVIDER_OPENAI,
    PROVIDER_OPENROUTER, Provider, ProviderError,
};

use std::sync::Arc;

use athanor_config::{Config, ProviderConfig};

/// Construct the backend for one named provider.
///
/// Internal helper without fallback logic; unknown names are a
/// configuration error.
fn construct_provider(
    name: &str,
    config: &ProviderConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    match name {
        PROVIDER_OPENAI => Ok(Arc::new(OpenAiProvider::from_config(config)?)),
        PROVIDER_ANTHROPIC => Ok(Arc::new(AnthropicProvider::from_config(config)?)),
        PROVIDER_OPENROUTER => Ok(Arc::new(OpenRouterProvider::from_config(config)?)),
        PROVIDER_OLLAMA => Ok(Arc::new(OllamaProvider::from_config(config)?)),
        unknown => Err(ProviderError::Misconfiguration(format!(
            "unknown provider '{unknown}'. Supported providers: {PROVIDER_OPENAI}, \
             {PROVIDER_ANTHROPIC}, {PROVIDER_OPENROUTER}, {PROVIDER_OLLAMA}."
        ))),
    }
}

/// Build the immutable provider registry from configuration.
///
/// Every entry under `providers` is constructed and registered; the
/// embedding fallback priority comes from `ranking.embedding
/// .fallback_priority`. Registration order follows the priority list
/// first so name listings stay stable.
///
/// # Errors
///
/// Returns `ProviderError::Misconfiguration` for unknown provider names,
/// and propagates registry duplicate errors as misconfiguration.
pub fn registry_from_config(config: &Config) -> Result<ProviderRegistry, ProviderError> {
    let mut builder =
        RegistryBuilder::new().with_embedding_priority(config.ranking.embedding.fallback_priority.clone());

    // Stable construction order: priority list first, then the rest
    // sorted by name.
    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort_unstable();
    let ordered: Vec<&String> = config
        .ranking
        .embedding
        .fallback_priority
        .iter()
        .filter(|n| config.providers.contains_key(*n))
        .chain(names.into_iter().filter(|n| {
            !config.ranking.embedding.fallback_priority.contains(*n)
        }))
        .collect();

    for name in ordered {
        let provider_config = &config.providers[name];
        let provider = construct_provider(name, provider_config)?;
        builder = builder.register(name.clone(), provider).map_err(|e| {
            ProviderError::Misconfiguration(format!("duplicate provider entry: {e}"))
        })?;
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_name_is_rejected() {
        let result = construct_provider("grok", &ProviderConfig::default());
        match result {
            Err(ProviderError::Misconfiguration(msg)) => {
                assert!(msg.contains("grok"), "message should name the provider: {msg}");
            }
            _ => panic!("expected misconfiguration for unknown provider"),
        }
    }

    #[test]
    fn registry_from_config_registers_all_sections() {
        let mut config = Config::default();
        config
            .providers
            .insert(PROVIDER_OPENAI.to_string(), ProviderConfig::default());
        config
            .providers
            .insert(PROVIDER_ANTHROPIC.to_string(), ProviderConfig::default());

        let registry = registry_from_config(&config).unwrap();
        assert_eq!(registry.names(), vec![PROVIDER_ANTHROPIC, PROVIDER_OPENAI]);
    }
}
