//! Provider registry: lookup, availability filtering, embedding fallback
//!
//! The registry is built once at startup through [`RegistryBuilder`] and
//! is immutable afterwards, so the hot read path needs no locking.
//! Embedding fallback scans an explicit priority list rather than map
//! iteration order, keeping provider selection deterministic.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use athanor_models::{Phase, PhaseConfig};

use crate::types::Provider;

/// Errors from registry construction and lookup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("provider '{0}' already registered")]
    AlreadyRegistered(String),

    #[error("provider '{0}' not found")]
    NotFound(String),

    #[error("no provider configured for phase '{0}'")]
    NoProviderForPhase(Phase),
}

/// Collects providers during startup; [`RegistryBuilder::build`] freezes
/// them into an immutable [`ProviderRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    providers: HashMap<String, Arc<dyn Provider>>,
    // Registration order doubles as the default embedding priority.
    order: Vec<String>,
    embedding_priority: Option<Vec<String>>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under `name`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::AlreadyRegistered` when the name is taken.
    pub fn register(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn Provider>,
    ) -> Result<Self, RegistryError> {
        let name = name.into();
        if self.providers.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        debug!(provider = %name, "Registering provider");
        self.order.push(name.clone());
        self.providers.insert(name, provider);
        Ok(self)
    }

    /// Set the explicit provider order scanned during embedding fallback.
    #[must_use]
    pub fn with_embedding_priority(mut self, priority: Vec<String>) -> Self {
        self.embedding_priority = Some(priority);
        self
    }

    /// Freeze into an immutable registry.
    #[must_use]
    pub fn build(self) -> ProviderRegistry {
        let embedding_priority = self.embedding_priority.unwrap_or_else(|| self.order.clone());
        info!(
            providers = self.order.len(),
            priority = ?embedding_priority,
            "Provider registry built"
        );
        ProviderRegistry {
            providers: self.providers,
            embedding_priority,
        }
    }
}

/// Immutable set of named providers.
///
/// Built once during startup and read-only for the lifetime of the
/// process; orchestration code holds it behind an `Arc` and queries it
/// without synchronization.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
    embedding_priority: Vec<String>,
}

impl ProviderRegistry {
    /// Look up a provider by name.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` when the name is unknown.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, RegistryError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Names of all registered providers, sorted for stable output.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The configured embedding fallback scan order.
    #[must_use]
    pub fn embedding_priority(&self) -> &[String] {
        &self.embedding_priority
    }

    /// Providers whose availability check currently passes.
    pub async fn list_available(&self) -> Vec<String> {
        let mut available = Vec::new();
        for name in &self.embedding_priority {
            if let Ok(provider) = self.get(name)
                && provider.is_available().await
            {
                available.push(name.clone());
            }
        }
        // Providers outside the priority list still count as available.
        let mut rest: Vec<&String> = self
            .providers
            .keys()
            .filter(|k| !self.embedding_priority.contains(*k))
            .collect();
        rest.sort_unstable();
        for name in rest {
            if let Ok(provider) = self.get(name)
                && provider.is_available().await
            {
                available.push(name.clone());
            }
        }
        available
    }

    /// Resolve the provider for a phase: request overrides win over the
    /// configured defaults.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NoProviderForPhase` when neither an
    /// override nor a default names a provider for `phase`, and
    /// `RegistryError::NotFound` when the named provider is not
    /// registered.
    pub fn provider_for_phase(
        &self,
        configs: &[PhaseConfig],
        overrides: &HashMap<Phase, String>,
        phase: Phase,
    ) -> Result<Arc<dyn Provider>, RegistryError> {
        if let Some(name) = overrides.get(&phase) {
            return self.get(name);
        }
        for config in configs {
            if config.phase == phase {
                return self.get(&config.provider);
            }
        }
        warn!(phase = %phase, "No provider configured for phase");
        Err(RegistryError::NoProviderForPhase(phase))
    }

    /// Resolve the provider that embeds on behalf of `primary`.
    ///
    /// If the primary provider embeds, it is used directly. Otherwise the
    /// priority list is scanned in order for an available
    /// embedding-capable provider. When none qualifies the primary is
    /// returned unchanged so the caller fails loudly on the embedding
    /// call instead of silently producing no vector.
    pub async fn embedding_provider(&self, primary: Arc<dyn Provider>) -> Arc<dyn Provider> {
        if primary.supports_embeddings() {
            debug!(provider = primary.name(), "Primary provider embeds");
            return primary;
        }

        for name in &self.embedding_priority {
            let Ok(candidate) = self.get(name) else {
                continue;
            };
            if candidate.supports_embeddings() && candidate.is_available().await {
                info!(
                    primary = primary.name(),
                    fallback = candidate.name(),
                    "Using fallback embedding provider"
                );
                return candidate;
            }
        }

        warn!(
            provider = primary.name(),
            "No embedding-capable provider available, returning primary"
        );
        primary
    }
}
