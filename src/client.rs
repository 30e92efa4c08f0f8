//! The athanor facade: one object wiring registry, engine, ranking,
//! storage, and training
//!
//! Transports (CLI today, HTTP tomorrow) construct an [`AthanorClient`]
//! once at startup and call [`AthanorClient::generate`] per request and
//! [`AthanorClient::run_training`] on a schedule. The provider registry
//! is immutable after construction; the ranking weight snapshot is the
//! only state that changes between requests, and only through the
//! trainer's copy-on-write publish.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use athanor_config::Config;
use athanor_engine::{EngineOptions, PhaseEngine};
use athanor_learning::{Trainer, TrainerParams};
use athanor_models::{
    GenerationRequest, GenerationResult, Interaction, InteractionAction, Prompt, TrainingRun,
};
use athanor_providers::{ProviderRegistry, registry_from_config};
use athanor_ranking::{HistoryIndex, RankingEngine, WeightStore};
use athanor_storage::{FileStorage, MemoryStorage, Storage};

use crate::error::AthanorError;

/// Availability and capability summary of one provider, for listings.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub available: bool,
    pub supports_embeddings: bool,
}

/// Facade over the full generation and training pipeline.
pub struct AthanorClient {
    config: Config,
    registry: Arc<ProviderRegistry>,
    engine: PhaseEngine,
    weight_store: Arc<WeightStore>,
    storage: Arc<dyn Storage>,
}

impl AthanorClient {
    /// Build the client from configuration: providers from the
    /// `providers` section, storage from `data_dir` (in-memory when
    /// unset), and the initial weight snapshot from storage when one was
    /// persisted, falling back to `ranking.weights`.
    ///
    /// # Errors
    ///
    /// Returns `AthanorError` for invalid provider configuration or an
    /// unreadable data directory.
    pub fn from_config(config: Config) -> Result<Self, AthanorError> {
        let registry = Arc::new(registry_from_config(&config)?);
        let storage: Arc<dyn Storage> = match &config.data_dir {
            Some(dir) => Arc::new(FileStorage::open(dir)?),
            None => Arc::new(MemoryStorage::new()),
        };
        Self::new(config, registry, storage)
    }

    /// Build the client with an explicit registry and storage.
    ///
    /// # Errors
    ///
    /// Returns `AthanorError::Storage` when the persisted weight
    /// snapshot cannot be read.
    pub fn new(
        config: Config,
        registry: Arc<ProviderRegistry>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, AthanorError> {
        let initial_weights = match storage.load_weights()? {
            Some(snapshot) => {
                info!(updated_at = %snapshot.updated_at, "Loaded persisted ranking weights");
                snapshot.weights
            }
            None => config.ranking.weights,
        };
        let weight_store = Arc::new(WeightStore::new(initial_weights));

        let engine = PhaseEngine::new(Arc::clone(&registry), EngineOptions::from_config(&config));

        Ok(Self {
            config,
            registry,
            engine,
            weight_store,
            storage,
        })
    }

    /// The loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The provider registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// The live ranking weight snapshot.
    #[must_use]
    pub fn current_weights(&self) -> athanor_models::RankingWeights {
        *self.weight_store.snapshot()
    }

    /// Run the full pipeline for one request: chains, embeddings,
    /// ranking, persistence.
    ///
    /// Partial chain failures are reported in the result, not as an
    /// error; the call fails only when configuration is unusable, every
    /// chain failed, or candidates cannot be persisted.
    ///
    /// # Errors
    ///
    /// Returns `AthanorError::Engine` with `GenerationFailed` when zero
    /// chains produced a candidate, and `AthanorError::Storage` when the
    /// surviving candidates cannot be saved.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, AthanorError> {
        let outcome = self.engine.generate(request).await?;
        let mut prompts = outcome.prompts;

        // One weights snapshot for the whole scoring pass; a training
        // publish mid-request affects the next request, not this one.
        let weights = self.weight_store.snapshot();
        let history = self.load_history()?;

        let ranked = RankingEngine::rank(
            &mut prompts,
            &request.input,
            outcome.query_embedding.as_deref(),
            &weights,
            &history,
        );

        for prompt in &prompts {
            self.storage.save_prompt(prompt)?;
        }

        info!(
            session_id = %request.session_id,
            candidates = prompts.len(),
            chain_errors = outcome.errors.len(),
            selected = ?ranked.selected,
            "Generation complete"
        );

        Ok(GenerationResult {
            prompts,
            rankings: ranked.rankings,
            selected: ranked.selected,
            chain_errors: outcome.errors,
            session_id: request.session_id,
        })
    }

    /// Record a user decision about a presented candidate.
    ///
    /// # Errors
    ///
    /// Returns `AthanorError::Storage` when the interaction cannot be
    /// appended.
    pub fn record_interaction(
        &self,
        prompt_id: Uuid,
        session_id: Uuid,
        action: InteractionAction,
    ) -> Result<(), AthanorError> {
        let interaction = Interaction::new(prompt_id, session_id, action);
        self.storage.record_interaction(&interaction)?;
        Ok(())
    }

    /// Run one training pass over interactions recorded since the last
    /// successful run. With `dry_run`, report without persisting.
    ///
    /// # Errors
    ///
    /// Returns `AthanorError::Learning` on storage failures during the
    /// run; scheduled callers log and skip rather than propagate.
    pub fn run_training(&self, dry_run: bool) -> Result<TrainingRun, AthanorError> {
        let params = TrainerParams::from(&self.config.learning.nightly_job);
        let trainer = Trainer::new(
            Arc::clone(&self.storage),
            Arc::clone(&self.weight_store),
            params,
        );
        Ok(trainer.run_training(dry_run)?)
    }

    /// Status of every registered provider.
    pub async fn provider_statuses(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::new();
        for name in self.registry.names() {
            if let Ok(provider) = self.registry.get(name) {
                statuses.push(ProviderStatus {
                    name: name.to_string(),
                    available: provider.is_available().await,
                    supports_embeddings: provider.supports_embeddings(),
                });
            }
        }
        statuses
    }

    /// Build the historical-performance index from persisted records.
    fn load_history(&self) -> Result<HistoryIndex, AthanorError> {
        let interactions = self.storage.interactions_since(None)?;
        if interactions.is_empty() {
            return Ok(HistoryIndex::new());
        }

        let ids: HashSet<Uuid> = interactions.iter().map(|i| i.prompt_id).collect();
        let mut prompts: Vec<Prompt> = Vec::with_capacity(ids.len());
        for id in ids {
            match self.storage.get_prompt(id) {
                Ok(Some(prompt)) => prompts.push(prompt),
                Ok(None) => {}
                Err(e) => {
                    // History is advisory; scoring degrades to the
                    // neutral midpoint rather than failing the request.
                    warn!(error = %e, "Failed to load prompt for history index");
                }
            }
        }

        Ok(HistoryIndex::from_records(&prompts, &interactions))
    }
}
