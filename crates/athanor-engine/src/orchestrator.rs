//! Chain orchestration: concurrent phase pipelines with partial-failure
//! tolerance
//!
//! A request with `count = k` produces up to `k` independent chains.
//! Within a chain, phases run sequentially because each phase's output
//! feeds the next; across chains there is no ordering at all. Chains run
//! on tokio tasks gated by a semaphore sized from the worker
//! configuration, and each provider call is bounded by a timeout. A
//! failing phase aborts only its own chain; the request as a whole fails
//! only when every chain failed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use athanor_models::{
    ChainError, GenerationRequest, Phase, PhaseConfig, PhaseState, Prompt,
};
use athanor_providers::{GenerateRequest, Provider, ProviderRegistry};

use crate::phases::handler_for;

/// Orchestrator configuration resolved from the config file.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Default provider per phase.
    pub phase_configs: Vec<PhaseConfig>,
    /// Maximum chains in flight at once.
    pub workers: usize,
    /// Deadline for a single provider generation call.
    pub generation_timeout: Duration,
    /// Deadline for a single embedding call; embeddings are expected to
    /// be fast.
    pub embedding_timeout: Duration,
    /// Preferred canonical embedding provider name.
    pub embedding_provider: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            phase_configs: Vec::new(),
            workers: 4,
            generation_timeout: athanor_providers::DEFAULT_GENERATION_TIMEOUT,
            embedding_timeout: athanor_providers::DEFAULT_EMBEDDING_TIMEOUT,
            embedding_provider: athanor_providers::PROVIDER_OPENAI.to_string(),
        }
    }
}

impl EngineOptions {
    /// Resolve options from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &athanor_config::Config) -> Self {
        Self {
            phase_configs: config.phase_configs(),
            workers: config.generation.workers,
            generation_timeout: Duration::from_secs(config.generation.timeout_secs),
            embedding_timeout: Duration::from_secs(config.ranking.embedding.timeout_secs),
            embedding_provider: config.ranking.embedding.provider.clone(),
        }
    }
}

/// Per-chain execution trace: the state every phase ended in.
#[derive(Debug, Clone)]
pub struct ChainReport {
    pub chain: usize,
    pub states: Vec<(Phase, PhaseState)>,
}

/// What the orchestrator hands to ranking: surviving candidates, the
/// query embedding, chain errors, and execution traces.
#[derive(Debug)]
pub struct EngineOutcome {
    /// Candidates from chains that fully completed, in chain order.
    pub prompts: Vec<Prompt>,
    /// Embedding of the original request input, when one could be
    /// computed.
    pub query_embedding: Option<Vec<f32>>,
    /// Failures of chains that produced no candidate.
    pub errors: Vec<ChainError>,
    /// Per-chain phase state traces.
    pub reports: Vec<ChainReport>,
}

/// Errors that fail an entire generate call.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Every chain failed; the per-chain errors carry the detail.
    #[error("generation failed: all {count} chains failed")]
    GenerationFailed {
        count: usize,
        errors: Vec<ChainError>,
    },

    /// The request cannot be executed as specified.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// The phase pipeline orchestrator.
///
/// Holds the immutable provider registry and resolved options; a single
/// instance serves concurrent requests.
pub struct PhaseEngine {
    registry: Arc<ProviderRegistry>,
    options: EngineOptions,
}

// Everything a chain task needs, shared by Arc to keep spawns cheap.
struct ChainContext {
    registry: Arc<ProviderRegistry>,
    phase_configs: Vec<PhaseConfig>,
    overrides: HashMap<Phase, String>,
    request: GenerationRequest,
    timeout: Duration,
}

impl PhaseEngine {
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>, options: EngineOptions) -> Self {
        Self { registry, options }
    }

    /// Run the phase pipeline for a request.
    ///
    /// Returns the candidates of every chain that fully completed plus
    /// the errors of those that did not. Cancelling the returned future
    /// aborts all in-flight chains.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidRequest` for an empty phase list and
    /// `EngineError::GenerationFailed` when zero chains produced a
    /// candidate.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<EngineOutcome, EngineError> {
        if request.phases.is_empty() {
            return Err(EngineError::InvalidRequest(
                "phase list must not be empty".to_string(),
            ));
        }

        let count = request.clamped_count();
        let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let context = Arc::new(ChainContext {
            registry: Arc::clone(&self.registry),
            phase_configs: self.options.phase_configs.clone(),
            overrides: request.providers.clone(),
            request: request.clone(),
            timeout: self.options.generation_timeout,
        });

        info!(
            chains = count,
            phases = request.phases.len(),
            workers = self.options.workers,
            "Dispatching generation chains"
        );

        let mut join_set = JoinSet::new();
        for chain in 0..count {
            let context = Arc::clone(&context);
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("chain semaphore closed");
                run_chain(&context, chain).await
            });
        }

        // Collect in chain order so downstream tie-breaking on original
        // generation order stays deterministic.
        let mut slots: Vec<Option<(ChainReport, Result<Prompt, ChainError>)>> =
            (0..count).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((chain, report, result)) => slots[chain] = Some((report, result)),
                Err(e) => warn!(error = %e, "Chain task panicked or was aborted"),
            }
        }

        let mut prompts = Vec::new();
        let mut errors = Vec::new();
        let mut reports = Vec::new();
        for slot in slots.into_iter().flatten() {
            let (report, result) = slot;
            reports.push(report);
            match result {
                Ok(prompt) => prompts.push(prompt),
                Err(error) => {
                    warn!(chain = error.chain, phase = %error.phase, error = %error.error, "Chain failed");
                    errors.push(error);
                }
            }
        }

        if prompts.is_empty() {
            return Err(EngineError::GenerationFailed { count, errors });
        }

        let query_embedding = self.embed_candidates(&mut prompts, &request.input).await;

        Ok(EngineOutcome {
            prompts,
            query_embedding,
            errors,
            reports,
        })
    }

    /// Embed the query and every candidate through the canonical
    /// embedding provider, resolved once per request.
    ///
    /// Embedding failures degrade that candidate's semantic feature
    /// rather than failing the request.
    async fn embed_candidates(
        &self,
        prompts: &mut [Prompt],
        query: &str,
    ) -> Option<Vec<f32>> {
        let primary = match self.registry.get(&self.options.embedding_provider) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(
                    provider = %self.options.embedding_provider,
                    error = %e,
                    "Configured embedding provider not registered, skipping embeddings"
                );
                return None;
            }
        };

        let embedder = self.registry.embedding_provider(primary).await;
        let model = embedder.embedding_model().map(str::to_string);
        let timeout = self.options.embedding_timeout;

        let query_embedding = match embed_with_timeout(&embedder, query, timeout).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(provider = embedder.name(), error = %e, "Failed to embed query");
                None
            }
        };

        for prompt in prompts.iter_mut() {
            match embed_with_timeout(&embedder, &prompt.content, timeout).await {
                Ok(vector) => {
                    prompt.embedding = Some(vector);
                    prompt.embedding_provider = Some(embedder.name().to_string());
                    prompt.embedding_model = model.clone();
                }
                Err(e) => {
                    warn!(
                        provider = embedder.name(),
                        prompt_id = %prompt.id,
                        error = %e,
                        "Failed to embed candidate"
                    );
                }
            }
        }

        query_embedding
    }
}

/// Bound one embedding call by the configured deadline.
async fn embed_with_timeout(
    embedder: &Arc<dyn Provider>,
    text: &str,
    timeout: Duration,
) -> Result<Vec<f32>, String> {
    match tokio::time::timeout(timeout, embedder.embed(text)).await {
        Ok(Ok(vector)) => Ok(vector),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!(
            "embedding call timed out after {}s",
            timeout.as_secs()
        )),
    }
}

/// Execute one chain: all phases in order, feeding each phase's output
/// into the next. Any failure aborts the chain without emitting a
/// partial candidate.
async fn run_chain(
    context: &ChainContext,
    chain: usize,
) -> (usize, ChainReport, Result<Prompt, ChainError>) {
    let request = &context.request;
    let mut states: Vec<(Phase, PhaseState)> = request
        .phases
        .iter()
        .map(|phase| (*phase, PhaseState::Pending))
        .collect();

    let mut material = request.input.clone();
    let mut provider_name = String::new();
    let mut model = String::new();
    let mut tokens_used = 0u32;
    let mut final_phase = request.phases[0];

    for (index, phase) in request.phases.iter().enumerate() {
        states[index].1 = PhaseState::Dispatched;

        let provider = match context.registry.provider_for_phase(
            &context.phase_configs,
            &context.overrides,
            *phase,
        ) {
            Ok(provider) => provider,
            Err(e) => {
                states[index].1 = PhaseState::Failed;
                let report = ChainReport { chain, states };
                return (
                    chain,
                    report,
                    Err(ChainError {
                        chain,
                        phase: *phase,
                        error: e.to_string(),
                    }),
                );
            }
        };

        let handler = handler_for(*phase);
        let generate = GenerateRequest::new(handler.system_prompt(), handler.render(&material, request))
            .with_temperature(request.temperature)
            .with_max_tokens(request.max_tokens)
            .with_timeout(context.timeout);

        debug!(
            chain,
            phase = %phase,
            provider = provider.name(),
            "Dispatching phase"
        );

        let outcome = tokio::time::timeout(context.timeout, provider.generate(generate)).await;
        match outcome {
            Ok(Ok(response)) => {
                states[index].1 = PhaseState::Succeeded;
                material = response.content;
                provider_name = provider.name().to_string();
                model = response.model;
                tokens_used = response.tokens_used;
                final_phase = *phase;
            }
            Ok(Err(e)) => {
                states[index].1 = PhaseState::Failed;
                let report = ChainReport { chain, states };
                return (
                    chain,
                    report,
                    Err(ChainError {
                        chain,
                        phase: *phase,
                        error: e.to_string(),
                    }),
                );
            }
            Err(_) => {
                states[index].1 = PhaseState::Failed;
                let report = ChainReport { chain, states };
                return (
                    chain,
                    report,
                    Err(ChainError {
                        chain,
                        phase: *phase,
                        error: format!(
                            "phase call timed out after {}s",
                            context.timeout.as_secs()
                        ),
                    }),
                );
            }
        }
    }

    let prompt = Prompt {
        id: Uuid::new_v4(),
        phase: final_phase,
        content: material,
        provider: provider_name,
        model,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        actual_tokens: tokens_used,
        tags: request.tags.clone(),
        persona: request.persona.clone(),
        embedding: None,
        embedding_provider: None,
        embedding_model: None,
        relevance_score: 0.0,
        features: athanor_models::FeatureVector::default(),
        original_input: request.input.clone(),
        session_id: request.session_id,
        created_at: Utc::now(),
    };

    let report = ChainReport { chain, states };
    (chain, report, Ok(prompt))
}
