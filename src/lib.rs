//! athanor: phased prompt generation with multi-provider LLM routing and
//! adaptive ranking
//!
//! A request flows one direction: the provider registry resolves a
//! backend per phase, the orchestrator fans out concurrent generation
//! chains, the ranking engine imposes a deterministic order on whatever
//! survived, and recorded user interactions feed a nightly trainer that
//! adjusts the ranking weights over time.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use athanor::{AthanorClient, Config, GenerationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::discover(&std::env::current_dir()?)?;
//!     let client = AthanorClient::from_config(config)?;
//!
//!     let request = GenerationRequest::new("an onboarding email for new developers");
//!     let result = client.generate(&request).await?;
//!
//!     if let Some(selected) = result.selected {
//!         println!("best candidate: {selected}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
mod client;
pub mod error;
pub mod exit_codes;
pub mod logging;

// Stable public API re-exports.
pub use client::{AthanorClient, ProviderStatus};
pub use error::AthanorError;
pub use exit_codes::ExitCode;

pub use athanor_config::{Config, ConfigError};
pub use athanor_engine::{EngineError, EngineOptions, PhaseEngine};
pub use athanor_learning::{Trainer, TrainerParams};
pub use athanor_models::{
    Feature, FeatureVector, GenerationRequest, GenerationResult, Interaction, InteractionAction,
    Phase, PhaseConfig, Prompt, PromptRanking, RankingWeights, TrainingRun,
};
pub use athanor_providers::{Provider, ProviderRegistry, RegistryBuilder, RegistryError};
pub use athanor_ranking::{HistoryIndex, RankingEngine, WeightStore};
pub use athanor_storage::{FileStorage, MemoryStorage, Storage, WeightsSnapshot};
