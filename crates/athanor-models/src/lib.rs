//! Shared data model for the athanor pipeline
//!
//! This crate defines the types that flow between the provider registry,
//! the phase orchestrator, the ranking engine, and the trainer. It contains
//! no I/O and no provider-specific logic.

mod interaction;
mod phase;
mod prompt;
mod request;
mod weights;

pub use interaction::{Interaction, InteractionAction};
pub use phase::{Phase, PhaseConfig, PhaseParseError, PhaseState};
pub use prompt::{ChainError, GenerationResult, Prompt, PromptRanking};
pub use request::{GenerationRequest, MAX_CANDIDATE_COUNT};
pub use weights::{Feature, FeatureVector, RankingWeights, TrainingRun};
