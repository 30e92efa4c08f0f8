use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::Phase;
use crate::weights::FeatureVector;

/// A generated prompt candidate with its generation metadata.
///
/// Candidates are owned by the in-memory result set until saved; once
/// persisted they belong to the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: Uuid,
    /// Phase that produced this candidate's final content.
    pub phase: Phase,
    /// The generated prompt text.
    pub content: String,
    /// Provider that generated the content.
    pub provider: String,
    /// Model reported by the provider.
    pub model: String,
    /// Temperature the content was generated with.
    pub temperature: f64,
    /// Token budget the content was generated with.
    pub max_tokens: u32,
    /// Tokens the provider reported using.
    pub actual_tokens: u32,
    /// Tags carried over from the request.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Persona carried over from the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    /// Embedding of `content`, produced by the canonical embedding
    /// provider. Absent when embedding failed or was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Provider that produced the embedding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,
    /// Model that produced the embedding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// Weighted score assigned by the ranking engine.
    #[serde(default)]
    pub relevance_score: f64,
    /// Feature values recorded at generation time, consumed by training.
    #[serde(default)]
    pub features: FeatureVector,
    /// The original request input that produced this candidate.
    pub original_input: String,
    /// Groups prompts of one generate call.
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Ranking detail for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRanking {
    /// Candidate id this ranking refers to.
    pub prompt_id: Uuid,
    /// Weighted total score.
    pub score: f64,
    /// The individual feature values behind the score.
    pub features: FeatureVector,
}

/// A chain that failed before producing a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainError {
    /// Zero-based index of the failed chain.
    pub chain: usize,
    /// Phase at which the chain aborted.
    pub phase: Phase,
    /// Human-readable provider or timeout error.
    pub error: String,
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chain {} failed in {}: {}", self.chain, self.phase, self.error)
    }
}

/// Complete result of one generate call: the surviving candidates, their
/// ranking, and the errors of chains that did not survive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Candidates from chains that fully completed.
    pub prompts: Vec<Prompt>,
    /// Candidates ordered best-first by the ranking engine.
    pub rankings: Vec<PromptRanking>,
    /// Id of the top-ranked candidate, when any candidate exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<Uuid>,
    /// Per-chain failures; non-fatal as long as one chain succeeded.
    #[serde(default)]
    pub chain_errors: Vec<ChainError>,
    pub session_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_error_display_names_phase() {
        let err = ChainError {
            chain: 2,
            phase: Phase::Solutio,
            error: "timed out".to_string(),
        };
        assert_eq!(err.to_string(), "chain 2 failed in solutio: timed out");
    }
}
