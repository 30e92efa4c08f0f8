use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::Phase;

/// Upper bound on the number of candidates a single request may produce.
///
/// `GenerationRequest::clamped_count` never returns more than this,
/// regardless of what the caller asked for.
pub const MAX_CANDIDATE_COUNT: usize = 10;

/// A request to generate one or more prompt candidates.
///
/// The phase list is an ordered, non-empty subset of [`Phase::ALL`];
/// duplicates are permitted and each occurrence executes independently.
/// Per-phase provider overrides in `providers` take precedence over the
/// configured phase defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Free-text input describing what the prompt should accomplish.
    pub input: String,
    /// Number of independent generation chains to run (clamped to
    /// [`MAX_CANDIDATE_COUNT`]).
    #[serde(default = "default_count")]
    pub count: usize,
    /// Ordered phases to execute within each chain.
    #[serde(default = "default_phases")]
    pub phases: Vec<Phase>,
    /// Per-phase provider overrides; wins over the configured defaults.
    #[serde(default)]
    pub providers: HashMap<Phase, String>,
    /// Sampling temperature passed to providers.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Output token budget passed to providers.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Optional persona shaping the generated prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    /// Free-form tags recorded on each candidate.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Additional context lines appended to phase prompts.
    #[serde(default)]
    pub context: Vec<String>,
    /// Groups the prompts and interactions of one generate call.
    #[serde(default = "Uuid::new_v4")]
    pub session_id: Uuid,
}

fn default_count() -> usize {
    1
}

fn default_phases() -> Vec<Phase> {
    Phase::ALL.to_vec()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

impl GenerationRequest {
    /// Create a request with sensible defaults for a single input.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            count: default_count(),
            phases: default_phases(),
            providers: HashMap::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            persona: None,
            tags: Vec::new(),
            context: Vec::new(),
            session_id: Uuid::new_v4(),
        }
    }

    /// The requested count, forced into `1..=MAX_CANDIDATE_COUNT`.
    #[must_use]
    pub fn clamped_count(&self) -> usize {
        self.count.clamp(1, MAX_CANDIDATE_COUNT)
    }

    /// Resolve the provider for `phase`: request override first, then the
    /// supplied default phase configuration.
    #[must_use]
    pub fn provider_override(&self, phase: Phase) -> Option<&str> {
        self.providers.get(&phase).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_clamps_low_and_high() {
        let mut req = GenerationRequest::new("write a haiku");
        req.count = 0;
        assert_eq!(req.clamped_count(), 1);
        req.count = 500;
        assert_eq!(req.clamped_count(), MAX_CANDIDATE_COUNT);
        req.count = 3;
        assert_eq!(req.clamped_count(), 3);
    }

    #[test]
    fn minimal_json_line_deserializes_with_defaults() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"input": "write a haiku"}"#).unwrap();
        assert_eq!(request.count, 1);
        assert_eq!(request.phases, Phase::ALL.to_vec());
        assert!((request.temperature - 0.7).abs() < 1e-9);
        assert_eq!(request.max_tokens, 2048);
    }

    #[test]
    fn override_wins_when_present() {
        let mut req = GenerationRequest::new("input");
        req.providers
            .insert(Phase::Solutio, "anthropic".to_string());
        assert_eq!(req.provider_override(Phase::Solutio), Some("anthropic"));
        assert_eq!(req.provider_override(Phase::Coagulatio), None);
    }
}
