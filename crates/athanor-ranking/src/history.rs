//! Historical performance aggregation
//!
//! Candidates sharing a phase/provider/persona/tag combination share a
//! learned success signal: the mean outcome of recorded interactions on
//! prompts with that combination. Combinations without history score a
//! neutral midpoint so new configurations are neither favored nor
//! punished.

use std::collections::HashMap;

use athanor_models::{Interaction, Prompt};

/// Outcome assumed when a combination has no recorded history.
pub const NEUTRAL_PERFORMANCE: f64 = 0.5;

/// Aggregated interaction outcomes keyed by candidate combination.
#[derive(Debug, Default)]
pub struct HistoryIndex {
    // combination key -> (outcome sum, observation count)
    outcomes: HashMap<String, (f64, usize)>,
}

/// The combination key a prompt aggregates under.
fn combination_key(
    phase: &str,
    provider: &str,
    persona: Option<&str>,
    tags: &[String],
) -> String {
    let mut sorted_tags: Vec<&str> = tags.iter().map(String::as_str).collect();
    sorted_tags.sort_unstable();
    format!(
        "{phase}|{provider}|{}|{}",
        persona.unwrap_or(""),
        sorted_tags.join(",")
    )
}

fn prompt_key(prompt: &Prompt) -> String {
    combination_key(
        prompt.phase.as_str(),
        &prompt.provider,
        prompt.persona.as_deref(),
        &prompt.tags,
    )
}

impl HistoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from persisted prompts and interactions.
    ///
    /// Interactions referring to unknown prompts are skipped; the log is
    /// append-only and may outlive pruned prompt records.
    #[must_use]
    pub fn from_records(prompts: &[Prompt], interactions: &[Interaction]) -> Self {
        let by_id: HashMap<_, _> = prompts.iter().map(|p| (p.id, p)).collect();

        let mut index = Self::new();
        for interaction in interactions {
            if let Some(prompt) = by_id.get(&interaction.prompt_id) {
                let entry = index
                    .outcomes
                    .entry(prompt_key(prompt))
                    .or_insert((0.0, 0));
                entry.0 += interaction.outcome();
                entry.1 += 1;
            }
        }
        index
    }

    /// Mean outcome for the prompt's combination, or the neutral
    /// midpoint when no history exists.
    #[must_use]
    pub fn performance_for(&self, prompt: &Prompt) -> f64 {
        self.outcomes
            .get(&prompt_key(prompt))
            .map_or(NEUTRAL_PERFORMANCE, |(sum, count)| sum / *count as f64)
    }

    /// Number of distinct combinations with history.
    #[must_use]
    pub fn combinations(&self) -> usize {
        self.outcomes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athanor_models::{FeatureVector, InteractionAction, Phase};
    use chrono::Utc;
    use uuid::Uuid;

    fn prompt_with(provider: &str, tags: &[&str]) -> Prompt {
        Prompt {
            id: Uuid::new_v4(),
            phase: Phase::Coagulatio,
            content: "content".to_string(),
            provider: provider.to_string(),
            model: "m".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            actual_tokens: 100,
            tags: tags.iter().map(ToString::to_string).collect(),
            persona: None,
            embedding: None,
            embedding_provider: None,
            embedding_model: None,
            relevance_score: 0.0,
            features: FeatureVector::default(),
            original_input: "input".to_string(),
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn no_history_is_neutral() {
        let index = HistoryIndex::new();
        assert_eq!(index.performance_for(&prompt_with("openai", &[])), 0.5);
    }

    #[test]
    fn mean_outcome_per_combination() {
        let winner = prompt_with("openai", &["a"]);
        let other = prompt_with("ollama", &["a"]);
        let interactions = vec![
            Interaction::new(winner.id, winner.session_id, InteractionAction::Chosen),
            Interaction::new(winner.id, winner.session_id, InteractionAction::Skipped),
            Interaction::new(other.id, other.session_id, InteractionAction::Skipped),
        ];
        let prompts = vec![winner.clone(), other.clone()];
        let index = HistoryIndex::from_records(&prompts, &interactions);

        assert_eq!(index.combinations(), 2);
        assert!((index.performance_for(&winner) - 0.5).abs() < 1e-9);
        assert_eq!(index.performance_for(&other), 0.0);
    }

    #[test]
    fn tag_order_does_not_split_combinations() {
        let first = prompt_with("openai", &["x", "y"]);
        let mut second = prompt_with("openai", &["y", "x"]);
        second.id = Uuid::new_v4();

        let interactions = vec![Interaction::new(
            first.id,
            first.session_id,
            InteractionAction::Chosen,
        )];
        let prompts = vec![first, second.clone()];
        let index = HistoryIndex::from_records(&prompts, &interactions);

        // The second prompt shares the combination and inherits its
        // history.
        assert_eq!(index.performance_for(&second), 1.0);
    }
}
