//! Candidate ranking for athanor
//!
//! Scores each candidate with a fixed feature vector against the current
//! weight snapshot and imposes a deterministic order on the merged chain
//! results. Ranking is a pure function of its inputs: identical
//! candidates, query, weights, and history always produce the identical
//! order.

mod features;
mod history;
mod store;

pub use features::{
    IDEAL_TEMPERATURE, cosine_similarity, length_score, semantic_similarity_score,
    temperature_score, token_efficiency_score,
};
pub use history::{HistoryIndex, NEUTRAL_PERFORMANCE};
pub use store::WeightStore;

use std::cmp::Ordering;

use tracing::debug;
use uuid::Uuid;

use athanor_models::{FeatureVector, Prompt, PromptRanking, RankingWeights};

/// Result of ranking one candidate set.
#[derive(Debug, Clone)]
pub struct RankedSet {
    /// Rankings in descending score order.
    pub rankings: Vec<PromptRanking>,
    /// Id of the top-ranked candidate, when any exist.
    pub selected: Option<Uuid>,
}

/// Scores and orders candidate sets.
pub struct RankingEngine;

impl RankingEngine {
    /// Compute the feature vector for one candidate.
    #[must_use]
    pub fn compute_features(
        prompt: &Prompt,
        query: &str,
        query_embedding: Option<&[f32]>,
        history: &HistoryIndex,
    ) -> FeatureVector {
        FeatureVector {
            temperature: temperature_score(prompt.temperature),
            token_efficiency: token_efficiency_score(prompt.actual_tokens, prompt.max_tokens),
            semantic_similarity: semantic_similarity_score(
                prompt.embedding.as_deref(),
                query_embedding,
            ),
            length_score: length_score(&prompt.content, query),
            historical_performance: history.performance_for(prompt),
        }
    }

    /// Score and order the candidate set.
    ///
    /// Each prompt's `features` and `relevance_score` are filled in so
    /// they are recorded at generation time for later training. Ties on
    /// score break by higher token efficiency, then by original
    /// generation order (the sort is stable).
    pub fn rank(
        prompts: &mut [Prompt],
        query: &str,
        query_embedding: Option<&[f32]>,
        weights: &RankingWeights,
        history: &HistoryIndex,
    ) -> RankedSet {
        for prompt in prompts.iter_mut() {
            let features = Self::compute_features(prompt, query, query_embedding, history);
            prompt.features = features;
            prompt.relevance_score = features.score(weights);
            debug!(
                prompt_id = %prompt.id,
                score = prompt.relevance_score,
                temperature = features.temperature,
                token_efficiency = features.token_efficiency,
                semantic_similarity = features.semantic_similarity,
                length_score = features.length_score,
                historical_performance = features.historical_performance,
                "Scored candidate"
            );
        }

        let mut rankings: Vec<PromptRanking> = prompts
            .iter()
            .map(|prompt| PromptRanking {
                prompt_id: prompt.id,
                score: prompt.relevance_score,
                features: prompt.features,
            })
            .collect();

        rankings.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.features
                        .token_efficiency
                        .partial_cmp(&a.features.token_efficiency)
                        .unwrap_or(Ordering::Equal)
                })
        });

        let selected = rankings.first().map(|r| r.prompt_id);
        RankedSet { rankings, selected }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athanor_models::Phase;
    use chrono::Utc;

    fn candidate(content: &str, temperature: f64, actual_tokens: u32) -> Prompt {
        Prompt {
            id: Uuid::new_v4(),
            phase: Phase::Coagulatio,
            content: content.to_string(),
            provider: "stub".to_string(),
            model: "stub-model".to_string(),
            temperature,
            max_tokens: 1024,
            actual_tokens,
            tags: Vec::new(),
            persona: None,
            embedding: None,
            embedding_provider: None,
            embedding_model: None,
            relevance_score: 0.0,
            features: FeatureVector::default(),
            original_input: "query".to_string(),
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ranking_is_deterministic() {
        let make_set = || {
            vec![
                candidate("short answer", 0.7, 512),
                candidate("a somewhat longer answer text", 0.3, 100),
                candidate("medium length reply", 0.9, 700),
            ]
        };
        let weights = RankingWeights::default();
        let history = HistoryIndex::new();

        let mut first = make_set();
        let mut second = make_set();
        // Same content in the same order must rank identically.
        let ranked_a = RankingEngine::rank(&mut first, "query", None, &weights, &history);
        let ranked_b = RankingEngine::rank(&mut second, "query", None, &weights, &history);

        let order_a: Vec<usize> = ranked_a
            .rankings
            .iter()
            .map(|r| first.iter().position(|p| p.id == r.prompt_id).unwrap())
            .collect();
        let order_b: Vec<usize> = ranked_b
            .rankings
            .iter()
            .map(|r| second.iter().position(|p| p.id == r.prompt_id).unwrap())
            .collect();
        assert_eq!(order_a, order_b);
    }

    #[test]
    fn better_temperature_wins_with_equal_rest() {
        let mut prompts = vec![
            candidate("same length!", 0.1, 512),
            candidate("same length!", 0.7, 512),
        ];
        let ideal_id = prompts[1].id;
        let ranked = RankingEngine::rank(
            &mut prompts,
            "query",
            None,
            &RankingWeights::default(),
            &HistoryIndex::new(),
        );
        assert_eq!(ranked.selected, Some(ideal_id));
    }

    #[test]
    fn score_ties_break_on_token_efficiency() {
        // Zero out every weighted feature so total scores tie, leaving
        // token efficiency visible only through the tie-break.
        let weights = RankingWeights {
            temperature: 0.0,
            token_efficiency: 0.0,
            semantic_similarity: 0.0,
            length_score: 0.0,
            historical_performance: 0.0,
        };
        let mut prompts = vec![
            candidate("equal", 0.7, 1020), // near budget: truncation risk
            candidate("equal", 0.7, 512),  // healthy band
        ];
        let efficient_id = prompts[1].id;

        let ranked = RankingEngine::rank(
            &mut prompts,
            "query",
            None,
            &weights,
            &HistoryIndex::new(),
        );
        assert_eq!(ranked.selected, Some(efficient_id));
    }

    #[test]
    fn full_ties_keep_generation_order() {
        let weights = RankingWeights {
            temperature: 0.0,
            token_efficiency: 0.0,
            semantic_similarity: 0.0,
            length_score: 0.0,
            historical_performance: 0.0,
        };
        let mut prompts = vec![
            candidate("identical", 0.7, 512),
            candidate("identical", 0.7, 512),
            candidate("identical", 0.7, 512),
        ];
        let expected: Vec<Uuid> = prompts.iter().map(|p| p.id).collect();

        let ranked = RankingEngine::rank(
            &mut prompts,
            "query",
            None,
            &weights,
            &HistoryIndex::new(),
        );
        let got: Vec<Uuid> = ranked.rankings.iter().map(|r| r.prompt_id).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn features_are_recorded_on_prompts() {
        let mut prompts = vec![candidate("some content", 0.7, 512)];
        RankingEngine::rank(
            &mut prompts,
            "some content",
            None,
            &RankingWeights::default(),
            &HistoryIndex::new(),
        );
        assert!(prompts[0].relevance_score > 0.0);
        assert!((prompts[0].features.temperature - 1.0).abs() < 1e-9);
        assert!((prompts[0].features.length_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn semantic_similarity_uses_embeddings() {
        let mut with_embedding = candidate("close to query", 0.7, 512);
        with_embedding.embedding = Some(vec![1.0, 0.0]);
        let mut orthogonal = candidate("far from query", 0.7, 512);
        orthogonal.embedding = Some(vec![0.0, 1.0]);
        let close_id = with_embedding.id;

        let weights = RankingWeights {
            temperature: 0.0,
            token_efficiency: 0.0,
            semantic_similarity: 1.0,
            length_score: 0.0,
            historical_performance: 0.0,
        };
        let query_embedding = vec![1.0f32, 0.0];
        let mut prompts = vec![orthogonal, with_embedding];

        let ranked = RankingEngine::rank(
            &mut prompts,
            "query",
            Some(&query_embedding),
            &weights,
            &HistoryIndex::new(),
        );
        assert_eq!(ranked.selected, Some(close_id));
    }
}
