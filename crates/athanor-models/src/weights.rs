use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fixed set of ranking features.
///
/// The feature set never changes at runtime: training always reads and
/// writes all five features together, and both [`RankingWeights`] and
/// [`FeatureVector`] are structs so a partial update cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Closeness of generation temperature to the configured ideal.
    Temperature,
    /// Ratio of tokens used to the token budget.
    TokenEfficiency,
    /// Cosine similarity between query and candidate embeddings.
    SemanticSimilarity,
    /// Closeness of candidate length to the query length band.
    LengthScore,
    /// Learned success signal for the phase/provider/persona/tag combo.
    HistoricalPerformance,
}

impl Feature {
    /// All features, in the order weights are reported and logged.
    pub const ALL: [Self; 5] = [
        Self::Temperature,
        Self::TokenEfficiency,
        Self::SemanticSimilarity,
        Self::LengthScore,
        Self::HistoricalPerformance,
    ];

    /// Canonical snake_case name, matching configuration keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::TokenEfficiency => "token_efficiency",
            Self::SemanticSimilarity => "semantic_similarity",
            Self::LengthScore => "length_score",
            Self::HistoricalPerformance => "historical_performance",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-feature values computed for one candidate at generation time.
///
/// Stored alongside the candidate so the trainer can correlate feature
/// values with interaction outcomes without recomputing embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub temperature: f64,
    pub token_efficiency: f64,
    pub semantic_similarity: f64,
    pub length_score: f64,
    pub historical_performance: f64,
}

impl FeatureVector {
    /// Value of a single feature.
    #[must_use]
    pub const fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Temperature => self.temperature,
            Feature::TokenEfficiency => self.token_efficiency,
            Feature::SemanticSimilarity => self.semantic_similarity,
            Feature::LengthScore => self.length_score,
            Feature::HistoricalPerformance => self.historical_performance,
        }
    }

    /// Weighted sum against a weight vector.
    #[must_use]
    pub fn score(&self, weights: &RankingWeights) -> f64 {
        Feature::ALL
            .iter()
            .map(|f| self.get(*f) * weights.get(*f))
            .sum()
    }
}

/// Weight assigned to each ranking feature.
///
/// Invariant: weights are non-negative. Construction via
/// [`RankingWeights::normalized`] additionally scales the vector to sum
/// to 1.0 so scores stay comparable across weight updates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub temperature: f64,
    pub token_efficiency: f64,
    pub semantic_similarity: f64,
    pub length_score: f64,
    pub historical_performance: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            token_efficiency: 0.2,
            semantic_similarity: 0.3,
            length_score: 0.1,
            historical_performance: 0.2,
        }
    }
}

impl RankingWeights {
    /// Value of a single feature weight.
    #[must_use]
    pub const fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Temperature => self.temperature,
            Feature::TokenEfficiency => self.token_efficiency,
            Feature::SemanticSimilarity => self.semantic_similarity,
            Feature::LengthScore => self.length_score,
            Feature::HistoricalPerformance => self.historical_performance,
        }
    }

    /// Set a single feature weight, clamping negatives to zero.
    pub fn set(&mut self, feature: Feature, value: f64) {
        let value = value.max(0.0);
        match feature {
            Feature::Temperature => self.temperature = value,
            Feature::TokenEfficiency => self.token_efficiency = value,
            Feature::SemanticSimilarity => self.semantic_similarity = value,
            Feature::LengthScore => self.length_score = value,
            Feature::HistoricalPerformance => self.historical_performance = value,
        }
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        Feature::ALL.iter().map(|f| self.get(*f)).sum()
    }

    /// Returns a copy scaled so the weights sum to 1.0.
    ///
    /// A zero vector is returned unchanged rather than dividing by zero.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let sum = self.total();
        if sum <= f64::EPSILON {
            return *self;
        }
        let mut out = *self;
        for feature in Feature::ALL {
            out.set(feature, self.get(feature) / sum);
        }
        out
    }

    /// True when every weight is non-negative and finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        Feature::ALL
            .iter()
            .all(|f| self.get(*f) >= 0.0 && self.get(*f).is_finite())
    }
}

/// Audit record of one training run.
///
/// Exists for logging and dry-run reporting; correctness never depends on
/// it being persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRun {
    /// When the run executed.
    pub ran_at: DateTime<Utc>,
    /// Number of interactions consumed by the run.
    pub interactions_seen: usize,
    /// Per-feature correlation between feature value and outcome.
    pub correlations: FeatureVector,
    /// Per-feature delta applied before renormalization.
    pub applied_deltas: FeatureVector,
    /// Whether a new weight snapshot was produced and persisted.
    pub updated: bool,
}

impl TrainingRun {
    /// A run that consumed `seen` interactions but changed nothing.
    #[must_use]
    pub fn no_op(seen: usize) -> Self {
        Self {
            ran_at: Utc::now(),
            interactions_seen: seen,
            correlations: FeatureVector::default(),
            applied_deltas: FeatureVector::default(),
            updated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_are_valid_and_sum_to_one() {
        let weights = RankingWeights::default();
        assert!(weights.is_valid());
        assert!((weights.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn set_clamps_negative_to_zero() {
        let mut weights = RankingWeights::default();
        weights.set(Feature::LengthScore, -0.4);
        assert_eq!(weights.get(Feature::LengthScore), 0.0);
        assert!(weights.is_valid());
    }

    #[test]
    fn normalized_sums_to_one() {
        let weights = RankingWeights {
            temperature: 2.0,
            token_efficiency: 1.0,
            semantic_similarity: 3.0,
            length_score: 1.0,
            historical_performance: 1.0,
        };
        let norm = weights.normalized();
        assert!((norm.total() - 1.0).abs() < 1e-9);
        assert!((norm.temperature - 0.25).abs() < 1e-9);
    }

    #[test]
    fn normalized_leaves_zero_vector_alone() {
        let zero = RankingWeights {
            temperature: 0.0,
            token_efficiency: 0.0,
            semantic_similarity: 0.0,
            length_score: 0.0,
            historical_performance: 0.0,
        };
        assert_eq!(zero.normalized(), zero);
    }

    #[test]
    fn score_is_dot_product() {
        let features = FeatureVector {
            temperature: 1.0,
            token_efficiency: 0.5,
            semantic_similarity: 0.0,
            length_score: 1.0,
            historical_performance: 0.5,
        };
        let weights = RankingWeights::default();
        let expected = 0.2 + 0.5 * 0.2 + 0.1 + 0.5 * 0.2;
        assert!((features.score(&weights) - expected).abs() < 1e-9);
    }
}
