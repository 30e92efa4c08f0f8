//! Learning-to-rank weight training
//!
//! A batch process, never part of the request path. Each run correlates
//! the feature values recorded on candidates at generation time with the
//! outcomes of user interactions on those candidates, nudges the weight
//! of every feature whose correlation clears a threshold, renormalizes
//! the complete vector, and publishes it as a new snapshot. There is no
//! gradient descent here; the update is a deliberately interpretable
//! correlation step.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use athanor_config::NightlyJobConfig;
use athanor_models::{Feature, FeatureVector, TrainingRun};
use athanor_ranking::WeightStore;
use athanor_storage::{Storage, StorageError, WeightsSnapshot};

/// Errors from a training run.
///
/// Callers on a schedule log these and skip the run; training failures
/// never propagate into the serving path.
#[derive(Debug, thiserror::Error)]
pub enum LearningError {
    #[error("training storage failure: {0}")]
    Storage(#[from] StorageError),
}

/// Tuning parameters for the trainer.
#[derive(Debug, Clone)]
pub struct TrainerParams {
    /// Runs seeing fewer interactions than this are a no-op.
    pub min_interactions: usize,
    /// Features with |correlation| at or below this are left alone.
    pub correlation_threshold: f64,
    /// Step size applied to the correlation when updating a weight.
    pub weight_update_rate: f64,
}

impl Default for TrainerParams {
    fn default() -> Self {
        Self {
            min_interactions: 5,
            correlation_threshold: 0.1,
            weight_update_rate: 0.1,
        }
    }
}

impl From<&NightlyJobConfig> for TrainerParams {
    fn from(config: &NightlyJobConfig) -> Self {
        Self {
            min_interactions: config.min_interactions,
            correlation_threshold: config.correlation_threshold,
            weight_update_rate: config.weight_update_rate,
        }
    }
}

/// The batch weight trainer.
pub struct Trainer {
    storage: Arc<dyn Storage>,
    weight_store: Arc<WeightStore>,
    params: TrainerParams,
}

impl Trainer {
    #[must_use]
    pub fn new(
        storage: Arc<dyn Storage>,
        weight_store: Arc<WeightStore>,
        params: TrainerParams,
    ) -> Self {
        Self {
            storage,
            weight_store,
            params,
        }
    }

    /// Run one training pass.
    ///
    /// With `dry_run` set, correlations and deltas are computed and
    /// reported but nothing is persisted or published. Too few
    /// interactions is a no-op run, not an error.
    ///
    /// # Errors
    ///
    /// Returns `LearningError::Storage` when interactions cannot be read
    /// or the new snapshot cannot be written.
    pub fn run_training(&self, dry_run: bool) -> Result<TrainingRun, LearningError> {
        let watermark = self
            .storage
            .load_weights()?
            .and_then(|snapshot| snapshot.watermark);

        let interactions = self.storage.interactions_since(watermark)?;
        let seen = interactions.len();

        if seen < self.params.min_interactions {
            info!(
                interactions = seen,
                min_interactions = self.params.min_interactions,
                "Too few interactions since last run, skipping training"
            );
            return Ok(TrainingRun::no_op(seen));
        }

        // Join each interaction with the feature vector recorded when its
        // prompt was generated. Interactions on pruned prompts drop out.
        let mut samples: Vec<(FeatureVector, f64)> = Vec::with_capacity(seen);
        let mut latest: Option<DateTime<Utc>> = watermark;
        for interaction in &interactions {
            match self.storage.get_prompt(interaction.prompt_id)? {
                Some(prompt) => {
                    samples.push((prompt.features, interaction.outcome()));
                    if latest.is_none_or(|ts| interaction.timestamp > ts) {
                        latest = Some(interaction.timestamp);
                    }
                }
                None => {
                    debug!(prompt_id = %interaction.prompt_id, "Interaction references unknown prompt");
                }
            }
        }

        if samples.len() < 2 {
            warn!(
                samples = samples.len(),
                "Not enough joined samples to correlate, skipping training"
            );
            return Ok(TrainingRun::no_op(seen));
        }

        let old_weights = *self.weight_store.snapshot();
        let mut new_weights = old_weights;
        let mut correlations = FeatureVector::default();
        let mut deltas = FeatureVector::default();

        for feature in Feature::ALL {
            let values: Vec<f64> = samples.iter().map(|(f, _)| f.get(feature)).collect();
            let outcomes: Vec<f64> = samples.iter().map(|(_, o)| *o).collect();
            let correlation = pearson_correlation(&values, &outcomes);
            set_feature(&mut correlations, feature, correlation);

            if correlation.abs() > self.params.correlation_threshold {
                let old = old_weights.get(feature);
                let updated = updated_weight(old, correlation, self.params.weight_update_rate);
                set_feature(&mut deltas, feature, updated - old);
                new_weights.set(feature, updated);
                debug!(
                    feature = %feature,
                    correlation,
                    old_weight = old,
                    new_weight = updated,
                    "Applying weight update"
                );
            }
        }

        // The complete vector is renormalized and written together; a
        // partial update is never persisted.
        let new_weights = new_weights.normalized();

        if !dry_run {
            let snapshot = WeightsSnapshot {
                weights: new_weights,
                updated_at: Utc::now(),
                watermark: latest,
            };
            self.storage.store_weights(&snapshot)?;
            self.weight_store.publish(new_weights);
        }

        info!(
            interactions = seen,
            samples = samples.len(),
            dry_run,
            "Training run complete"
        );

        Ok(TrainingRun {
            ran_at: Utc::now(),
            interactions_seen: seen,
            correlations,
            applied_deltas: deltas,
            updated: !dry_run,
        })
    }
}

/// One weight update step, clamped to stay non-negative.
#[must_use]
pub fn updated_weight(old: f64, correlation: f64, rate: f64) -> f64 {
    (old + rate * correlation).max(0.0)
}

/// Pearson correlation coefficient of two equal-length series.
///
/// Returns 0.0 when either series has no variance, so constant features
/// never trigger an update.
#[must_use]
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;

    let mean_x: f64 = xs[..n].iter().sum::<f64>() / n_f;
    let mean_y: f64 = ys[..n].iter().sum::<f64>() / n_f;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    covariance / (var_x.sqrt() * var_y.sqrt())
}

fn set_feature(vector: &mut FeatureVector, feature: Feature, value: f64) {
    match feature {
        Feature::Temperature => vector.temperature = value,
        Feature::TokenEfficiency => vector.token_efficiency = value,
        Feature::SemanticSimilarity => vector.semantic_similarity = value,
        Feature::LengthScore => vector.length_score = value,
        Feature::HistoricalPerformance => vector.historical_performance = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athanor_models::{
        GenerationRequest, Interaction, InteractionAction, Phase, Prompt, RankingWeights,
    };
    use athanor_storage::MemoryStorage;
    use uuid::Uuid;

    fn prompt_with_features(features: FeatureVector) -> Prompt {
        let request = GenerationRequest::new("training input");
        Prompt {
            id: Uuid::new_v4(),
            phase: Phase::Coagulatio,
            content: "content".to_string(),
            provider: "stub".to_string(),
            model: "stub-model".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            actual_tokens: 512,
            tags: Vec::new(),
            persona: None,
            embedding: None,
            embedding_provider: None,
            embedding_model: None,
            relevance_score: 0.0,
            features,
            original_input: request.input,
            session_id: request.session_id,
            created_at: Utc::now(),
        }
    }

    /// Seed storage with `n` prompt/interaction pairs where high semantic
    /// similarity co-occurs with being chosen.
    fn seed_correlated(storage: &MemoryStorage, n: usize) {
        for i in 0..n {
            let chosen = i % 2 == 0;
            let features = FeatureVector {
                semantic_similarity: if chosen { 0.9 } else { 0.1 },
                temperature: 0.5,
                token_efficiency: 0.5,
                length_score: 0.5,
                historical_performance: 0.5,
            };
            let prompt = prompt_with_features(features);
            storage.save_prompt(&prompt).unwrap();
            let action = if chosen {
                InteractionAction::Chosen
            } else {
                InteractionAction::Skipped
            };
            storage
                .record_interaction(&Interaction::new(prompt.id, prompt.session_id, action))
                .unwrap();
        }
    }

    fn trainer(storage: Arc<MemoryStorage>, store: Arc<WeightStore>) -> Trainer {
        Trainer::new(storage, store, TrainerParams::default())
    }

    #[test]
    fn update_step_matches_expected_delta() {
        // correlation 0.5 at rate 0.1 moves 0.3 to 0.35 before
        // renormalization.
        assert!((updated_weight(0.3, 0.5, 0.1) - 0.35).abs() < 1e-12);
    }

    #[test]
    fn update_step_clamps_at_zero() {
        assert_eq!(updated_weight(0.05, -1.0, 0.1), 0.0);
    }

    #[test]
    fn correlation_of_linear_series_is_one() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson_correlation(&xs, &ys) - 1.0).abs() < 1e-9);

        let inverted = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson_correlation(&xs, &inverted) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn correlation_of_constant_series_is_zero() {
        let xs = [0.5, 0.5, 0.5];
        let ys = [0.0, 1.0, 0.0];
        assert_eq!(pearson_correlation(&xs, &ys), 0.0);
    }

    #[test]
    fn below_min_interactions_is_noop_without_persist() {
        let storage = Arc::new(MemoryStorage::new());
        seed_correlated(&storage, 3);
        let store = Arc::new(WeightStore::default());

        let run = trainer(Arc::clone(&storage), store).run_training(false).unwrap();
        assert_eq!(run.interactions_seen, 3);
        assert!(!run.updated);
        assert_eq!(run.applied_deltas, FeatureVector::default());
        // Nothing was persisted.
        assert!(storage.load_weights().unwrap().is_none());
    }

    #[test]
    fn training_moves_correlated_weight_up() {
        let storage = Arc::new(MemoryStorage::new());
        seed_correlated(&storage, 10);
        let store = Arc::new(WeightStore::default());
        let before = *store.snapshot();

        let run = trainer(Arc::clone(&storage), Arc::clone(&store))
            .run_training(false)
            .unwrap();

        assert!(run.updated);
        assert!(run.correlations.semantic_similarity > 0.9);
        assert!(run.applied_deltas.semantic_similarity > 0.0);

        let after = *store.snapshot();
        // Renormalized, non-negative, and tilted toward the correlated
        // feature.
        assert!((after.total() - 1.0).abs() < 1e-9);
        assert!(after.is_valid());
        assert!(
            after.semantic_similarity / after.total()
                > before.semantic_similarity / before.total()
        );
        // Persisted snapshot carries a watermark.
        let snapshot = storage.load_weights().unwrap().unwrap();
        assert!(snapshot.watermark.is_some());
        assert_eq!(snapshot.weights, after);
    }

    #[test]
    fn dry_run_reports_without_persisting() {
        let storage = Arc::new(MemoryStorage::new());
        seed_correlated(&storage, 10);
        let store = Arc::new(WeightStore::default());
        let before = *store.snapshot();

        let run = trainer(Arc::clone(&storage), Arc::clone(&store))
            .run_training(true)
            .unwrap();

        assert!(!run.updated);
        assert!(run.correlations.semantic_similarity > 0.9);
        assert!(storage.load_weights().unwrap().is_none());
        assert_eq!(*store.snapshot(), before);
    }

    #[test]
    fn weights_stay_non_negative_under_negative_correlation() {
        let storage = Arc::new(MemoryStorage::new());
        // High length score co-occurs with being skipped.
        for i in 0..10 {
            let skipped = i % 2 == 0;
            let features = FeatureVector {
                length_score: if skipped { 0.9 } else { 0.1 },
                ..FeatureVector::default()
            };
            let prompt = prompt_with_features(features);
            storage.save_prompt(&prompt).unwrap();
            let action = if skipped {
                InteractionAction::Skipped
            } else {
                InteractionAction::Chosen
            };
            storage
                .record_interaction(&Interaction::new(prompt.id, prompt.session_id, action))
                .unwrap();
        }

        // Start with a tiny weight so the negative step clamps at zero.
        let mut initial = RankingWeights::default();
        initial.set(Feature::LengthScore, 0.01);
        let store = Arc::new(WeightStore::new(initial));

        let run = trainer(Arc::clone(&storage), Arc::clone(&store))
            .run_training(false)
            .unwrap();

        assert!(run.correlations.length_score < -0.9);
        let after = *store.snapshot();
        assert!(after.is_valid());
        assert_eq!(after.length_score, 0.0);
    }

    #[test]
    fn watermark_prevents_reconsuming_interactions() {
        let storage = Arc::new(MemoryStorage::new());
        seed_correlated(&storage, 10);
        let store = Arc::new(WeightStore::default());
        let trainer = trainer(Arc::clone(&storage), store);

        let first = trainer.run_training(false).unwrap();
        assert_eq!(first.interactions_seen, 10);

        // Same interactions again: all consumed, run is a no-op.
        let second = trainer.run_training(false).unwrap();
        assert_eq!(second.interactions_seen, 0);
        assert!(!second.updated);
    }
}
