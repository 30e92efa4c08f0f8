//! Copy-on-write weight snapshot store
//!
//! The ranking weights are the one piece of state mutated outside the
//! request path: the trainer publishes a complete replacement vector and
//! concurrent scoring must never observe a half-updated one. Readers take
//! an `Arc` snapshot once per request; the swap replaces the pointer, not
//! the value behind it.

use std::sync::{Arc, RwLock};

use tracing::info;

use athanor_models::RankingWeights;

/// Shared holder of the current weight snapshot.
pub struct WeightStore {
    current: RwLock<Arc<RankingWeights>>,
}

impl WeightStore {
    /// Create a store with an initial weight vector.
    #[must_use]
    pub fn new(initial: RankingWeights) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// The current snapshot. Callers hold the returned `Arc` for the
    /// duration of one scoring pass; later publishes do not affect it.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RankingWeights> {
        Arc::clone(&self.current.read().expect("weight store lock poisoned"))
    }

    /// Replace the snapshot. Visible to the next `snapshot()` call,
    /// never to scoring already in progress.
    pub fn publish(&self, weights: RankingWeights) {
        let mut guard = self.current.write().expect("weight store lock poisoned");
        *guard = Arc::new(weights);
        info!("Published new ranking weight snapshot");
    }
}

impl Default for WeightStore {
    fn default() -> Self {
        Self::new(RankingWeights::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athanor_models::Feature;

    #[test]
    fn held_snapshot_survives_publish() {
        let store = WeightStore::default();
        let before = store.snapshot();

        let mut updated = RankingWeights::default();
        updated.set(Feature::SemanticSimilarity, 0.9);
        store.publish(updated);

        // The old snapshot is unchanged; the new one is visible to new
        // readers.
        assert_eq!(before.semantic_similarity, 0.3);
        assert_eq!(store.snapshot().semantic_similarity, 0.9);
    }
}
