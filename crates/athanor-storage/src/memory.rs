//! In-memory storage for embedding and tests.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use athanor_models::{Interaction, Prompt};

use crate::{Storage, StorageError, WeightsSnapshot};

/// Non-persistent storage holding everything in process memory.
///
/// Useful for serve-without-persistence setups and as a test double; the
/// behavior mirrors [`crate::FileStorage`] minus durability.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    prompts: Vec<Prompt>,
    interactions: Vec<Interaction>,
    weights: Option<WeightsSnapshot>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored prompts.
    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.inner.lock().expect("memory storage lock poisoned").prompts.len()
    }
}

impl Storage for MemoryStorage {
    fn save_prompt(&self, prompt: &Prompt) -> Result<(), StorageError> {
        self.inner
            .lock()
            .expect("memory storage lock poisoned")
            .prompts
            .push(prompt.clone());
        Ok(())
    }

    fn get_prompt(&self, id: Uuid) -> Result<Option<Prompt>, StorageError> {
        Ok(self
            .inner
            .lock()
            .expect("memory storage lock poisoned")
            .prompts
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    fn record_interaction(&self, interaction: &Interaction) -> Result<(), StorageError> {
        self.inner
            .lock()
            .expect("memory storage lock poisoned")
            .interactions
            .push(interaction.clone());
        Ok(())
    }

    fn interactions_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Interaction>, StorageError> {
        Ok(self
            .inner
            .lock()
            .expect("memory storage lock poisoned")
            .interactions
            .iter()
            .filter(|i| since.is_none_or(|ts| i.timestamp > ts))
            .cloned()
            .collect())
    }

    fn load_weights(&self) -> Result<Option<WeightsSnapshot>, StorageError> {
        Ok(self
            .inner
            .lock()
            .expect("memory storage lock poisoned")
            .weights
            .clone())
    }

    fn store_weights(&self, snapshot: &WeightsSnapshot) -> Result<(), StorageError> {
        self.inner
            .lock()
            .expect("memory storage lock poisoned")
            .weights = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athanor_models::{InteractionAction, RankingWeights};

    #[test]
    fn interactions_respect_watermark() {
        let storage = MemoryStorage::new();
        let mut old = Interaction::new(Uuid::new_v4(), Uuid::new_v4(), InteractionAction::Chosen);
        old.timestamp = Utc::now() - chrono::Duration::days(1);
        storage.record_interaction(&old).unwrap();
        storage
            .record_interaction(&Interaction::new(
                Uuid::new_v4(),
                Uuid::new_v4(),
                InteractionAction::Skipped,
            ))
            .unwrap();

        let watermark = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(storage.interactions_since(Some(watermark)).unwrap().len(), 1);
        assert_eq!(storage.interactions_since(None).unwrap().len(), 2);
    }

    #[test]
    fn weights_replace_previous_snapshot() {
        let storage = MemoryStorage::new();
        storage
            .store_weights(&WeightsSnapshot::new(RankingWeights::default()))
            .unwrap();

        let mut updated = RankingWeights::default();
        updated.set(athanor_models::Feature::SemanticSimilarity, 0.9);
        storage
            .store_weights(&WeightsSnapshot::new(updated))
            .unwrap();

        let loaded = storage.load_weights().unwrap().unwrap();
        assert_eq!(loaded.weights, updated);
    }
}
