//! Storage interfaces and file-backed persistence for athanor
//!
//! The serving path and the trainer talk to storage through the
//! [`Storage`] trait. Two implementations are provided: [`FileStorage`],
//! which keeps append-only JSONL logs plus an atomically replaced weights
//! snapshot under a data directory, and [`MemoryStorage`] for embedding
//! and tests. Schema migration of an external database is deliberately
//! not handled here.

mod atomic;
mod file;
mod memory;

pub use atomic::write_file_atomic;
pub use file::FileStorage;
pub use memory::MemoryStorage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use athanor_models::{Interaction, Prompt, RankingWeights};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failure at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record in {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

/// A persisted weight vector plus the training watermark.
///
/// The watermark records the timestamp of the last interaction consumed by
/// a successful training run; the next run reads interactions after it.
/// Snapshots are always written whole so readers never observe a partially
/// updated weight vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsSnapshot {
    pub weights: RankingWeights,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<DateTime<Utc>>,
}

impl WeightsSnapshot {
    /// Snapshot of the given weights taken now, with no watermark.
    #[must_use]
    pub fn new(weights: RankingWeights) -> Self {
        Self {
            weights,
            updated_at: Utc::now(),
            watermark: None,
        }
    }
}

/// Persistence operations required by the pipeline and the trainer.
///
/// Implementations must be safe to share across tasks; the generation path
/// only appends, and the trainer is the sole writer of weight snapshots.
pub trait Storage: Send + Sync {
    /// Persist a generated prompt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the record cannot be written.
    fn save_prompt(&self, prompt: &Prompt) -> Result<(), StorageError>;

    /// Look up a prompt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store cannot be read.
    fn get_prompt(&self, id: Uuid) -> Result<Option<Prompt>, StorageError>;

    /// Append a user interaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the record cannot be written.
    fn record_interaction(&self, interaction: &Interaction) -> Result<(), StorageError>;

    /// All interactions recorded strictly after `since`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the backing store cannot be read.
    fn interactions_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Interaction>, StorageError>;

    /// The current persisted weight snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the snapshot exists but cannot be read.
    fn load_weights(&self) -> Result<Option<WeightsSnapshot>, StorageError>;

    /// Replace the weight snapshot. The write is all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the snapshot cannot be written.
    fn store_weights(&self, snapshot: &WeightsSnapshot) -> Result<(), StorageError>;
}
