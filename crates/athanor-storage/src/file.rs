//! File-backed storage: JSONL logs plus an atomically replaced snapshot.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use athanor_models::{Interaction, Prompt};

use crate::atomic::write_file_atomic;
use crate::{Storage, StorageError, WeightsSnapshot};

const PROMPTS_FILE: &str = "prompts.jsonl";
const INTERACTIONS_FILE: &str = "interactions.jsonl";
const WEIGHTS_FILE: &str = "weights.json";

/// Storage rooted at a data directory.
///
/// Prompts and interactions are append-only JSONL logs; the weights
/// snapshot is a single JSON document replaced atomically. Appends are
/// serialized through a mutex so concurrent chains cannot interleave
/// partial lines.
pub struct FileStorage {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (and create if needed) storage under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` when the directory cannot be created.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|source| StorageError::Io {
            path: data_dir.display().to_string(),
            source,
        })?;
        debug!(data_dir = %data_dir.display(), "Opened file storage");
        Ok(Self {
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    fn append_line(&self, file: &str, line: &str) -> Result<(), StorageError> {
        let path = self.path(file);
        let io_err = |source: std::io::Error| StorageError::Io {
            path: path.display().to_string(),
            source,
        };

        let _guard = self.write_lock.lock().expect("storage write lock poisoned");
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        handle.write_all(line.as_bytes()).map_err(io_err)?;
        handle.write_all(b"\n").map_err(io_err)?;
        Ok(())
    }

    fn read_lines<T: serde::de::DeserializeOwned>(
        &self,
        file: &str,
    ) -> Result<Vec<T>, StorageError> {
        let path = self.path(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let io_err = |source: std::io::Error| StorageError::Io {
            path: path.display().to_string(),
            source,
        };

        let reader = BufReader::new(std::fs::File::open(&path).map_err(io_err)?);
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(io_err)?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| StorageError::Corrupt {
                path: path.display().to_string(),
                reason: format!("line {}: {e}", index + 1),
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

impl Storage for FileStorage {
    fn save_prompt(&self, prompt: &Prompt) -> Result<(), StorageError> {
        let line = serde_json::to_string(prompt).map_err(|e| StorageError::Corrupt {
            path: self.path(PROMPTS_FILE).display().to_string(),
            reason: e.to_string(),
        })?;
        self.append_line(PROMPTS_FILE, &line)
    }

    fn get_prompt(&self, id: Uuid) -> Result<Option<Prompt>, StorageError> {
        let prompts: Vec<Prompt> = self.read_lines(PROMPTS_FILE)?;
        Ok(prompts.into_iter().find(|p| p.id == id))
    }

    fn record_interaction(&self, interaction: &Interaction) -> Result<(), StorageError> {
        let line = serde_json::to_string(interaction).map_err(|e| StorageError::Corrupt {
            path: self.path(INTERACTIONS_FILE).display().to_string(),
            reason: e.to_string(),
        })?;
        self.append_line(INTERACTIONS_FILE, &line)
    }

    fn interactions_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Interaction>, StorageError> {
        let interactions: Vec<Interaction> = self.read_lines(INTERACTIONS_FILE)?;
        Ok(interactions
            .into_iter()
            .filter(|i| since.is_none_or(|ts| i.timestamp > ts))
            .collect())
    }

    fn load_weights(&self) -> Result<Option<WeightsSnapshot>, StorageError> {
        let path = self.path(WEIGHTS_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| StorageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot = serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(snapshot))
    }

    fn store_weights(&self, snapshot: &WeightsSnapshot) -> Result<(), StorageError> {
        let path = self.path(WEIGHTS_FILE);
        let raw = serde_json::to_string_pretty(snapshot).map_err(|e| StorageError::Corrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        write_file_atomic(&path, &raw)
    }
}
