//! Configuration management for athanor
//!
//! Loads the YAML configuration file that operators edit directly. Key
//! names under `providers`, `phases`, `generation`, `ranking`, and
//! `learning` are stable: dry-run diffs and external tooling depend on
//! them.
//!
//! Precedence is CLI flags > config file > built-in defaults; this crate
//! handles the file and defaults, the CLI layer applies its overrides on
//! top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use athanor_models::{Phase, PhaseConfig, RankingWeights};

/// Default config file name searched for in the working directory and
/// upwards.
pub const CONFIG_FILE_NAME: &str = "athanor.yaml";

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path}")]
    NotFound { path: String },

    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {path}: {reason}")]
    InvalidFile { path: String, reason: String },

    #[error("configuration validation failed: {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },
}

/// Settings for one generation provider.
///
/// API keys are referenced indirectly through environment variable names
/// so the configuration file itself never contains credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Override for the provider's API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default generation model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Default embedding model, for providers that embed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// Per-provider generation timeout override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_timeout_secs: Option<u64>,
}

/// The `generation` section: concurrency and request defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum number of generation chains in flight at once.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Candidate count used when a request does not specify one.
    #[serde(default = "default_count")]
    pub default_count: usize,
    /// Temperature used when a request does not specify one.
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    /// Token budget used when a request does not specify one.
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    /// Per-provider-call timeout in seconds.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_workers() -> usize {
    4
}
fn default_count() -> usize {
    3
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_generation_timeout() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            default_count: default_count(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

/// The `ranking.embedding` section: the canonical embedding backend.
///
/// Every embedding in the system is routed through one provider/model so
/// vectors stay comparable under cosine similarity, and the fallback scan
/// follows `fallback_priority` in order rather than map iteration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Preferred embedding provider.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// Embedding model identifier.
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding call timeout in seconds; embeddings are expected to be
    /// fast, so this is short.
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    /// Stable provider order scanned when the preferred provider cannot
    /// embed.
    #[serde(default = "default_fallback_priority")]
    pub fallback_priority: Vec<String>,
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_embedding_timeout() -> u64 {
    5
}
fn default_fallback_priority() -> Vec<String> {
    ["openai", "openrouter", "ollama", "anthropic"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout(),
            fallback_priority: default_fallback_priority(),
        }
    }
}

/// The `ranking` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Initial feature weights; replaced over time by training snapshots.
    #[serde(default)]
    pub weights: RankingWeights,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// The `learning.nightly_job` section: training schedule parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NightlyJobConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Runs with fewer interactions than this are a no-op.
    #[serde(default = "default_min_interactions")]
    pub min_interactions: usize,
    /// Features whose |correlation| is at or below this are left alone.
    #[serde(default = "default_correlation_threshold")]
    pub correlation_threshold: f64,
    /// Step size applied to the correlation when updating a weight.
    #[serde(default = "default_weight_update_rate")]
    pub weight_update_rate: f64,
}

fn default_true() -> bool {
    true
}
fn default_min_interactions() -> usize {
    5
}
fn default_correlation_threshold() -> f64 {
    0.1
}
fn default_weight_update_rate() -> f64 {
    0.1
}

impl Default for NightlyJobConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            min_interactions: default_min_interactions(),
            correlation_threshold: default_correlation_threshold(),
            weight_update_rate: default_weight_update_rate(),
        }
    }
}

/// The `learning` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningConfig {
    #[serde(default)]
    pub nightly_job: NightlyJobConfig,
}

/// Top-level athanor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider settings keyed by provider name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Default provider per phase, keyed by phase name.
    #[serde(default)]
    pub phases: HashMap<Phase, String>,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    /// Directory for prompts, interactions, and weight snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist,
    /// `ConfigError::Io` / `ConfigError::InvalidFile` on read or parse
    /// failure, and `ConfigError::ValidationFailed` when the parsed file
    /// is inconsistent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self =
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::InvalidFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Discover a config file by walking up from `start`, falling back to
    /// built-in defaults when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error only for files that exist but fail to parse or
    /// validate; absence is not an error.
    pub fn discover(start: &Path) -> Result<Self, ConfigError> {
        let mut dir = Some(start);
        while let Some(current) = dir {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                return Self::load(&candidate);
            }
            dir = current.parent();
        }
        debug!("No configuration file found, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Ordered phase defaults as explicit phase/provider pairings.
    #[must_use]
    pub fn phase_configs(&self) -> Vec<PhaseConfig> {
        Phase::ALL
            .iter()
            .filter_map(|phase| {
                self.phases
                    .get(phase)
                    .map(|provider| PhaseConfig::new(*phase, provider.clone()))
            })
            .collect()
    }

    /// Check internal consistency, collecting every problem found.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` listing all violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        for (phase, provider) in &self.phases {
            if !self.providers.contains_key(provider) {
                errors.push(format!(
                    "phases.{phase} references unknown provider '{provider}'"
                ));
            }
        }

        if self.generation.workers == 0 {
            errors.push("generation.workers must be at least 1".to_string());
        }
        if self.generation.default_count == 0 {
            errors.push("generation.default_count must be at least 1".to_string());
        }

        if !self.ranking.weights.is_valid() {
            errors.push("ranking.weights must be non-negative and finite".to_string());
        }

        for name in &self.ranking.embedding.fallback_priority {
            if !self.providers.is_empty() && !self.providers.contains_key(name) {
                debug!(provider = %name, "Embedding fallback entry has no provider section");
            }
        }

        let job = &self.learning.nightly_job;
        if job.weight_update_rate < 0.0 || !job.weight_update_rate.is_finite() {
            errors.push("learning.nightly_job.weight_update_rate must be non-negative".to_string());
        }
        if !(0.0..=1.0).contains(&job.correlation_threshold) {
            errors.push(
                "learning.nightly_job.correlation_threshold must be within [0, 1]".to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed { errors })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
providers:
  openai:
    api_key_env: OPENAI_API_KEY
    model: o4-mini
    embedding_model: text-embedding-3-small
  anthropic:
    api_key_env: ANTHROPIC_API_KEY
    model: claude-sonnet-4-5
  ollama:
    base_url: "http://localhost:11434"
    model: llama3
    embedding_model: nomic-embed-text
    generation_timeout_secs: 300
phases:
  prima-materia: openai
  solutio: anthropic
  coagulatio: openai
generation:
  workers: 2
  timeout_secs: 90
ranking:
  weights:
    temperature: 0.2
    token_efficiency: 0.2
    semantic_similarity: 0.3
    length_score: 0.1
    historical_performance: 0.2
  embedding:
    provider: openai
    model: text-embedding-3-small
    timeout_secs: 5
    fallback_priority: [openai, ollama]
learning:
  nightly_job:
    enabled: true
    min_interactions: 5
    correlation_threshold: 0.1
    weight_update_rate: 0.1
"#;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn load_parses_all_sections() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, SAMPLE);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.providers.len(), 3);
        assert_eq!(
            config.phases.get(&Phase::Solutio),
            Some(&"anthropic".to_string())
        );
        assert_eq!(config.generation.workers, 2);
        assert_eq!(config.generation.timeout_secs, 90);
        assert_eq!(config.ranking.embedding.fallback_priority, ["openai", "ollama"]);
        assert_eq!(config.learning.nightly_job.min_interactions, 5);
    }

    #[test]
    fn phase_configs_follow_pipeline_order() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, SAMPLE);

        let config = Config::load(&path).unwrap();
        let configs = config.phase_configs();
        assert_eq!(configs.len(), 3);
        assert_eq!(configs[0].phase, Phase::PrimaMateria);
        assert_eq!(configs[0].provider, "openai");
        assert_eq!(configs[1].phase, Phase::Solutio);
        assert_eq!(configs[2].phase, Phase::Coagulatio);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(&dir.path().join("nope.yaml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn discover_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.generation.workers, 4);
        assert!(config.phases.is_empty());
    }

    #[test]
    fn discover_walks_up_to_parent() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, SAMPLE);
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::discover(&nested).unwrap();
        assert_eq!(config.generation.workers, 2);
    }

    #[test]
    fn validation_rejects_unknown_phase_provider() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
providers:
  openai: { model: o4-mini }
phases:
  solutio: missing-provider
"#,
        );

        let err = Config::load(&path).unwrap_err();
        match err {
            ConfigError::ValidationFailed { errors } => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("missing-provider"));
            }
            other => panic!("expected validation failure, got: {other}"),
        }
    }

    #[test]
    fn validation_collects_multiple_errors() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
phases:
  solutio: nowhere
generation:
  workers: 0
learning:
  nightly_job:
    correlation_threshold: 3.0
"#,
        );

        let err = Config::load(&path).unwrap_err();
        match err {
            ConfigError::ValidationFailed { errors } => {
                assert_eq!(errors.len(), 3);
            }
            other => panic!("expected validation failure, got: {other}"),
        }
    }

    #[test]
    fn invalid_yaml_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "providers: [not, a, map");

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::InvalidFile { .. })));
    }
}
