//! Top-level error type aggregating every subsystem
//!
//! Library code returns `AthanorError` and never calls
//! `std::process::exit()`; the CLI maps errors to exit codes and prints
//! user-facing messages.

use thiserror::Error;

pub use athanor_config::ConfigError;
pub use athanor_engine::EngineError;
pub use athanor_learning::LearningError;
pub use athanor_providers::{ProviderError, RegistryError};
pub use athanor_storage::StorageError;

/// Any failure surfaced by the athanor library.
#[derive(Debug, Error)]
pub enum AthanorError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("generation error: {0}")]
    Engine(#[from] EngineError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("learning error: {0}")]
    Learning(#[from] LearningError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AthanorError {
    /// Map this error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;
        match self {
            Self::Config(_) => ExitCode::ConfigError,
            Self::Engine(EngineError::GenerationFailed { .. }) => ExitCode::GenerationFailed,
            Self::Engine(_) | Self::Registry(_) => ExitCode::ConfigError,
            Self::Provider(_) => ExitCode::ProviderFailure,
            Self::Storage(_) | Self::Io(_) => ExitCode::StorageFailure,
            Self::Learning(_) => ExitCode::StorageFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::ExitCode;

    #[test]
    fn generation_failure_maps_to_its_code() {
        let err = AthanorError::Engine(EngineError::GenerationFailed {
            count: 3,
            errors: vec![],
        });
        assert_eq!(err.to_exit_code(), ExitCode::GenerationFailed);
    }

    #[test]
    fn config_errors_map_to_usage_code() {
        let err = AthanorError::Config(ConfigError::NotFound {
            path: "athanor.yaml".to_string(),
        });
        assert_eq!(err.to_exit_code(), ExitCode::ConfigError);
    }
}
