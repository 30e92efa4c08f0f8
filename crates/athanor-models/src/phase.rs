use serde::{Deserialize, Serialize};

/// Transformation phases applied to a prompt request.
///
/// A request moves through an ordered subset of these phases; each phase
/// rewrites the material produced by the previous one.
///
/// # Phase Order
///
/// ```text
/// PrimaMateria → Solutio → Coagulatio
/// ```
///
/// - `PrimaMateria`: extracts and structures the raw request.
/// - `Solutio`: dissolves the structured prompt into natural language.
/// - `Coagulatio`: crystallizes the final, refined form.
///
/// # Serialization
///
/// Phases serialize to their kebab-case names (`"prima-materia"`,
/// `"solutio"`, `"coagulatio"`), which are also the names used in
/// configuration files and CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Raw extraction and structuring of the request.
    PrimaMateria,
    /// Dissolution into flowing, natural language.
    Solutio,
    /// Crystallization into the final form.
    Coagulatio,
}

impl Phase {
    /// All phases in pipeline order.
    pub const ALL: [Self; 3] = [Self::PrimaMateria, Self::Solutio, Self::Coagulatio];

    /// Returns the canonical kebab-case name of the phase.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaMateria => "prima-materia",
            Self::Solutio => "solutio",
            Self::Coagulatio => "coagulatio",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown phase name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown phase '{0}' (expected prima-materia, solutio, or coagulatio)")]
pub struct PhaseParseError(pub String);

impl std::str::FromStr for Phase {
    type Err = PhaseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prima-materia" => Ok(Self::PrimaMateria),
            "solutio" => Ok(Self::Solutio),
            "coagulatio" => Ok(Self::Coagulatio),
            other => Err(PhaseParseError(other.to_string())),
        }
    }
}

/// Maps a phase to the provider configured to execute it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// The phase this entry configures.
    pub phase: Phase,
    /// Name of the provider that executes this phase.
    pub provider: String,
}

impl PhaseConfig {
    /// Create a phase/provider pairing.
    #[must_use]
    pub fn new(phase: Phase, provider: impl Into<String>) -> Self {
        Self {
            phase,
            provider: provider.into(),
        }
    }
}

/// Execution state of a single phase within a chain.
///
/// Recorded on chain reports for observability; a phase moves
/// `Pending → Dispatched → Succeeded | Failed` and never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseState {
    /// Not yet dispatched to a provider.
    Pending,
    /// Provider call in flight.
    Dispatched,
    /// Provider call completed and produced content.
    Succeeded,
    /// Provider call failed; the chain is aborted.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn phase_round_trips_through_str() {
        for phase in Phase::ALL {
            let parsed = Phase::from_str(phase.as_str()).unwrap();
            assert_eq!(parsed, phase);
        }
    }

    #[test]
    fn phase_rejects_unknown_name() {
        let err = Phase::from_str("albedo").unwrap_err();
        assert!(err.to_string().contains("albedo"));
    }

    #[test]
    fn phase_serializes_kebab_case() {
        let json = serde_json::to_string(&Phase::PrimaMateria).unwrap();
        assert_eq!(json, "\"prima-materia\"");
    }

    #[test]
    fn all_is_in_pipeline_order() {
        assert_eq!(
            Phase::ALL,
            [Phase::PrimaMateria, Phase::Solutio, Phase::Coagulatio]
        );
    }
}
