use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the user did with a presented candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    /// The candidate was selected.
    Chosen,
    /// The candidate was passed over.
    Skipped,
}

impl InteractionAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chosen => "chosen",
            Self::Skipped => "skipped",
        }
    }
}

/// One recorded user decision about a candidate.
///
/// Interactions are append-only. They are produced by the interactive
/// surface and consumed only by the trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    /// The candidate the decision applies to.
    pub prompt_id: Uuid,
    /// Session that presented the candidate.
    pub session_id: Uuid,
    pub action: InteractionAction,
    /// Outcome score in `[0, 1]`; 1.0 for a plain "chosen".
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    /// Record a decision on a prompt within a session.
    #[must_use]
    pub fn new(prompt_id: Uuid, session_id: Uuid, action: InteractionAction) -> Self {
        let score = match action {
            InteractionAction::Chosen => 1.0,
            InteractionAction::Skipped => 0.0,
        };
        Self {
            id: Uuid::new_v4(),
            prompt_id,
            session_id,
            action,
            score,
            timestamp: Utc::now(),
        }
    }

    /// The outcome value training correlates feature values against.
    #[must_use]
    pub fn outcome(&self) -> f64 {
        match self.action {
            InteractionAction::Chosen => self.score.clamp(0.0, 1.0),
            InteractionAction::Skipped => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chosen_defaults_to_full_outcome() {
        let i = Interaction::new(Uuid::new_v4(), Uuid::new_v4(), InteractionAction::Chosen);
        assert_eq!(i.outcome(), 1.0);
    }

    #[test]
    fn skipped_outcome_is_zero_even_with_score() {
        let mut i = Interaction::new(Uuid::new_v4(), Uuid::new_v4(), InteractionAction::Skipped);
        i.score = 0.9;
        assert_eq!(i.outcome(), 0.0);
    }
}
