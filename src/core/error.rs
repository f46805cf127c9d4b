//! Engine error types.
//!
//! Errors fall into three classes:
//!
//! - **Configuration errors**: unknown ids, missing params, bad numeric
//!   results. These indicate a content or evaluator bug.
//! - **Invariant violations**: attempts to mutate derived parent amounts,
//!   negative bound increases or transfers, and similar.
//! - **Rejections**: expected gameplay outcomes (cannot afford an action,
//!   missing choice). The orchestration layer presents these as rejected
//!   moves rather than crashes; see [`EngineError::is_rejection`].

use crate::core::ids::{ActionId, ResourceId};

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the engine.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EngineError {
    // === Configuration ===
    #[error("unknown {kind} id '{id}'")]
    UnknownId { kind: &'static str, id: String },

    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("effect {effect} is missing required param '{param}'")]
    MissingParam { effect: String, param: String },

    #[error("param '{param}' of effect {effect} is invalid: expected {expected}")]
    InvalidParam {
        effect: String,
        param: String,
        expected: &'static str,
    },

    #[error("no effect handler registered for {0}")]
    UnknownEffectHandler(String),

    #[error("no evaluator registered for '{0}'")]
    UnknownEvaluator(String),

    #[error("resources '{first}' and '{second}' both declare a global action cost")]
    ConflictingGlobalActionCost { first: ResourceId, second: ResourceId },

    #[error("action '{action}' must cost exactly {expected} {resource}, found {found:?}")]
    GlobalActionCostMismatch {
        action: ActionId,
        resource: ResourceId,
        expected: i64,
        found: Option<i64>,
    },

    #[error("percent change on '{0}' requires a rounding mode")]
    MissingRounding(ResourceId),

    #[error("{context}: expected an integer, got {value}")]
    NonInteger { context: String, value: f64 },

    #[error("{context}: result is not finite")]
    NonFinite { context: String },

    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    // === Invariants ===
    #[error("'{0}' is a group parent; its amount is derived and cannot be changed directly")]
    ParentMutation(ResourceId),

    #[error("upper bound increase for '{resource}' must be non-negative, got {amount}")]
    NegativeBoundIncrease { resource: ResourceId, amount: i64 },

    #[error("transfer of '{resource}' must be non-negative, got {amount}")]
    NegativeTransfer { resource: ResourceId, amount: i64 },

    #[error("arithmetic overflow while changing '{0}'")]
    Overflow(ResourceId),

    // === Gameplay ===
    #[error(transparent)]
    Rejected(#[from] ActionRejection),
}

impl EngineError {
    /// Shorthand for an unknown-id configuration error.
    pub fn unknown(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::UnknownId {
            kind,
            id: id.to_string(),
        }
    }

    /// Shorthand for a duplicate-id configuration error.
    pub fn duplicate(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::DuplicateId {
            kind,
            id: id.to_string(),
        }
    }

    /// True for expected gameplay outcomes that should be shown as a
    /// rejected move rather than treated as a fatal error.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Expected gameplay outcomes that reject a move.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionRejection {
    #[error("insufficient {resource}: need {required}, have {available}")]
    InsufficientResource {
        resource: ResourceId,
        required: i64,
        available: i64,
    },

    #[error("action '{action}' requires a choice for effect group '{group}'")]
    MissingChoice { action: ActionId, group: String },

    #[error("unknown option '{option}' for effect group '{group}'")]
    UnknownOption { group: String, option: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::unknown("resource", "mana");
        assert_eq!(err.to_string(), "unknown resource id 'mana'");

        let err = EngineError::ParentMutation(ResourceId::new("populationTotal"));
        assert!(err.to_string().contains("populationTotal"));
    }

    #[test]
    fn test_rejection_classification() {
        let rejected: EngineError = ActionRejection::InsufficientResource {
            resource: ResourceId::new("gold"),
            required: 3,
            available: 1,
        }
        .into();

        assert!(rejected.is_rejection());
        assert_eq!(rejected.to_string(), "insufficient gold: need 3, have 1");
        assert!(!EngineError::UnknownEvaluator("land".into()).is_rejection());
    }
}
