//! Error types for validation

use crate::events::EventError;

/// Errors raised while registering rules or running a validation pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A rule reported an empty `rule_type`
    #[error("validation rule has no type")]
    MissingRuleType,

    /// A validation event could not be fired
    #[error(transparent)]
    Event(#[from] EventError),
}
