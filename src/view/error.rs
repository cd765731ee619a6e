//! Error types for view scoping

use crate::events::EventError;

/// Errors raised by view contexts and control groups
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// A group was requested without a name
    #[error("group name is missing")]
    MissingGroupName,

    /// The view context was disposed and cannot take controls
    #[error("view context `{0}` has been disposed")]
    ContextDisposed(String),

    /// An event operation failed
    #[error(transparent)]
    Event(#[from] EventError),
}
