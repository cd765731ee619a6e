//! Error types for event dispatch

/// Errors raised by the event system
///
/// Only usage errors are reported. Unsubscribing something that was never
/// subscribed, or firing a type nobody listens to, is not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// `fire` was called without a resolvable event type
    #[error("event type is missing")]
    MissingEventType,

    /// The wildcard type can be listened to but never fired
    #[error("event type `{0}` is reserved and cannot be fired")]
    ReservedEventType(String),

    /// The queue was disposed and no longer accepts listeners
    #[error("event queue for `{0}` has been disposed")]
    QueueDisposed(String),
}
