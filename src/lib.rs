//! ESUI control infrastructure
//!
//! - [`events`]: typed event targets with re-entrant dispatch and delegation
//! - [`control`]: the control contract plus a basic and a null implementation
//! - [`view`]: view contexts that scope controls by id and by group
//! - [`validator`]: priority-ordered validation rules
pub mod control;
pub mod events;
pub mod validator;
pub mod view;

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export of common types for convenience
pub mod prelude {
    pub use crate::control::{BasicControl, Control, ControlRef, SafeControl};
    pub use crate::events::{
        delegate_remap, delegate_same_type, DeriveOptions, Event, EventTarget, Handler, Listener,
        ListenerOptions, Observable, Owner,
    };
    pub use crate::validator::{Rule, RuleRegistry, Validity, ValidityState};
    pub use crate::view::{ControlCollection, ControlGroup, ControlSet, ViewContext};
    pub use crate::Error;
}

/// Errors that can occur anywhere in the crate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Event error: {0}")]
    Event(#[from] events::EventError),

    #[error("View error: {0}")]
    View(#[from] view::ViewError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationError),
}
