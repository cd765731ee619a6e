//! Event system for ESUI controls
//!
//! The event system provides:
//! - An event envelope with monotonic cancellation flags and loose data
//! - Ordered listener queues that tolerate removal during dispatch
//! - Event targets with inline, typed and wildcard dispatch phases
//! - Delegation of events from one target to another

pub mod delegation;
pub mod error;
pub mod event;
pub mod native;
pub mod queue;
pub mod target;

pub use delegation::{delegate_remap, delegate_same_type};
pub use error::EventError;
pub use event::{DeriveOptions, Event, IntoEvent, WILDCARD};
pub use native::NativeEvent;
pub use queue::{EventQueue, Handler, Listener, ListenerOptions, Owner};
pub use target::{EventTarget, Observable, WeakEventTarget};
