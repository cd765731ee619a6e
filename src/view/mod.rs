//! View scoping for ESUI controls
//!
//! A [`ViewContext`] owns the controls of one view, keyed by id, and keeps a
//! live [`ControlGroup`] per declared group name. Contexts are registered in
//! a [`ViewContextPool`]; the global pool backs [`ViewContext::new`] and
//! [`ViewContext::lookup`].

mod collection;
mod context;
mod error;
mod group;
mod pool;

pub use collection::{ControlCollection, ControlSet};
pub use context::{ViewContext, WeakViewContext};
pub use error::ViewError;
pub use group::ControlGroup;
pub use pool::{PoolConfig, ViewContextPool};
