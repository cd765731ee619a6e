//! Control validation
//!
//! Rules register against a [`RuleRegistry`] with a priority. A pass runs, in
//! priority order, every rule whose type names an attribute the control has a
//! value for, and reports a [`Validity`] through control events. No rules are
//! built in.

mod error;
mod registry;
mod rule;
mod validity;

pub use error::ValidationError;
pub use registry::RuleRegistry;
pub use rule::Rule;
pub use validity::{Validity, ValidityState};

use std::sync::Arc;

use crate::control::Control;

/// Register `rule` in the global registry
pub fn register(priority: i32, rule: Arc<dyn Rule>) -> Result<(), ValidationError> {
    RuleRegistry::global().register(priority, rule)
}

/// Validate `control` against the global registry
pub fn validate(control: &dyn Control) -> Result<Validity, ValidationError> {
    RuleRegistry::global().validate(control)
}
