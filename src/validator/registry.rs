//! Priority-ordered rule registration and the validation pass

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use log::{debug, trace};
use serde_json::json;

use super::error::ValidationError;
use super::rule::Rule;
use super::validity::Validity;
use crate::control::Control;
use crate::events::{Event, Observable};

/// Rules sorted by ascending priority
///
/// Rules registered with equal priority keep their registration order.
#[derive(Default)]
pub struct RuleRegistry {
    rules: RwLock<Vec<(i32, Arc<dyn Rule>)>>,
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules: Vec<(i32, String)> = self
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(priority, rule)| (*priority, rule.rule_type().to_string()))
            .collect();
        f.debug_struct("RuleRegistry").field("rules", &rules).finish()
    }
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry used by [`validate`](super::validate)
    pub fn global() -> &'static RuleRegistry {
        static GLOBAL: OnceLock<RuleRegistry> = OnceLock::new();
        GLOBAL.get_or_init(RuleRegistry::new)
    }

    /// Add `rule`; lower priorities run first
    ///
    /// Fails when the rule has no type.
    pub fn register(&self, priority: i32, rule: Arc<dyn Rule>) -> Result<(), ValidationError> {
        if rule.rule_type().is_empty() {
            return Err(ValidationError::MissingRuleType);
        }
        debug!("registering rule `{}` at priority {}", rule.rule_type(), priority);

        let mut rules = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let at = rules.partition_point(|(existing, _)| *existing <= priority);
        rules.insert(at, (priority, rule));
        Ok(())
    }

    /// Snapshot of the registered rules in run order
    pub fn rules(&self) -> Vec<Arc<dyn Rule>> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, rule)| rule.clone())
            .collect()
    }

    /// Rules that apply to `control`, in run order
    pub fn rules_for(&self, control: &dyn Control) -> Vec<Arc<dyn Rule>> {
        self.rules()
            .into_iter()
            .filter(|rule| rule.applies_to(control))
            .collect()
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no rule is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every applicable rule against the control's `value` attribute
    ///
    /// Fires `beforevalidate` before the rules run, `invalid` when any rule
    /// fails and `aftervalidate` last. The latter two carry the result
    /// under `validity`.
    pub fn validate(&self, control: &dyn Control) -> Result<Validity, ValidationError> {
        control.fire(Event::new("beforevalidate"))?;

        let value = control.get("value");
        let mut validity = Validity::new();
        for rule in self.rules_for(control) {
            let state = rule.check(&value, control);
            trace!(
                "rule `{}` on `{}`: {}",
                rule.rule_type(),
                control.id(),
                state.is_valid()
            );
            validity.add_state(rule.rule_type(), state);
        }

        let data = json!({ "validity": validity });
        if !validity.is_valid() {
            control.fire(Event::with_data("invalid", data.clone()))?;
        }
        control.fire(Event::with_data("aftervalidate", data))?;
        Ok(validity)
    }
}
