//! Validation rules

use serde_json::Value;

use super::validity::ValidityState;
use crate::control::Control;

/// A check bound to one control attribute
///
/// A rule applies to a control when the control has a non-null value for
/// the attribute named by [`rule_type`](Rule::rule_type); that value is the
/// rule's configuration (a `maxLength` of `10`, a `required` of `true`).
pub trait Rule: Send + Sync {
    /// The attribute this rule is keyed on
    fn rule_type(&self) -> &str;

    /// Check `value` for `control`
    fn check(&self, value: &Value, control: &dyn Control) -> ValidityState;

    /// The control's configuration for this rule, `Null` when it does not apply
    fn limit(&self, control: &dyn Control) -> Value {
        control.get(self.rule_type())
    }

    fn applies_to(&self, control: &dyn Control) -> bool {
        !self.limit(control).is_null()
    }
}
