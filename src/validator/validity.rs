//! Results of a validation pass

use serde::Serialize;

/// Outcome of one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidityState {
    valid: bool,
    message: String,
}

impl ValidityState {
    /// Create an outcome with an explicit flag
    pub fn new(valid: bool, message: impl Into<String>) -> Self {
        Self {
            valid,
            message: message.into(),
        }
    }

    /// A passing outcome without a message
    pub fn valid() -> Self {
        Self::new(true, "")
    }

    /// A failing outcome explaining why
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(false, message)
    }

    /// Whether the rule passed
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Message for the user; empty for passing rules
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Every rule outcome of a pass, in rule order
///
/// Serializes as `{"valid": bool, "states": [{"type", "valid", "message"}]}`
/// so it can ride along as event data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validity {
    states: Vec<(String, ValidityState)>,
    custom_message: Option<String>,
}

impl Validity {
    /// An empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of rule `rule_type`, replacing an earlier one
    pub fn add_state(&mut self, rule_type: impl Into<String>, state: ValidityState) {
        let rule_type = rule_type.into();
        match self.states.iter_mut().find(|(name, _)| *name == rule_type) {
            Some((_, existing)) => *existing = state,
            None => self.states.push((rule_type, state)),
        }
    }

    /// Outcome of rule `rule_type`
    pub fn state(&self, rule_type: &str) -> Option<&ValidityState> {
        self.states
            .iter()
            .find(|(name, _)| name == rule_type)
            .map(|(_, state)| state)
    }

    /// Every outcome in rule order
    pub fn states(&self) -> impl Iterator<Item = (&str, &ValidityState)> {
        self.states.iter().map(|(name, state)| (name.as_str(), state))
    }

    /// Valid when every recorded state is valid; an empty pass is valid
    pub fn is_valid(&self) -> bool {
        self.states.iter().all(|(_, state)| state.is_valid())
    }

    /// Messages of the failing rules
    pub fn messages(&self) -> Vec<&str> {
        self.states
            .iter()
            .filter(|(_, state)| !state.is_valid())
            .map(|(_, state)| state.message())
            .collect()
    }

    /// Message shown instead of the per-rule ones
    pub fn set_custom_message(&mut self, message: impl Into<String>) {
        self.custom_message = Some(message.into());
    }

    /// The message set with [`set_custom_message`](Self::set_custom_message)
    pub fn custom_message(&self) -> Option<&str> {
        self.custom_message.as_deref()
    }
}

impl Serialize for Validity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        #[derive(Serialize)]
        struct Entry<'a> {
            #[serde(rename = "type")]
            rule_type: &'a str,
            #[serde(flatten)]
            state: &'a ValidityState,
        }

        let states: Vec<Entry<'_>> = self
            .states
            .iter()
            .map(|(rule_type, state)| Entry { rule_type, state })
            .collect();

        let mut out = serializer.serialize_struct("Validity", 3)?;
        out.serialize_field("valid", &self.is_valid())?;
        out.serialize_field("states", &states)?;
        out.serialize_field("customMessage", &self.custom_message)?;
        out.end()
    }
}
