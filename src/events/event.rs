//! The event envelope passed to every listener
//!
//! An [`Event`] carries its type, the target that fired it, a bag of extra
//! data fields and three cancellation flags. The flags only ever go from
//! `false` to `true`. An event derived from a host event or from another
//! event forwards its cancellation calls to that source before flipping its
//! own flags.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::native::{self, NativeEvent};
use super::target::EventTarget;

/// Event type that matches every fired event. It can be listened to but not fired.
pub const WILDCARD: &str = "*";

/// Keys that are never copied when deriving with `preserve_data`
const NON_DATA_KEYS: [&str; 8] = [
    "type",
    "target",
    "preventDefault",
    "isDefaultPrevented",
    "stopPropagation",
    "isPropagationStopped",
    "stopImmediatePropagation",
    "isImmediatePropagationStopped",
];

/// Cancellation state shared between an event and whatever it forwards to
#[derive(Default)]
pub(crate) struct EventState {
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
    immediate_propagation_stopped: Cell<bool>,
    native: Option<Rc<dyn NativeEvent>>,
    source: Option<Rc<EventState>>,
}

impl EventState {
    fn prevent_default(&self) {
        if let Some(native) = &self.native {
            native::prevent_default(native.as_ref());
        }
        if let Some(source) = &self.source {
            source.prevent_default();
        }
        self.default_prevented.set(true);
    }

    fn stop_propagation(&self) {
        if let Some(native) = &self.native {
            native::stop_propagation(native.as_ref());
        }
        if let Some(source) = &self.source {
            source.stop_propagation();
        }
        self.propagation_stopped.set(true);
    }

    fn stop_immediate_propagation(&self) {
        if let Some(native) = &self.native {
            native::stop_immediate_propagation(native.as_ref());
        }
        if let Some(source) = &self.source {
            source.stop_immediate_propagation();
        }
        self.immediate_propagation_stopped.set(true);
        self.stop_propagation();
    }
}

/// Options for [`Event::derive`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeriveOptions {
    /// Type of the new event, defaults to the original's type
    #[serde(rename = "type")]
    pub event_type: Option<String>,

    /// Copy the original's data fields
    pub preserve_data: bool,

    /// Forward cancellation on the new event back to the original
    pub sync_state: bool,

    /// Fields merged onto the new event last
    pub extend: Option<Map<String, Value>>,
}

impl DeriveOptions {
    /// Default options: same type, no data, independent state
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different type for the derived event
    pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Copy data fields from the original
    pub fn preserve_data(mut self) -> Self {
        self.preserve_data = true;
        self
    }

    /// Forward cancellation back to the original
    pub fn sync_state(mut self) -> Self {
        self.sync_state = true;
        self
    }

    /// Merge extra fields onto the derived event
    pub fn extend(mut self, fields: Map<String, Value>) -> Self {
        self.extend = Some(fields);
        self
    }
}

/// A single occurrence of a named signal
pub struct Event {
    event_type: String,
    target: Option<EventTarget>,
    fields: Map<String, Value>,
    state: Rc<EventState>,
}

impl Event {
    /// Create an event with a type and no data
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            target: None,
            fields: Map::new(),
            state: Rc::new(EventState::default()),
        }
    }

    /// Create an event with a type and extra data
    ///
    /// An object is merged field by field; its `type` field is only used when
    /// `event_type` is empty. Any other truthy value is kept under `data`.
    pub fn with_data(event_type: impl Into<String>, data: Value) -> Self {
        let mut event = Self::new(event_type);
        match data {
            Value::Object(fields) => {
                if event.event_type.is_empty() {
                    if let Some(Value::String(embedded)) = fields.get("type") {
                        event.event_type = embedded.clone();
                    }
                }
                event.merge(fields, false);
            }
            data if is_truthy(&data) => {
                event.fields.insert("data".to_string(), data);
            }
            _ => {}
        }
        event
    }

    /// Create an event from a single argument object carrying its own `type`
    pub fn from_value(args: Value) -> Self {
        Self::with_data(String::new(), args)
    }

    /// Create an event bridged to a host event
    ///
    /// Cancelling the returned event also cancels `native`. The type defaults
    /// to the host's own type.
    pub fn from_native(
        native: Rc<dyn NativeEvent>,
        event_type: Option<&str>,
        args: Option<Value>,
    ) -> Self {
        let event_type = event_type
            .map(str::to_string)
            .unwrap_or_else(|| native.event_type());
        let mut event = Self::with_data(event_type, args.unwrap_or(Value::Null));
        event.state = Rc::new(EventState {
            native: Some(native),
            ..EventState::default()
        });
        event
    }

    /// Derive a new event from `original`
    ///
    /// With `sync_state` the new event forwards every cancellation call to
    /// `original` before flipping its own flags.
    pub fn derive(original: &Event, options: DeriveOptions) -> Self {
        let DeriveOptions {
            event_type,
            preserve_data,
            sync_state,
            extend,
        } = options;

        let mut event = Self::new(event_type.unwrap_or_else(|| original.event_type.clone()));

        if preserve_data {
            for (key, value) in &original.fields {
                if !NON_DATA_KEYS.contains(&key.as_str()) {
                    event.fields.insert(key.clone(), value.clone());
                }
            }
        }

        if sync_state {
            event.state = Rc::new(EventState {
                source: Some(Rc::clone(&original.state)),
                ..EventState::default()
            });
        }

        if let Some(extend) = extend {
            event.merge(extend, true);
        }

        event
    }

    // `type` is adopted only when asked to, `target` is never a data field
    fn merge(&mut self, fields: Map<String, Value>, adopt_type: bool) {
        for (key, value) in fields {
            match key.as_str() {
                "type" => {
                    if let (true, Value::String(event_type)) = (adopt_type, value) {
                        self.event_type = event_type;
                    }
                }
                "target" => {}
                _ => {
                    self.fields.insert(key, value);
                }
            }
        }
    }

    /// The event type
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Change the event type
    pub fn set_event_type(&mut self, event_type: impl Into<String>) {
        self.event_type = event_type.into();
    }

    /// The target that fired this event, set by [`EventTarget::fire`]
    pub fn target(&self) -> Option<&EventTarget> {
        self.target.as_ref()
    }

    pub(crate) fn set_target(&mut self, target: EventTarget) {
        self.target = Some(target);
    }

    /// A data field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a data field
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// The scalar payload stored under `data`, if any
    pub fn data(&self) -> Option<&Value> {
        self.fields.get("data")
    }

    /// All data fields
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Prevent the default action
    pub fn prevent_default(&self) {
        self.state.prevent_default();
    }

    /// Whether the default action was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.state.default_prevented.get()
    }

    /// Stop propagation to other targets
    pub fn stop_propagation(&self) {
        self.state.stop_propagation();
    }

    /// Whether propagation was stopped
    pub fn is_propagation_stopped(&self) -> bool {
        self.state.propagation_stopped.get()
    }

    /// Stop propagation and skip the remaining listeners of this dispatch
    pub fn stop_immediate_propagation(&self) {
        self.state.stop_immediate_propagation();
    }

    /// Whether the remaining listeners are skipped
    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.state.immediate_propagation_stopped.get()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_type)
            .field("target", &self.target)
            .field("fields", &self.fields)
            .field("default_prevented", &self.is_default_prevented())
            .field("propagation_stopped", &self.is_propagation_stopped())
            .field(
                "immediate_propagation_stopped",
                &self.is_immediate_propagation_stopped(),
            )
            .finish()
    }
}

/// Conversion into the event handed to [`EventTarget::fire`]
pub trait IntoEvent {
    /// Build the event
    fn into_event(self) -> Event;
}

impl IntoEvent for Event {
    fn into_event(self) -> Event {
        self
    }
}

impl IntoEvent for &str {
    fn into_event(self) -> Event {
        Event::new(self)
    }
}

impl IntoEvent for String {
    fn into_event(self) -> Event {
        Event::new(self)
    }
}

impl IntoEvent for &String {
    fn into_event(self) -> Event {
        Event::new(self.as_str())
    }
}

impl IntoEvent for (&str, Value) {
    fn into_event(self) -> Event {
        Event::with_data(self.0, self.1)
    }
}

impl IntoEvent for (String, Value) {
    fn into_event(self) -> Event {
        Event::with_data(self.0, self.1)
    }
}

impl IntoEvent for Value {
    fn into_event(self) -> Event {
        match self {
            Value::String(event_type) => Event::new(event_type),
            args => Event::from_value(args),
        }
    }
}

/// Truthiness of a loosely typed value
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
