//! Control capability contract
//!
//! The event and view core never looks at concrete widget types. Anything
//! that implements [`Control`] can be registered in a
//! [`ViewContext`](crate::view::ViewContext), grouped and broadcast to.

mod basic;
mod safe;

pub use basic::BasicControl;
pub use safe::SafeControl;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::events::Observable;
use crate::view::ViewContext;

/// Shared handle to a control
pub type ControlRef = Arc<dyn Control>;

/// Category reported by controls that do not define their own
pub const DEFAULT_CATEGORY: &str = "control";

/// State name used for the disabled flag
pub const STATE_DISABLED: &str = "disabled";

/// State name used for the hidden flag
pub const STATE_HIDDEN: &str = "hidden";

/// Capabilities a widget needs to take part in view scoping
///
/// Methods take `&self`; implementations keep their state behind locks so a
/// control can be shared between a view context, its groups and listeners.
pub trait Control: Observable + Send + Sync {
    /// Identifier, unique within a view context
    fn id(&self) -> String;

    /// Read an attribute; unknown attributes are `Null`
    fn get(&self, name: &str) -> Value;

    /// Write an attribute
    fn set(&self, name: &str, value: Value) {
        let mut properties = Map::new();
        properties.insert(name.to_string(), value);
        self.set_properties(properties);
    }

    /// Write several attributes at once
    fn set_properties(&self, properties: Map<String, Value>);

    /// Broad kind of control, e.g. `"control"`, `"input"`, `"check"`
    fn get_category(&self) -> String {
        DEFAULT_CATEGORY.to_string()
    }

    /// The view context this control is registered in
    fn view_context(&self) -> Option<ViewContext>;

    /// Record the view context; called by the view context itself
    fn set_view_context(&self, context: Option<&ViewContext>);

    /// Release the control, its children and its listeners
    fn dispose(&self);

    /// Add a state
    fn add_state(&self, state: &str);

    /// Remove a state
    fn remove_state(&self, state: &str);

    /// Whether a state is set
    fn has_state(&self, state: &str) -> bool;

    /// Flip a state
    fn toggle_state(&self, state: &str) {
        if self.has_state(state) {
            self.remove_state(state);
        } else {
            self.add_state(state);
        }
    }

    /// Whether the control is disabled
    fn is_disabled(&self) -> bool {
        self.has_state(STATE_DISABLED)
    }

    /// Set the disabled flag
    fn set_disabled(&self, disabled: bool) {
        if disabled {
            self.add_state(STATE_DISABLED);
        } else {
            self.remove_state(STATE_DISABLED);
        }
    }

    /// Enable the control
    fn enable(&self) {
        self.set_disabled(false);
    }

    /// Disable the control
    fn disable(&self) {
        self.set_disabled(true);
    }

    /// Whether the control is hidden
    fn is_hidden(&self) -> bool {
        self.has_state(STATE_HIDDEN)
    }

    /// Set the hidden flag
    fn set_hidden(&self, hidden: bool) {
        if hidden {
            self.add_state(STATE_HIDDEN);
        } else {
            self.remove_state(STATE_HIDDEN);
        }
    }

    /// Show the control
    fn show(&self) {
        self.set_hidden(false);
    }

    /// Hide the control
    fn hide(&self) {
        self.set_hidden(true);
    }

    /// Attach a child, optionally under a name
    fn add_child(&self, child: ControlRef, name: Option<&str>);

    /// Detach a child
    fn remove_child(&self, child: &dyn Control);

    /// A named child
    fn get_child(&self, name: &str) -> Option<ControlRef>;

    /// A named child, or a no-op stand-in when there is none
    fn get_child_safely(&self, name: &str) -> ControlRef {
        self.get_child(name)
            .unwrap_or_else(|| Arc::new(SafeControl::new(name, self.view_context().as_ref())))
    }

    /// All children in insertion order
    fn children(&self) -> Vec<ControlRef>;

    /// Build the control's output
    fn render(&self) {}

    /// Refresh the control's output after attribute changes
    fn repaint(&self) {}
}

/// Whether two handles refer to the same control instance
pub fn same_control(a: &dyn Control, b: &dyn Control) -> bool {
    std::ptr::eq(
        a as *const dyn Control as *const (),
        b as *const dyn Control as *const (),
    )
}

/// Group names declared by a control's `group` attribute
///
/// Names are separated by spaces, tabs or newlines; empty names are skipped.
pub fn group_names(control: &dyn Control) -> Vec<String> {
    match control.get("group") {
        Value::String(groups) => groups
            .split([' ', '\t', '\n'])
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
