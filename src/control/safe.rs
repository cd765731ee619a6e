//! Null-object control returned for lookups that found nothing
//!
//! Every mutating call is ignored and every read returns a neutral value, so
//! callers can chain calls on a lookup result without checking it first.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::{Control, ControlRef, DEFAULT_CATEGORY};
use crate::events::{Event, EventError, EventTarget, Listener, ListenerOptions, Observable, Owner};
use crate::view::{ViewContext, WeakViewContext};

/// Stand-in for a control that does not exist
///
/// | call | result |
/// |------|--------|
/// | `id` | the requested id |
/// | `view_context` | the context that was asked |
/// | `get` | `Null` |
/// | `get_category` | `"control"` |
/// | `has_state`, `is_disabled`, `is_hidden` | `false` |
/// | `children` | empty |
/// | `get_child` | another stand-in |
/// | `on`, `once`, `un`, `set*`, `dispose`, ... | nothing |
/// | `fire` | the event, unfired |
#[derive(Debug)]
pub struct SafeControl {
    id: String,
    view_context: Option<WeakViewContext>,
    events: EventTarget,
}

impl SafeControl {
    /// Create a stand-in for `id` in `view_context`
    pub fn new(id: impl Into<String>, view_context: Option<&ViewContext>) -> Self {
        Self {
            id: id.into(),
            view_context: view_context.map(ViewContext::downgrade),
            events: EventTarget::new(),
        }
    }
}

impl Observable for SafeControl {
    fn event_target(&self) -> &EventTarget {
        &self.events
    }

    fn on(&self, _: &str, _: Listener, _: ListenerOptions) -> Result<(), EventError> {
        Ok(())
    }

    fn once(&self, _: &str, _: Listener, _: ListenerOptions) -> Result<(), EventError> {
        Ok(())
    }

    fn un(&self, _: &str, _: Option<&Listener>, _: Option<&Owner>) {}

    fn fire(&self, event: Event) -> Result<Event, EventError> {
        Ok(event)
    }

    fn destroy_events(&self) {}
}

impl Control for SafeControl {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn get(&self, _: &str) -> Value {
        Value::Null
    }

    fn set(&self, _: &str, _: Value) {}

    fn set_properties(&self, _: Map<String, Value>) {}

    fn get_category(&self) -> String {
        DEFAULT_CATEGORY.to_string()
    }

    fn view_context(&self) -> Option<ViewContext> {
        self.view_context.as_ref().and_then(WeakViewContext::upgrade)
    }

    fn set_view_context(&self, _: Option<&ViewContext>) {}

    fn dispose(&self) {}

    fn add_state(&self, _: &str) {}

    fn remove_state(&self, _: &str) {}

    fn has_state(&self, _: &str) -> bool {
        false
    }

    fn toggle_state(&self, _: &str) {}

    fn set_disabled(&self, _: bool) {}

    fn set_hidden(&self, _: bool) {}

    fn add_child(&self, _: ControlRef, _: Option<&str>) {}

    fn remove_child(&self, _: &dyn Control) {}

    fn get_child(&self, name: &str) -> Option<ControlRef> {
        Some(Arc::new(SafeControl::new(name, self.view_context().as_ref())))
    }

    fn children(&self) -> Vec<ControlRef> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Handler;
    use serde_json::json;

    #[test]
    fn reads_are_neutral() {
        let safe = SafeControl::new("ghost", None);
        assert_eq!(safe.id(), "ghost");
        assert_eq!(safe.get("value"), Value::Null);
        assert_eq!(safe.get_category(), "control");
        assert!(!safe.is_disabled());
        assert!(!safe.is_hidden());
        assert!(safe.children().is_empty());
        assert!(safe.view_context().is_none());
    }

    #[test]
    fn writes_are_ignored() {
        let safe = SafeControl::new("ghost", None);
        safe.set("value", json!(1));
        safe.disable();
        safe.hide();
        safe.add_state("active");
        safe.toggle_state("active");
        assert_eq!(safe.get("value"), Value::Null);
        assert!(!safe.is_disabled());
        assert!(!safe.has_state("active"));
    }

    #[test]
    fn events_are_ignored() {
        let safe = SafeControl::new("ghost", None);
        safe.on(
            "click",
            Handler::new(|_| panic!("stand-in dispatched an event")).into(),
            ListenerOptions::new(),
        )
        .unwrap();
        let event = safe.fire(Event::new("click")).unwrap();
        assert!(event.target().is_none());
        assert!(!safe.event_target().has_listeners("click"));
    }

    #[test]
    fn children_are_stand_ins() {
        let safe = SafeControl::new("ghost", None);
        let child = safe.get_child("inner").unwrap();
        assert_eq!(child.id(), "inner");
        assert_eq!(child.get_child_safely("deeper").id(), "deeper");
    }
}
