//! A plain control with attributes, states and children
//!
//! `BasicControl` is the base widgets build on: it keeps attributes as loose
//! JSON values, owns an [`EventTarget`] and tracks its view context weakly.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};

use super::{same_control, Control, ControlRef, DEFAULT_CATEGORY};
use crate::events::{EventTarget, Observable, Owner};
use crate::view::{ViewContext, WeakViewContext};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Generic control
pub struct BasicControl {
    id: String,
    category: String,
    attributes: RwLock<Map<String, Value>>,
    states: RwLock<BTreeSet<String>>,
    children: RwLock<Vec<(Option<String>, ControlRef)>>,
    events: EventTarget,
    view_context: RwLock<Option<WeakViewContext>>,
    disposed: AtomicBool,
}

impl fmt::Debug for BasicControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicControl")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("attributes", &*read(&self.attributes))
            .field("states", &*read(&self.states))
            .field("children", &read(&self.children).len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl BasicControl {
    /// Create a control with no attributes
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Self::with_attributes(id, Map::new())
    }

    /// Create a control with initial attributes
    ///
    /// The control's event target is bound to the control itself, so
    /// listeners without an owner receive the control as `this`.
    pub fn with_attributes(id: impl Into<String>, attributes: Map<String, Value>) -> Arc<Self> {
        Self::with_category(id, DEFAULT_CATEGORY, attributes)
    }

    /// Create a control of a specific category
    pub fn with_category(
        id: impl Into<String>,
        category: impl Into<String>,
        attributes: Map<String, Value>,
    ) -> Arc<Self> {
        let control = Arc::new(Self {
            id: id.into(),
            category: category.into(),
            attributes: RwLock::new(attributes),
            states: RwLock::new(BTreeSet::new()),
            children: RwLock::new(Vec::new()),
            events: EventTarget::new(),
            view_context: RwLock::new(None),
            disposed: AtomicBool::new(false),
        });
        let owner: Owner = control.clone();
        control.events.bind_this(&owner);
        control
    }

    /// Whether [`Control::dispose`] ran
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Observable for BasicControl {
    fn event_target(&self) -> &EventTarget {
        &self.events
    }
}

impl Control for BasicControl {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn get(&self, name: &str) -> Value {
        if name == "id" {
            return Value::String(self.id.clone());
        }
        read(&self.attributes)
            .get(name)
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn set_properties(&self, properties: Map<String, Value>) {
        if self.is_disposed() {
            return;
        }
        let changed = {
            let mut attributes = write(&self.attributes);
            let mut changed = false;
            for (name, value) in properties {
                if name == "id" {
                    continue;
                }
                if attributes.get(&name) != Some(&value) {
                    attributes.insert(name, value);
                    changed = true;
                }
            }
            changed
        };
        if changed {
            self.repaint();
        }
    }

    fn get_category(&self) -> String {
        self.category.clone()
    }

    fn view_context(&self) -> Option<ViewContext> {
        read(&self.view_context)
            .as_ref()
            .and_then(WeakViewContext::upgrade)
    }

    fn set_view_context(&self, context: Option<&ViewContext>) {
        *write(&self.view_context) = context.map(ViewContext::downgrade);
    }

    /// Fires `beforedispose`, disposes children, leaves the view context and
    /// drops every listener. Repeated calls do nothing.
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.events.fire("beforedispose") {
            log::warn!("control `{}` could not announce disposal: {}", self.id, err);
        }

        let children: Vec<ControlRef> = write(&self.children)
            .drain(..)
            .map(|(_, child)| child)
            .collect();
        for child in children {
            child.dispose();
        }

        if let Some(context) = self.view_context() {
            context.remove(self);
        }
        self.events.destroy_events();
    }

    fn add_state(&self, state: &str) {
        write(&self.states).insert(state.to_string());
    }

    fn remove_state(&self, state: &str) {
        write(&self.states).remove(state);
    }

    fn has_state(&self, state: &str) -> bool {
        read(&self.states).contains(state)
    }

    fn add_child(&self, child: ControlRef, name: Option<&str>) {
        let mut children = write(&self.children);
        if children
            .iter()
            .any(|(_, existing)| same_control(existing.as_ref(), child.as_ref()))
        {
            return;
        }
        children.push((name.map(str::to_string), child));
    }

    fn remove_child(&self, child: &dyn Control) {
        write(&self.children).retain(|(_, existing)| !same_control(existing.as_ref(), child));
    }

    fn get_child(&self, name: &str) -> Option<ControlRef> {
        read(&self.children)
            .iter()
            .find(|(child_name, _)| child_name.as_deref() == Some(name))
            .map(|(_, child)| child.clone())
    }

    fn children(&self) -> Vec<ControlRef> {
        read(&self.children)
            .iter()
            .map(|(_, child)| child.clone())
            .collect()
    }

    fn render(&self) {
        self.add_state("rendered");
    }
}
