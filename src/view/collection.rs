//! Ordered control collections with broadcast semantics
//!
//! Broadcast calls run on every member in insertion order and hand back the
//! first member's result. Read calls ask the first member only. Both return
//! `None` on an empty collection.

use std::fmt;
use std::slice;

use serde_json::{Map, Value};

use crate::control::{same_control, Control, ControlRef};
use crate::events::{Event, EventError, Listener, ListenerOptions, Observable, Owner};
use crate::view::ViewContext;

/// Bulk operations over an ordered set of controls
///
/// Implementors only supply [`members`](ControlSet::members), a snapshot of
/// the current members. Calls run on the snapshot, so a member may leave the
/// set while a broadcast is running.
pub trait ControlSet {
    /// Current members in insertion order
    fn members(&self) -> Vec<ControlRef>;

    /// Number of members
    fn len(&self) -> usize {
        self.members().len()
    }

    /// Whether the set has no members
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Member at `index`
    fn at(&self, index: usize) -> Option<ControlRef> {
        self.members().get(index).cloned()
    }

    /// First member
    fn first(&self) -> Option<ControlRef> {
        self.at(0)
    }

    /// Whether `control` is a member
    fn contains(&self, control: &dyn Control) -> bool {
        self.members()
            .iter()
            .any(|member| same_control(member.as_ref(), control))
    }

    /// Visit every member with its index and the set itself
    fn each(&self, mut iterator: impl FnMut(&ControlRef, usize, &Self))
    where
        Self: Sized,
    {
        for (index, member) in self.members().iter().enumerate() {
            iterator(member, index, self);
        }
    }

    /// Call `method` on every member and collect the results in order
    fn invoke<R>(&self, mut method: impl FnMut(&dyn Control) -> R) -> Vec<R> {
        self.members()
            .iter()
            .map(|member| method(member.as_ref()))
            .collect()
    }

    /// Call `method` on every member, returning the first result
    fn broadcast<R>(&self, method: impl FnMut(&dyn Control) -> R) -> Option<R> {
        self.invoke(method).into_iter().next()
    }

    /// Call `method` on the first member only
    fn read<R>(&self, method: impl FnOnce(&dyn Control) -> R) -> Option<R> {
        self.first().map(|member| method(member.as_ref()))
    }

    /// Enable every member
    fn enable(&self) -> Option<()> {
        self.broadcast(|control| control.enable())
    }

    /// Disable every member
    fn disable(&self) -> Option<()> {
        self.broadcast(|control| control.disable())
    }

    /// Set the disabled flag on every member
    fn set_disabled(&self, disabled: bool) -> Option<()> {
        self.broadcast(|control| control.set_disabled(disabled))
    }

    /// Show every member
    fn show(&self) -> Option<()> {
        self.broadcast(|control| control.show())
    }

    /// Hide every member
    fn hide(&self) -> Option<()> {
        self.broadcast(|control| control.hide())
    }

    /// Set the hidden flag on every member
    fn set_hidden(&self, hidden: bool) -> Option<()> {
        self.broadcast(|control| control.set_hidden(hidden))
    }

    /// Add a state to every member
    fn add_state(&self, state: &str) -> Option<()> {
        self.broadcast(|control| control.add_state(state))
    }

    /// Remove a state from every member
    fn remove_state(&self, state: &str) -> Option<()> {
        self.broadcast(|control| control.remove_state(state))
    }

    /// Flip a state on every member
    fn toggle_state(&self, state: &str) -> Option<()> {
        self.broadcast(|control| control.toggle_state(state))
    }

    /// Attach `child` to every member
    fn add_child(&self, child: &ControlRef, name: Option<&str>) -> Option<()> {
        self.broadcast(|control| control.add_child(child.clone(), name))
    }

    /// Detach `child` from every member
    fn remove_child(&self, child: &dyn Control) -> Option<()> {
        self.broadcast(|control| control.remove_child(child))
    }

    /// Render every member
    fn render(&self) -> Option<()> {
        self.broadcast(|control| control.render())
    }

    /// Repaint every member
    fn repaint(&self) -> Option<()> {
        self.broadcast(|control| control.repaint())
    }

    /// Write an attribute on every member
    fn set(&self, name: &str, value: &Value) -> Option<()> {
        self.broadcast(|control| control.set(name, value.clone()))
    }

    /// Write several attributes on every member
    fn set_properties(&self, properties: &Map<String, Value>) -> Option<()> {
        self.broadcast(|control| control.set_properties(properties.clone()))
    }

    /// Subscribe the same listener on every member
    fn on(
        &self,
        event_type: &str,
        listener: &Listener,
        options: &ListenerOptions,
    ) -> Option<Result<(), EventError>> {
        self.broadcast(|control| control.on(event_type, listener.clone(), options.clone()))
    }

    /// Unsubscribe a listener, or every listener of `event_type`, on every member
    fn un(
        &self,
        event_type: &str,
        listener: Option<&Listener>,
        this_object: Option<&Owner>,
    ) -> Option<()> {
        self.broadcast(|control| control.un(event_type, listener, this_object))
    }

    /// Fire a fresh event on every member
    fn fire(&self, event_type: &str, data: &Value) -> Option<Result<Event, EventError>> {
        self.broadcast(|control| control.fire(Event::with_data(event_type, data.clone())))
    }

    /// Point every member at `context`
    ///
    /// Only the members' back-reference changes; no context registry is
    /// updated.
    fn set_view_context(&self, context: Option<&ViewContext>) -> Option<()> {
        self.broadcast(|control| control.set_view_context(context))
    }

    /// Dispose every member
    fn dispose(&self) -> Option<()> {
        self.broadcast(|control| control.dispose())
    }

    /// Whether the first member is disabled
    fn is_disabled(&self) -> Option<bool> {
        self.read(|control| control.is_disabled())
    }

    /// Whether the first member is hidden
    fn is_hidden(&self) -> Option<bool> {
        self.read(|control| control.is_hidden())
    }

    /// Whether the first member has `state`
    fn has_state(&self, state: &str) -> Option<bool> {
        self.read(|control| control.has_state(state))
    }

    /// Attribute of the first member
    fn get(&self, name: &str) -> Option<Value> {
        self.read(|control| control.get(name))
    }

    /// Category of the first member
    fn get_category(&self) -> Option<String> {
        self.read(|control| control.get_category())
    }

    /// Named child of the first member
    fn get_child(&self, name: &str) -> Option<ControlRef> {
        self.read(|control| control.get_child(name)).flatten()
    }

    /// Named child of the first member, or a stand-in
    fn get_child_safely(&self, name: &str) -> Option<ControlRef> {
        self.read(|control| control.get_child_safely(name))
    }
}

/// Ordered, duplicate-free list of controls
#[derive(Clone, Default)]
pub struct ControlCollection {
    members: Vec<ControlRef>,
}

impl fmt::Debug for ControlCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.members.iter().map(|member| member.id()))
            .finish()
    }
}

impl ControlCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `control` unless it is already a member
    pub fn add(&mut self, control: ControlRef) -> bool {
        if self
            .members
            .iter()
            .any(|member| same_control(member.as_ref(), control.as_ref()))
        {
            return false;
        }
        self.members.push(control);
        true
    }

    /// Remove `control`; later members move up
    pub fn remove(&mut self, control: &dyn Control) -> bool {
        match self
            .members
            .iter()
            .position(|member| same_control(member.as_ref(), control))
        {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => false,
        }
    }

    /// Iterate over the members without cloning them
    pub fn iter(&self) -> slice::Iter<'_, ControlRef> {
        self.members.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.members.clear();
    }
}

impl ControlSet for ControlCollection {
    fn members(&self) -> Vec<ControlRef> {
        self.members.clone()
    }

    fn len(&self) -> usize {
        self.members.len()
    }
}

impl FromIterator<ControlRef> for ControlCollection {
    fn from_iter<I: IntoIterator<Item = ControlRef>>(iter: I) -> Self {
        let mut collection = Self::new();
        collection.extend(iter);
        collection
    }
}

impl Extend<ControlRef> for ControlCollection {
    fn extend<I: IntoIterator<Item = ControlRef>>(&mut self, iter: I) {
        for control in iter {
            self.add(control);
        }
    }
}

impl<'a> IntoIterator for &'a ControlCollection {
    type Item = &'a ControlRef;
    type IntoIter = slice::Iter<'a, ControlRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
