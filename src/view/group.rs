//! Live control groups owned by a view context

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use super::collection::{ControlCollection, ControlSet};
use crate::control::{Control, ControlRef};

struct GroupInner {
    name: String,
    members: RwLock<ControlCollection>,
}

/// Controls of a view context that share a group name
///
/// A group is a live view: the context adds and removes members as controls
/// come and go, and every clone of the handle sees the change. Membership
/// cannot be changed from outside the context.
#[derive(Clone)]
pub struct ControlGroup {
    inner: Arc<GroupInner>,
}

impl fmt::Debug for ControlGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlGroup")
            .field("name", &self.inner.name)
            .field("members", &*self.read())
            .finish()
    }
}

impl ControlGroup {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                name: name.to_string(),
                members: RwLock::new(ControlCollection::new()),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ControlCollection> {
        self.inner
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ControlCollection> {
        self.inner
            .members
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The group name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether both handles refer to the same group
    pub fn ptr_eq(&self, other: &ControlGroup) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn add(&self, control: ControlRef) {
        self.write().add(control);
    }

    pub(crate) fn remove(&self, control: &dyn Control) {
        self.write().remove(control);
    }

    /// Empty the group without disposing its members
    pub fn dispose_group(&self) {
        debug!("disposing group `{}`", self.inner.name);
        self.write().clear();
    }
}

impl ControlSet for ControlGroup {
    fn members(&self) -> Vec<ControlRef> {
        self.read().members()
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}
