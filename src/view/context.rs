//! View contexts: id-keyed control registries with live groups

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use log::debug;

use super::error::ViewError;
use super::group::ControlGroup;
use super::pool::{PoolInner, ViewContextPool};
use crate::control::{group_names, same_control, Control, ControlRef, SafeControl};

struct ContextInner {
    id: String,
    controls: RwLock<HashMap<String, ControlRef>>,
    groups: RwLock<HashMap<String, ControlGroup>>,
    pool: Weak<PoolInner>,
    disposed: AtomicBool,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Scope owning the controls of one view
///
/// Controls are keyed by id, one control per id. Each control also joins
/// the groups named by its `group` attribute. A control belongs to at most
/// one context at a time.
///
/// Cloning yields another handle to the same context.
#[derive(Clone)]
pub struct ViewContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for ViewContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = read(&self.inner.groups).keys().cloned().collect();
        f.debug_struct("ViewContext")
            .field("id", &self.inner.id)
            .field("controls", &self.control_ids())
            .field("groups", &groups)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl PartialEq for ViewContext {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ViewContext {}

impl ViewContext {
    /// Create a context in the global pool
    ///
    /// Without an id, or when the id is taken, a unique one is derived as
    /// described on [`ViewContextPool::create`].
    pub fn new(id: Option<&str>) -> Self {
        ViewContextPool::global().create(id)
    }

    /// Find a context in the global pool
    pub fn lookup(id: &str) -> Option<ViewContext> {
        ViewContextPool::global().get(id)
    }

    pub(crate) fn create(id: String, pool: Weak<PoolInner>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id,
                controls: RwLock::new(HashMap::new()),
                groups: RwLock::new(HashMap::new()),
                pool,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// The context id, unique within its pool
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Whether both handles refer to the same context
    pub fn ptr_eq(&self, other: &ViewContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A handle that does not keep the context alive
    pub fn downgrade(&self) -> WeakViewContext {
        WeakViewContext {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether [`dispose`](Self::dispose) ran
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Register a control
    ///
    /// A different control already registered under the same id is detached
    /// before the new one is attached. Registering the same control again
    /// does nothing. A control still registered elsewhere leaves its previous
    /// context.
    pub fn add(&self, control: ControlRef) -> Result<(), ViewError> {
        if self.is_disposed() {
            return Err(ViewError::ContextDisposed(self.inner.id.clone()));
        }

        let id = control.id();
        // Check and insert under one guard; callbacks run after it is released.
        let displaced = {
            let mut controls = write(&self.inner.controls);
            if controls
                .get(&id)
                .is_some_and(|existing| same_control(existing.as_ref(), control.as_ref()))
            {
                return Ok(());
            }
            controls.insert(id.clone(), control.clone())
        };

        if let Some(displaced) = displaced {
            debug!("view context `{}` replaces control `{}`", self.inner.id, id);
            self.detach(displaced.as_ref());
        }

        if let Some(previous) = control.view_context() {
            if !previous.ptr_eq(self) {
                previous.remove(control.as_ref());
            }
        }

        for name in group_names(control.as_ref()) {
            self.group(&name).add(control.clone());
        }
        control.set_view_context(Some(self));

        // A concurrent add may have displaced the control in the meantime.
        if !self.is_registered(control.as_ref()) {
            self.detach(control.as_ref());
        }
        Ok(())
    }

    /// Unregister a control and take it out of its groups
    ///
    /// A control that is neither registered here nor attached here is
    /// removed from the context it is attached to instead.
    pub fn remove(&self, control: &dyn Control) {
        let id = control.id();
        let registered = {
            let mut controls = write(&self.inner.controls);
            let registered = controls
                .get(&id)
                .is_some_and(|existing| same_control(existing.as_ref(), control));
            if registered {
                controls.remove(&id);
            }
            registered
        };

        if !registered {
            if let Some(owner) = control.view_context() {
                if !owner.ptr_eq(self) {
                    owner.remove(control);
                    return;
                }
            }
        }
        self.detach(control);
    }

    fn is_registered(&self, control: &dyn Control) -> bool {
        read(&self.inner.controls)
            .get(&control.id())
            .is_some_and(|existing| same_control(existing.as_ref(), control))
    }

    // Leave the groups and drop the back-reference if it still points here
    fn detach(&self, control: &dyn Control) {
        for name in group_names(control) {
            let group = read(&self.inner.groups).get(&name).cloned();
            if let Some(group) = group {
                group.remove(control);
            }
        }
        if control
            .view_context()
            .is_some_and(|context| context.ptr_eq(self))
        {
            control.set_view_context(None);
        }
    }

    /// The control registered under `id`
    pub fn get(&self, id: &str) -> Option<ControlRef> {
        read(&self.inner.controls).get(id).cloned()
    }

    /// The control registered under `id`, or a no-op stand-in
    pub fn get_safely(&self, id: &str) -> ControlRef {
        match self.get(id) {
            Some(control) => control,
            None => Arc::new(SafeControl::new(id, Some(self))),
        }
    }

    /// The group called `name`, created empty on first use
    pub fn get_group(&self, name: &str) -> Result<ControlGroup, ViewError> {
        if name.is_empty() {
            return Err(ViewError::MissingGroupName);
        }
        Ok(self.group(name))
    }

    fn group(&self, name: &str) -> ControlGroup {
        write(&self.inner.groups)
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("view context `{}` creates group `{}`", self.inner.id, name);
                ControlGroup::new(name)
            })
            .clone()
    }

    /// Ids of the registered controls
    pub fn control_ids(&self) -> Vec<String> {
        read(&self.inner.controls).keys().cloned().collect()
    }

    /// Number of registered controls
    pub fn len(&self) -> usize {
        read(&self.inner.controls).len()
    }

    /// Whether no control is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispose every control and empty every group
    ///
    /// A control whose own disposal did not detach it from this context is
    /// removed afterwards.
    pub fn clean(&self) {
        let controls: Vec<ControlRef> = read(&self.inner.controls).values().cloned().collect();
        for control in controls {
            control.dispose();
            let attached = control
                .view_context()
                .is_some_and(|context| context.ptr_eq(self));
            if attached || self.is_registered(control.as_ref()) {
                self.remove(control.as_ref());
            }
        }

        let groups: Vec<ControlGroup> = write(&self.inner.groups)
            .drain()
            .map(|(_, group)| group)
            .collect();
        for group in groups {
            group.dispose_group();
        }
    }

    /// Clean the context and leave its pool; the context is not usable afterwards
    pub fn dispose(&self) {
        self.clean();
        self.inner.disposed.store(true, Ordering::SeqCst);
        if let Some(pool) = self.inner.pool.upgrade() {
            ViewContextPool::from_inner(pool).unregister(self);
        }
        debug!("view context `{}` disposed", self.inner.id);
    }
}

/// Weak handle to a [`ViewContext`]
#[derive(Clone, Debug)]
pub struct WeakViewContext {
    inner: Weak<ContextInner>,
}

impl WeakViewContext {
    /// The context, if it is still alive
    pub fn upgrade(&self) -> Option<ViewContext> {
        self.inner.upgrade().map(|inner| ViewContext { inner })
    }
}
