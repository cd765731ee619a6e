//! Registry of live view contexts

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use log::debug;
use serde::{Deserialize, Serialize};

use super::context::ViewContext;

/// Id generation settings for a [`ViewContextPool`]
///
/// Generated ids are `id_prefix` followed by a counter starting at `id_seed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfig {
    /// Text put in front of every generated id
    pub id_prefix: String,
    /// First counter value
    pub id_seed: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            id_prefix: "vt".to_string(),
            id_seed: 0x830903,
        }
    }
}

pub(crate) struct PoolInner {
    config: PoolConfig,
    counter: AtomicU64,
    contexts: Mutex<HashMap<String, ViewContext>>,
}

/// Keeps every live context reachable by id
///
/// A context leaves its pool when it is disposed.
#[derive(Clone)]
pub struct ViewContextPool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for ViewContextPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewContextPool")
            .field("config", &self.inner.config)
            .field("contexts", &self.ids())
            .finish()
    }
}

impl Default for ViewContextPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewContextPool {
    /// Create an empty pool with the default id settings
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create an empty pool with custom id settings
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                counter: AtomicU64::new(config.id_seed),
                config,
                contexts: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The process-wide pool used by [`ViewContext::new`]
    pub fn global() -> &'static ViewContextPool {
        static GLOBAL: OnceLock<ViewContextPool> = OnceLock::new();
        GLOBAL.get_or_init(ViewContextPool::new)
    }

    pub(crate) fn from_inner(inner: Arc<PoolInner>) -> Self {
        Self { inner }
    }

    fn contexts(&self) -> MutexGuard<'_, HashMap<String, ViewContext>> {
        self.inner
            .contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The id settings
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Next generated id; never repeats within this pool
    pub fn generate_id(&self) -> String {
        let n = self.inner.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{}", self.inner.config.id_prefix, n)
    }

    /// Create and register a context
    ///
    /// An empty or missing id is generated. When the id is already taken the
    /// first free `id-1`, `id-2`, ... is used instead.
    pub fn create(&self, id: Option<&str>) -> ViewContext {
        let requested = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.generate_id(),
        };

        let mut contexts = self.contexts();
        let mut id = requested.clone();
        let mut suffix = 1;
        while contexts.contains_key(&id) {
            id = format!("{}-{}", requested, suffix);
            suffix += 1;
        }
        if id != requested {
            debug!("view context id `{}` is taken, using `{}`", requested, id);
        }

        let context = ViewContext::create(id.clone(), Arc::downgrade(&self.inner));
        contexts.insert(id, context.clone());
        context
    }

    /// The context registered under `id`
    pub fn get(&self, id: &str) -> Option<ViewContext> {
        self.contexts().get(id).cloned()
    }

    /// Whether a context is registered under `id`
    pub fn contains(&self, id: &str) -> bool {
        self.contexts().contains_key(id)
    }

    /// Put an unregistered context back under its id
    ///
    /// Fails when the id is taken or the context was disposed.
    pub fn register(&self, context: &ViewContext) -> bool {
        if context.is_disposed() {
            return false;
        }
        let mut contexts = self.contexts();
        if contexts.contains_key(context.id()) {
            return false;
        }
        debug!("registering view context `{}`", context.id());
        contexts.insert(context.id().to_string(), context.clone());
        true
    }

    /// Drop `context` from the pool if it is the one registered under its id
    pub fn unregister(&self, context: &ViewContext) -> bool {
        let mut contexts = self.contexts();
        if contexts
            .get(context.id())
            .is_some_and(|registered| registered.ptr_eq(context))
        {
            contexts.remove(context.id());
            return true;
        }
        false
    }

    /// Ids of the registered contexts
    pub fn ids(&self) -> Vec<String> {
        self.contexts().keys().cloned().collect()
    }

    /// Number of registered contexts
    pub fn len(&self) -> usize {
        self.contexts().len()
    }

    /// Whether no context is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
