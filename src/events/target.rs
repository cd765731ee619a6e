//! Publish/subscribe capability for arbitrary objects
//!
//! An [`EventTarget`] keeps one [`EventQueue`] per event type, created on the
//! first subscription. Any type gains the full `on`/`once`/`un`/`fire`
//! surface by holding an `EventTarget` and implementing [`Observable`].

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::trace;

use super::error::EventError;
use super::event::{Event, IntoEvent, WILDCARD};
use super::queue::{EventQueue, Handler, Listener, ListenerOptions, Owner};

type QueueMap = HashMap<String, EventQueue>;

#[derive(Default)]
struct TargetInner {
    /// `None` until the first subscription and after `destroy_events`
    queues: Mutex<Option<QueueMap>>,
    /// One inline handler per type, run before the queue
    inline: Mutex<HashMap<String, Handler>>,
    /// Fallback `this` for listeners without an owner
    this_object: Mutex<Option<Weak<dyn Any + Send + Sync>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event dispatch component
///
/// Cloning yields another handle to the same target.
#[derive(Clone, Default)]
pub struct EventTarget {
    inner: Arc<TargetInner>,
}

impl fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<String> = lock(&self.inner.queues)
            .as_ref()
            .map(|queues| queues.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("EventTarget")
            .field("ptr", &Arc::as_ptr(&self.inner))
            .field("types", &types)
            .finish()
    }
}

impl PartialEq for EventTarget {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for EventTarget {}

impl EventTarget {
    /// Create a target with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether both handles refer to the same target
    pub fn ptr_eq(&self, other: &EventTarget) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A handle that does not keep the target alive
    pub fn downgrade(&self) -> WeakEventTarget {
        WeakEventTarget {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Use `owner` as `this` for listeners registered without one
    ///
    /// The owner is held weakly so a widget can bind itself.
    pub fn bind_this(&self, owner: &Owner) {
        *lock(&self.inner.this_object) = Some(Arc::downgrade(owner));
    }

    /// The bound `this`, if it is still alive
    pub fn this_object(&self) -> Option<Owner> {
        lock(&self.inner.this_object).as_ref().and_then(Weak::upgrade)
    }

    fn queue(&self, event_type: &str) -> Option<EventQueue> {
        lock(&self.inner.queues)
            .as_ref()
            .and_then(|queues| queues.get(event_type).cloned())
    }

    fn ensure_queue(&self, event_type: &str) -> EventQueue {
        let mut queues = lock(&self.inner.queues);
        queues
            .get_or_insert_with(HashMap::new)
            .entry(event_type.to_string())
            .or_insert_with(|| EventQueue::new(event_type))
            .clone()
    }

    /// Subscribe to `event_type`; `"*"` receives every fired event
    pub fn on(&self, event_type: &str, listener: impl Into<Listener>) -> Result<(), EventError> {
        self.on_with(event_type, listener, ListenerOptions::new())
    }

    /// Subscribe with an owner, once flag or extra configuration
    pub fn on_with(
        &self,
        event_type: &str,
        listener: impl Into<Listener>,
        options: ListenerOptions,
    ) -> Result<(), EventError> {
        self.ensure_queue(event_type).add(listener, options)
    }

    /// Subscribe for a single dispatch
    pub fn once(&self, event_type: &str, listener: impl Into<Listener>) -> Result<(), EventError> {
        self.on_with(event_type, listener, ListenerOptions::new().once())
    }

    /// Subscribe for a single dispatch with extra options
    pub fn once_with(
        &self,
        event_type: &str,
        listener: impl Into<Listener>,
        options: ListenerOptions,
    ) -> Result<(), EventError> {
        self.on_with(event_type, listener, options.once())
    }

    /// Unsubscribe a listener registered without an owner
    pub fn un(&self, event_type: &str, listener: impl Into<Listener>) {
        self.un_with(event_type, Some(&listener.into()), None);
    }

    /// Unsubscribe one listener, or all of `event_type` when `listener` is `None`
    ///
    /// Only the queue of `event_type` is touched; `"*"` means the wildcard
    /// queue, not every queue.
    pub fn un_with(&self, event_type: &str, listener: Option<&Listener>, this_object: Option<&Owner>) {
        if let Some(queue) = self.queue(event_type) {
            queue.remove(listener, this_object);
        }
    }

    /// Unsubscribe every listener of `event_type`
    pub fn un_all(&self, event_type: &str) {
        self.un_with(event_type, None, None);
    }

    /// Fire an event and return it after every listener ran
    ///
    /// The inline handler runs first, then the listeners of the event's
    /// type, then the wildcard listeners. A listener may tear the target
    /// down; the remaining phases then find nothing to run.
    pub fn fire(&self, event: impl IntoEvent) -> Result<Event, EventError> {
        let mut event = event.into_event();
        let event_type = event.event_type().to_string();
        if event_type.is_empty() {
            return Err(EventError::MissingEventType);
        }
        if event_type == WILDCARD {
            return Err(EventError::ReservedEventType(event_type));
        }

        event.set_target(self.clone());
        let this = self.this_object();
        trace!("firing `{}`", event_type);

        if let Some(inline) = self.inline_handler(&event_type) {
            inline.call(&mut event, this.as_ref());
        }

        if let Some(queue) = self.queue(&event_type) {
            queue.execute(&mut event, this.as_ref());
        }

        if let Some(queue) = self.queue(WILDCARD) {
            trace!("running wildcard listeners for `{}`", event_type);
            queue.execute(&mut event, this.as_ref());
        }

        Ok(event)
    }

    /// Dispose every queue; subscribing again starts from scratch
    pub fn destroy_events(&self) {
        let queues = lock(&self.inner.queues).take();
        if let Some(queues) = queues {
            for queue in queues.values() {
                queue.dispose();
            }
        }
    }

    /// Set the inline handler of `event_type`, replacing any previous one
    pub fn set_inline_handler(&self, event_type: &str, handler: Handler) {
        lock(&self.inner.inline).insert(event_type.to_string(), handler);
    }

    /// The inline handler of `event_type`
    pub fn inline_handler(&self, event_type: &str) -> Option<Handler> {
        lock(&self.inner.inline).get(event_type).cloned()
    }

    /// Remove the inline handler of `event_type`
    pub fn clear_inline_handler(&self, event_type: &str) -> Option<Handler> {
        lock(&self.inner.inline).remove(event_type)
    }

    /// Number of queued listeners for `event_type`
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.queue(event_type).map_or(0, |queue| queue.len())
    }

    /// Whether `event_type` has queued listeners
    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.listener_count(event_type) > 0
    }
}

/// Weak handle to an [`EventTarget`]
#[derive(Clone, Debug)]
pub struct WeakEventTarget {
    inner: Weak<TargetInner>,
}

impl WeakEventTarget {
    /// The target, if it is still alive
    pub fn upgrade(&self) -> Option<EventTarget> {
        self.inner.upgrade().map(|inner| EventTarget { inner })
    }
}

/// Event capability for any type that holds an [`EventTarget`]
///
/// Implementing [`event_target`](Observable::event_target) is enough; every
/// other method forwards to it.
///
/// ```
/// use esui::events::{Event, EventTarget, Observable};
///
/// struct Slider {
///     events: EventTarget,
/// }
///
/// impl Observable for Slider {
///     fn event_target(&self) -> &EventTarget {
///         &self.events
///     }
/// }
///
/// let slider = Slider { events: EventTarget::new() };
/// let event = slider.fire(Event::new("change")).unwrap();
/// assert_eq!(event.event_type(), "change");
/// ```
pub trait Observable {
    /// The component doing the actual dispatch
    fn event_target(&self) -> &EventTarget;

    /// Subscribe to `event_type`
    fn on(
        &self,
        event_type: &str,
        listener: Listener,
        options: ListenerOptions,
    ) -> Result<(), EventError> {
        self.event_target().on_with(event_type, listener, options)
    }

    /// Subscribe for a single dispatch
    fn once(
        &self,
        event_type: &str,
        listener: Listener,
        options: ListenerOptions,
    ) -> Result<(), EventError> {
        self.event_target().once_with(event_type, listener, options)
    }

    /// Unsubscribe one listener, or all of `event_type`
    fn un(&self, event_type: &str, listener: Option<&Listener>, this_object: Option<&Owner>) {
        self.event_target().un_with(event_type, listener, this_object)
    }

    /// Fire an event
    fn fire(&self, event: Event) -> Result<Event, EventError> {
        self.event_target().fire(event)
    }

    /// Dispose every queue
    fn destroy_events(&self) {
        self.event_target().destroy_events()
    }
}

impl Observable for EventTarget {
    fn event_target(&self) -> &EventTarget {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Handler) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let handler = Handler::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, handler)
    }

    #[test]
    fn fire_without_listeners() {
        let target = EventTarget::new();
        let event = target.fire("x").unwrap();
        assert_eq!(event.event_type(), "x");
        assert_eq!(event.target(), Some(&target));
    }

    #[test]
    fn fire_single_object() {
        let target = EventTarget::new();
        let event = target.fire(json!({ "type": "x", "a": 1 })).unwrap();
        assert_eq!(event.event_type(), "x");
        assert_eq!(event.get("a"), Some(&json!(1)));
    }

    #[test]
    fn fire_rejects_missing_and_reserved_types() {
        let target = EventTarget::new();
        assert_eq!(target.fire("").unwrap_err(), EventError::MissingEventType);
        assert_eq!(
            target.fire(json!(null)).unwrap_err(),
            EventError::MissingEventType
        );
        assert_eq!(
            target.fire(json!({ "a": 1 })).unwrap_err(),
            EventError::MissingEventType
        );
        assert_eq!(
            target.fire("*").unwrap_err(),
            EventError::ReservedEventType("*".to_string())
        );
    }

    #[test]
    fn prebuilt_event_is_reused() {
        let target = EventTarget::new();
        let mut event = Event::new("save");
        event.set("id", json!(7));
        let fired = target.fire(event).unwrap();
        assert_eq!(fired.get("id"), Some(&json!(7)));
        assert!(fired.target().is_some());
    }

    #[test]
    fn once_and_on_mix() {
        let target = EventTarget::new();
        let (h1_count, h1) = counter();
        let (h2_count, h2) = counter();
        target.on("a", &h1).unwrap();
        target.once("a", &h2).unwrap();
        target.fire("a").unwrap();
        target.fire("a").unwrap();
        assert_eq!(h1_count.load(Ordering::SeqCst), 2);
        assert_eq!(h2_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_order_inline_concrete_wildcard() {
        let target = EventTarget::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let record = |name: &'static str| {
            let log = log.clone();
            Handler::new(move |event: &mut Event| {
                log.lock()
                    .unwrap()
                    .push(format!("{}:{}", name, event.event_type()));
            })
        };

        target.on("*", record("wild")).unwrap();
        target.on("click", record("queue")).unwrap();
        target.set_inline_handler("click", record("inline"));

        target.fire("click").unwrap();
        target.fire("other").unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["inline:click", "queue:click", "wild:click", "wild:other"]
        );
    }

    #[test]
    fn un_removes_only_named_type() {
        let target = EventTarget::new();
        let (count, handler) = counter();
        target.on("a", &handler).unwrap();
        target.on("*", &handler).unwrap();

        target.un_all("*");
        target.fire("a").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        target.un("a", &handler);
        target.un("missing", &handler);
        target.fire("a").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroy_mid_dispatch_is_tolerated() {
        let target = EventTarget::new();
        let (count, after) = counter();
        let (wild_count, wild) = counter();
        let target_clone = target.clone();
        target
            .on("a", Handler::new(move |_| target_clone.destroy_events()))
            .unwrap();
        target.on("a", &after).unwrap();
        target.on("*", &wild).unwrap();

        let event = target.fire("a").unwrap();
        assert_eq!(event.event_type(), "a");
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(wild_count.load(Ordering::SeqCst), 0);
        assert!(!target.has_listeners("a"));

        target.on("a", &after).unwrap();
        target.fire("a").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resubscribing_mid_dispatch_waits_for_next_fire() {
        let target = EventTarget::new();
        let (filler_count, filler) = counter();
        let (late_count, late) = counter();
        let target_clone = target.clone();
        target
            .on(
                "a",
                Handler::new(move |_| {
                    target_clone.un_all("a");
                    target_clone.on("a", &filler).unwrap();
                    target_clone.on("a", &late).unwrap();
                }),
            )
            .unwrap();
        target.on("a", counter().1).unwrap();
        target.on("a", counter().1).unwrap();

        target.fire("a").unwrap();
        assert_eq!(filler_count.load(Ordering::SeqCst), 0);
        assert_eq!(late_count.load(Ordering::SeqCst), 0);

        target.fire("a").unwrap();
        assert_eq!(filler_count.load(Ordering::SeqCst), 1);
        assert_eq!(late_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroy_without_listeners() {
        let target = EventTarget::new();
        target.destroy_events();
        target.destroy_events();
        assert_eq!(target.listener_count("a"), 0);
    }

    #[test]
    fn bound_this_is_fallback() {
        let target = EventTarget::new();
        let owner: Owner = Arc::new(String::from("widget"));
        target.bind_this(&owner);

        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        target
            .on(
                "a",
                Handler::with_this(move |_, this| {
                    *seen_clone.lock().unwrap() =
                        this.and_then(|owner| owner.downcast_ref::<String>()).cloned();
                }),
            )
            .unwrap();
        target.fire("a").unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("widget"));

        drop(owner);
        assert!(target.this_object().is_none());
    }

    #[test]
    fn stop_immediate_skips_wildcard_phase() {
        let target = EventTarget::new();
        let (wild_count, wild) = counter();
        target
            .on("a", Handler::new(|event| event.stop_immediate_propagation()))
            .unwrap();
        target.on("*", &wild).unwrap();
        target.fire("a").unwrap();
        assert_eq!(wild_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_listener_through_target() {
        let target = EventTarget::new();
        target.on("submit", Listener::Cancel).unwrap();
        let event = target.fire("submit").unwrap();
        assert!(event.is_default_prevented());
        assert!(event.is_propagation_stopped());
    }

    #[test]
    fn observable_forwards_to_target() {
        struct Widget {
            events: EventTarget,
        }

        impl Observable for Widget {
            fn event_target(&self) -> &EventTarget {
                &self.events
            }
        }

        let widget = Widget {
            events: EventTarget::new(),
        };
        let (count, handler) = counter();
        let listener = Listener::from(&handler);
        Observable::on(&widget, "a", listener.clone(), ListenerOptions::new()).unwrap();
        Observable::fire(&widget, Event::new("a")).unwrap();
        Observable::un(&widget, "a", Some(&listener), None);
        Observable::fire(&widget, Event::new("a")).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        Observable::destroy_events(&widget);
        assert!(!widget.events.has_listeners("a"));
    }

    #[test]
    fn weak_handle_does_not_keep_target_alive() {
        let target = EventTarget::new();
        let weak = target.downgrade();
        assert_eq!(weak.upgrade(), Some(target.clone()));
        drop(target);
        assert!(weak.upgrade().is_none());
    }
}
