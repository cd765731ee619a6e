//! Ordered listener queue for one event type on one target
//!
//! Records live in slots. Removing a record leaves an empty slot behind so a
//! dispatch that is iterating by index never skips or repeats a listener.
//! Empty slots are compacted only when no dispatch is running on the queue.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::trace;
use serde_json::{Map, Value};

use super::error::EventError;
use super::event::Event;

/// The `this` value a listener is bound to, compared by identity
pub type Owner = Arc<dyn Any + Send + Sync>;

/// Type for listener callbacks
type Callback = dyn Fn(&mut Event, Option<&Owner>) + Send + Sync;

/// A shareable event callback
///
/// Clones share identity, so keep a clone around to unsubscribe later.
#[derive(Clone)]
pub struct Handler {
    func: Arc<Callback>,
}

impl Handler {
    /// Wrap a callback that only needs the event
    pub fn new(func: impl Fn(&mut Event) + Send + Sync + 'static) -> Self {
        Self {
            func: Arc::new(move |event: &mut Event, _: Option<&Owner>| func(event)),
        }
    }

    /// Wrap a callback that also receives its bound `this`
    pub fn with_this(func: impl Fn(&mut Event, Option<&Owner>) + Send + Sync + 'static) -> Self {
        Self {
            func: Arc::new(func),
        }
    }

    /// Invoke the callback
    pub fn call(&self, event: &mut Event, this: Option<&Owner>) {
        (self.func)(event, this)
    }

    /// Whether both handles wrap the same callback
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.func) as *const (),
            Arc::as_ptr(&other.func) as *const (),
        )
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Arc::as_ptr(&self.func) as *const ())
    }
}

/// What runs when a record is reached during dispatch
#[derive(Clone, Debug)]
pub enum Listener {
    /// Call a handler
    Callback(Handler),

    /// Prevent the default action and stop propagation
    Cancel,
}

impl Listener {
    /// Identity comparison; all `Cancel` listeners are the same listener
    pub fn same(&self, other: &Listener) -> bool {
        match (self, other) {
            (Listener::Callback(a), Listener::Callback(b)) => a.ptr_eq(b),
            (Listener::Cancel, Listener::Cancel) => true,
            _ => false,
        }
    }
}

impl From<Handler> for Listener {
    fn from(handler: Handler) -> Self {
        Listener::Callback(handler)
    }
}

impl From<&Handler> for Listener {
    fn from(handler: &Handler) -> Self {
        Listener::Callback(handler.clone())
    }
}

/// Identity comparison where no owner only equals no owner
pub(crate) fn same_owner(a: Option<&Owner>, b: Option<&Owner>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => std::ptr::eq(
            Arc::as_ptr(a) as *const (),
            Arc::as_ptr(b) as *const (),
        ),
        _ => false,
    }
}

/// Per-listener configuration
#[derive(Clone, Default)]
pub struct ListenerOptions {
    /// `this` passed to the handler instead of the target's own
    pub this_object: Option<Owner>,

    /// Remove the listener after its first run
    pub once: bool,

    /// Pass-through configuration kept on the record
    pub extra: Map<String, Value>,
}

impl ListenerOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the listener to an owner
    pub fn this_object(mut self, owner: Owner) -> Self {
        self.this_object = Some(owner);
        self
    }

    /// Run the listener at most once
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Keep an extra configuration field on the record
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for ListenerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerOptions")
            .field("this_object", &self.this_object.is_some())
            .field("once", &self.once)
            .field("extra", &self.extra)
            .finish()
    }
}

#[derive(Clone)]
struct HandlerRecord {
    listener: Listener,
    this_object: Option<Owner>,
    once: bool,
    extra: Map<String, Value>,
}

struct Slots {
    /// `None` once the queue is disposed
    records: Option<Vec<Option<HandlerRecord>>>,
    /// Number of `execute` calls in flight
    dispatching: usize,
    /// Bumped by `clear` and `dispose`; a dispatch ends when it changes
    generation: u64,
}

impl Slots {
    fn compact(&mut self, event_type: &str) {
        if self.dispatching > 0 {
            return;
        }
        if let Some(records) = &mut self.records {
            let before = records.len();
            records.retain(Option::is_some);
            if records.len() != before {
                trace!(
                    "compacted `{}` queue: {} -> {} slots",
                    event_type,
                    before,
                    records.len()
                );
            }
        }
    }
}

/// Ordered listener queue
#[derive(Clone)]
pub struct EventQueue {
    event_type: Arc<str>,
    slots: Arc<Mutex<Slots>>,
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("event_type", &self.event_type)
            .field("len", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl EventQueue {
    /// Create an empty queue for `event_type`
    pub fn new(event_type: &str) -> Self {
        Self {
            event_type: Arc::from(event_type),
            slots: Arc::new(Mutex::new(Slots {
                records: Some(Vec::new()),
                dispatching: 0,
                generation: 0,
            })),
        }
    }

    // Listeners never run while the lock is held, so a poisoned lock still
    // guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The event type this queue serves
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Append a listener unless the same (listener, owner) pair is queued
    pub fn add(
        &self,
        listener: impl Into<Listener>,
        options: ListenerOptions,
    ) -> Result<(), EventError> {
        let listener = listener.into();
        let mut slots = self.lock();
        let records = slots
            .records
            .as_mut()
            .ok_or_else(|| EventError::QueueDisposed(self.event_type.to_string()))?;

        let duplicate = records.iter().flatten().any(|record| {
            record.listener.same(&listener)
                && same_owner(record.this_object.as_ref(), options.this_object.as_ref())
        });
        if !duplicate {
            records.push(Some(HandlerRecord {
                listener,
                this_object: options.this_object,
                once: options.once,
                extra: options.extra,
            }));
        }
        Ok(())
    }

    /// Remove one matching listener, or every listener when `listener` is `None`
    pub fn remove(&self, listener: Option<&Listener>, this_object: Option<&Owner>) {
        let Some(listener) = listener else {
            self.clear();
            return;
        };

        let mut slots = self.lock();
        let Some(records) = slots.records.as_mut() else {
            return;
        };
        let found = records.iter_mut().find(|slot| {
            slot.as_ref().is_some_and(|record| {
                record.listener.same(listener)
                    && same_owner(record.this_object.as_ref(), this_object)
            })
        });
        if let Some(slot) = found {
            *slot = None;
            slots.compact(&self.event_type);
        }
    }

    /// Drop every listener; the queue stays usable
    ///
    /// A dispatch in flight runs no further listener, including ones added
    /// after the clear.
    pub fn clear(&self) {
        let mut slots = self.lock();
        slots.generation += 1;
        if let Some(records) = slots.records.as_mut() {
            records.clear();
        }
    }

    /// Pass-through configuration of the record for `(listener, this_object)`
    pub fn extra(
        &self,
        listener: &Listener,
        this_object: Option<&Owner>,
    ) -> Option<Map<String, Value>> {
        self.lock()
            .records
            .as_ref()?
            .iter()
            .flatten()
            .find(|record| {
                record.listener.same(listener)
                    && same_owner(record.this_object.as_ref(), this_object)
            })
            .map(|record| record.extra.clone())
    }

    /// Run every listener in order
    ///
    /// Listeners without an owner receive `this`. Dispatch stops as soon as
    /// the event reports immediate propagation stopped. Listeners added
    /// during the run wait for the next dispatch.
    pub fn execute(&self, event: &mut Event, this: Option<&Owner>) {
        let (len, generation) = {
            let mut slots = self.lock();
            let Some(len) = slots.records.as_ref().map(Vec::len) else {
                return;
            };
            slots.dispatching += 1;
            (len, slots.generation)
        };
        let _guard = DispatchGuard { queue: self };

        for index in 0..len {
            if event.is_immediate_propagation_stopped() {
                break;
            }

            let record = {
                let slots = self.lock();
                if slots.generation != generation {
                    break;
                }
                match slots.records.as_ref() {
                    Some(records) => records.get(index).cloned().flatten(),
                    None => break,
                }
            };
            let Some(record) = record else {
                continue;
            };

            match &record.listener {
                Listener::Cancel => {
                    event.prevent_default();
                    event.stop_propagation();
                }
                Listener::Callback(handler) => {
                    handler.call(event, record.this_object.as_ref().or(this));
                }
            }

            if record.once {
                self.remove(Some(&record.listener), record.this_object.as_ref());
            }
        }
    }

    /// Number of live listeners
    pub fn len(&self) -> usize {
        self.lock()
            .records
            .as_ref()
            .map_or(0, |records| records.iter().flatten().count())
    }

    /// Whether no live listener is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the queue and release its storage; later `add` calls fail
    pub fn dispose(&self) {
        let mut slots = self.lock();
        slots.generation += 1;
        slots.records = None;
    }

    /// Whether [`dispose`](Self::dispose) was called
    pub fn is_disposed(&self) -> bool {
        self.lock().records.is_none()
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.lock().records.as_ref().map_or(0, Vec::len)
    }
}

/// Ends a dispatch even if a listener panics
struct DispatchGuard<'a> {
    queue: &'a EventQueue,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self.queue.lock();
        slots.dispatching = slots.dispatching.saturating_sub(1);
        slots.compact(&self.queue.event_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Handler) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let handler = Handler::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, handler)
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Handler {
        let log = log.clone();
        Handler::new(move |_| log.lock().unwrap().push(name))
    }

    #[test]
    fn duplicate_pair_is_added_once() {
        let queue = EventQueue::new("click");
        let (count, handler) = counter();
        queue.add(&handler, ListenerOptions::new()).unwrap();
        queue.add(&handler, ListenerOptions::new()).unwrap();
        assert_eq!(queue.len(), 1);

        queue.execute(&mut Event::new("click"), None);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn same_handler_with_different_owners_is_kept_twice() {
        let queue = EventQueue::new("click");
        let (count, handler) = counter();
        let owner: Owner = Arc::new(1_u8);
        queue.add(&handler, ListenerOptions::new()).unwrap();
        queue
            .add(&handler, ListenerOptions::new().this_object(owner.clone()))
            .unwrap();
        queue
            .add(&handler, ListenerOptions::new().this_object(owner))
            .unwrap();
        assert_eq!(queue.len(), 2);

        queue.execute(&mut Event::new("click"), None);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn remove_matches_owner() {
        let queue = EventQueue::new("click");
        let (_, handler) = counter();
        let owner: Owner = Arc::new("owner");
        let listener = Listener::from(&handler);
        queue
            .add(&handler, ListenerOptions::new().this_object(owner.clone()))
            .unwrap();

        queue.remove(Some(&listener), None);
        assert_eq!(queue.len(), 1);

        let other: Owner = Arc::new("owner");
        queue.remove(Some(&listener), Some(&other));
        assert_eq!(queue.len(), 1);

        queue.remove(Some(&listener), Some(&owner));
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_without_listener_clears() {
        let queue = EventQueue::new("click");
        queue.add(counter().1, ListenerOptions::new()).unwrap();
        queue.add(counter().1, ListenerOptions::new()).unwrap();
        queue.remove(None, None);
        assert!(queue.is_empty());

        queue.add(counter().1, ListenerOptions::new()).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remove_unknown_listener_is_noop() {
        let queue = EventQueue::new("click");
        queue.add(counter().1, ListenerOptions::new()).unwrap();
        queue.remove(Some(&Listener::from(counter().1)), None);
        queue.remove(Some(&Listener::Cancel), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn this_falls_back_to_dispatch_value() {
        let queue = EventQueue::new("click");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let handler = Handler::with_this(move |_, this| {
            let value = this
                .and_then(|owner| owner.downcast_ref::<&'static str>())
                .copied();
            seen_clone.lock().unwrap().push(value);
        });
        let own: Owner = Arc::new("own");
        let fallback: Owner = Arc::new("fallback");
        queue.add(&handler, ListenerOptions::new()).unwrap();
        queue
            .add(&handler, ListenerOptions::new().this_object(own))
            .unwrap();

        queue.execute(&mut Event::new("click"), Some(&fallback));
        assert_eq!(*seen.lock().unwrap(), vec![Some("fallback"), Some("own")]);
    }

    #[test]
    fn removal_during_dispatch_keeps_order() {
        let queue = EventQueue::new("click");
        let log = Arc::new(Mutex::new(Vec::new()));
        let second = recorder(&log, "second");
        let third = recorder(&log, "third");

        let queue_clone = queue.clone();
        let second_clone = second.clone();
        let log_clone = log.clone();
        let first = Handler::new(move |_| {
            log_clone.lock().unwrap().push("first");
            queue_clone.remove(Some(&Listener::from(&second_clone)), None);
        });

        queue.add(&first, ListenerOptions::new()).unwrap();
        queue.add(&second, ListenerOptions::new()).unwrap();
        queue.add(&third, ListenerOptions::new()).unwrap();

        queue.execute(&mut Event::new("click"), None);
        assert_eq!(*log.lock().unwrap(), vec!["first", "third"]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.slot_count(), 2);
    }

    #[test]
    fn self_removal_during_dispatch_does_not_skip_next() {
        let queue = EventQueue::new("click");
        let log = Arc::new(Mutex::new(Vec::new()));
        let next = recorder(&log, "next");

        let queue_clone = queue.clone();
        let log_clone = log.clone();
        let slot: Arc<Mutex<Option<Handler>>> = Arc::new(Mutex::new(None));
        let slot_clone = slot.clone();
        let first = Handler::new(move |_| {
            log_clone.lock().unwrap().push("first");
            if let Some(me) = slot_clone.lock().unwrap().as_ref() {
                queue_clone.remove(Some(&Listener::from(me)), None);
            }
        });
        *slot.lock().unwrap() = Some(first.clone());

        queue.add(&first, ListenerOptions::new()).unwrap();
        queue.add(&next, ListenerOptions::new()).unwrap();
        queue.execute(&mut Event::new("click"), None);
        queue.execute(&mut Event::new("click"), None);
        assert_eq!(*log.lock().unwrap(), vec!["first", "next", "next"]);
    }

    #[test]
    fn listeners_added_during_dispatch_wait() {
        let queue = EventQueue::new("click");
        let (count, late) = counter();
        let queue_clone = queue.clone();
        let adder = Handler::new(move |_| {
            queue_clone.add(&late, ListenerOptions::new()).unwrap();
        });
        queue.add(&adder, ListenerOptions::new()).unwrap();

        queue.execute(&mut Event::new("click"), None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        queue.execute(&mut Event::new("click"), None);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn immediate_stop_halts_dispatch() {
        let queue = EventQueue::new("click");
        let (count, after) = counter();
        let stopper = Handler::new(|event| event.stop_immediate_propagation());
        queue.add(&stopper, ListenerOptions::new()).unwrap();
        queue.add(&after, ListenerOptions::new()).unwrap();

        let mut event = Event::new("click");
        queue.execute(&mut event, None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(event.is_propagation_stopped());
    }

    #[test]
    fn pre_stopped_event_runs_nothing() {
        let queue = EventQueue::new("click");
        let (count, handler) = counter();
        queue.add(&handler, ListenerOptions::new()).unwrap();
        let mut event = Event::new("click");
        event.stop_immediate_propagation();
        queue.execute(&mut event, None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_listener_prevents_and_stops() {
        let queue = EventQueue::new("submit");
        let (count, after) = counter();
        queue.add(Listener::Cancel, ListenerOptions::new()).unwrap();
        queue.add(Listener::Cancel, ListenerOptions::new()).unwrap();
        queue.add(&after, ListenerOptions::new()).unwrap();
        assert_eq!(queue.len(), 2);

        let mut event = Event::new("submit");
        queue.execute(&mut event, None);
        assert!(event.is_default_prevented());
        assert!(event.is_propagation_stopped());
        assert!(!event.is_immediate_propagation_stopped());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn once_listener_runs_once() {
        let queue = EventQueue::new("click");
        let (count, handler) = counter();
        let owner: Owner = Arc::new(());
        queue
            .add(&handler, ListenerOptions::new().once().this_object(owner))
            .unwrap();

        queue.execute(&mut Event::new("click"), None);
        queue.execute(&mut Event::new("click"), None);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn nested_dispatch_defers_compaction() {
        let queue = EventQueue::new("click");
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim = recorder(&log, "victim");
        let depth = Arc::new(AtomicUsize::new(0));

        let queue_clone = queue.clone();
        let victim_clone = victim.clone();
        let depth_clone = depth.clone();
        let reentrant = Handler::new(move |_| {
            if depth_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                queue_clone.execute(&mut Event::new("click"), None);
                queue_clone.remove(Some(&Listener::from(&victim_clone)), None);
            }
        });
        queue.add(&reentrant, ListenerOptions::new()).unwrap();
        queue.add(&victim, ListenerOptions::new()).unwrap();

        queue.execute(&mut Event::new("click"), None);
        assert_eq!(*log.lock().unwrap(), vec!["victim"]);
        assert_eq!(queue.slot_count(), 1);
    }

    #[test]
    fn clear_during_dispatch_stops_remaining() {
        let queue = EventQueue::new("click");
        let (count, after) = counter();
        let queue_clone = queue.clone();
        let clearer = Handler::new(move |_| queue_clone.clear());
        queue.add(&clearer, ListenerOptions::new()).unwrap();
        queue.add(&after, ListenerOptions::new()).unwrap();

        queue.execute(&mut Event::new("click"), None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn listeners_added_after_clear_wait_for_next_dispatch() {
        let queue = EventQueue::new("click");
        let (late_count, late) = counter();
        let (filler_count, filler) = counter();
        let queue_clone = queue.clone();
        let late_clone = late.clone();
        let filler_clone = filler.clone();
        let resetter = Handler::new(move |_| {
            queue_clone.clear();
            queue_clone.add(&filler_clone, ListenerOptions::new()).unwrap();
            queue_clone.add(&late_clone, ListenerOptions::new()).unwrap();
        });
        queue.add(&resetter, ListenerOptions::new()).unwrap();
        queue.add(counter().1, ListenerOptions::new()).unwrap();
        queue.add(counter().1, ListenerOptions::new()).unwrap();

        queue.execute(&mut Event::new("click"), None);
        assert_eq!(filler_count.load(Ordering::SeqCst), 0);
        assert_eq!(late_count.load(Ordering::SeqCst), 0);
        assert_eq!(queue.len(), 2);

        queue.execute(&mut Event::new("click"), None);
        assert_eq!(filler_count.load(Ordering::SeqCst), 1);
        assert_eq!(late_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn extra_configuration_is_kept_per_record() {
        let queue = EventQueue::new("click");
        let (_, handler) = counter();
        let owner: Owner = Arc::new("form");
        queue
            .add(&handler, ListenerOptions::new().extra("capture", Value::Bool(true)))
            .unwrap();
        queue
            .add(&handler, ListenerOptions::new().this_object(owner.clone()))
            .unwrap();

        let listener = Listener::from(&handler);
        let extra = queue.extra(&listener, None).unwrap();
        assert_eq!(extra.get("capture"), Some(&Value::Bool(true)));
        assert!(queue.extra(&listener, Some(&owner)).unwrap().is_empty());
        assert!(queue.extra(&Listener::Cancel, None).is_none());
    }

    #[test]
    fn disposed_queue_rejects_listeners() {
        let queue = EventQueue::new("click");
        queue.add(counter().1, ListenerOptions::new()).unwrap();
        queue.dispose();
        assert!(queue.is_disposed());
        assert_eq!(queue.len(), 0);
        assert_eq!(
            queue.add(counter().1, ListenerOptions::new()),
            Err(EventError::QueueDisposed("click".to_string()))
        );
        queue.execute(&mut Event::new("click"), None);
        queue.remove(Some(&Listener::Cancel), None);
    }
}
