//! Per-instance publish/subscribe.
//!
//! Every [`Instance`] can [`listen`](Instance::listen) to, and
//! [`trigger`](Instance::trigger), arbitrary named events. Delivery is
//! synchronous and in registration order. The only event the object model
//! emits on its own is [`CHANGED`].
//!
//! Handlers are compared by reference: clones of a [`Handler`] share one
//! identity, two handlers built from identical closures do not.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::instance::{Instance, WeakInstance};

/// Name of the event emitted after every non-quiet property change.
pub const CHANGED: &str = "changed";

type HandlerFn = dyn Fn(&Instance, &[Value]) -> Result<()>;

/// An event callback. The first argument is the record's context instance.
#[derive(Clone)]
pub struct Handler(Rc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> Result<()> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn ptr_eq(&self, other: &Handler) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }

    pub fn call(&self, context: &Instance, args: &[Value]) -> Result<()> {
        (self.0)(context, args)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&(Rc::as_ptr(&self.0) as *const ()))
            .finish()
    }
}

/// A registered handler together with the instance it is invoked against.
#[derive(Clone, Debug)]
pub struct SubscriberRecord {
    handler: Handler,
    context: WeakInstance,
}

impl SubscriberRecord {
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// The context instance, if it is still alive.
    pub fn context(&self) -> Option<Instance> {
        self.context.upgrade()
    }
}

/// Callback storage owned by one instance. The map is created on first use.
#[derive(Default)]
pub(crate) struct Emitter {
    callbacks: Option<IndexMap<String, Vec<SubscriberRecord>>>,
}

impl Emitter {
    fn list_mut(&mut self, event: &str) -> &mut Vec<SubscriberRecord> {
        self.callbacks
            .get_or_insert_with(IndexMap::new)
            .entry(event.to_string())
            .or_default()
    }

    fn push(&mut self, event: &str, record: SubscriberRecord) {
        self.list_mut(event).push(record);
    }

    /// Drops records whose context is gone and returns copies of the rest,
    /// along with how many were dropped.
    fn live_snapshot(&mut self, event: &str) -> (Vec<SubscriberRecord>, usize) {
        let list = self.list_mut(event);
        let before = list.len();
        list.retain(|record| record.context.upgrade().is_some());
        (list.clone(), before - list.len())
    }

    fn records(&self, event: &str) -> Vec<SubscriberRecord> {
        self.callbacks
            .as_ref()
            .and_then(|calls| calls.get(event))
            .cloned()
            .unwrap_or_default()
    }

    fn clear_all(&mut self) {
        self.callbacks = Some(IndexMap::new());
    }

    fn clear(&mut self, event: &str) -> usize {
        let list = self.list_mut(event);
        let removed = list.len();
        list.clear();
        removed
    }

    fn remove(&mut self, event: &str, handler: &Handler) -> usize {
        let list = self.list_mut(event);
        let before = list.len();
        list.retain(|record| !record.handler.ptr_eq(handler));
        before - list.len()
    }

    fn count(&self, event: &str) -> usize {
        self.callbacks
            .as_ref()
            .and_then(|calls| calls.get(event))
            .map_or(0, Vec::len)
    }

    fn events(&self) -> Vec<String> {
        self.callbacks
            .as_ref()
            .map(|calls| calls.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Instance {
    /// Registers `handler` for `event` with this instance as its context.
    pub fn listen(&self, event: &str, handler: Handler) {
        self.listen_with(event, handler, self);
    }

    /// Registers `handler` for `event`, to be invoked against `context`.
    ///
    /// The context is held weakly: once it is dropped the record is pruned
    /// by the next [`trigger`](Instance::trigger) of `event`.
    pub fn listen_with(&self, event: &str, handler: Handler, context: &Instance) {
        let record = SubscriberRecord {
            handler,
            context: context.downgrade(),
        };
        let mut emitter = self.inner.emitter.borrow_mut();
        emitter.push(event, record);
        tracing::trace!(
            class = %self.class().name(),
            event,
            subscribers = emitter.count(event),
            "listener added"
        );
    }

    /// Invokes every handler registered for `event`, in registration order.
    ///
    /// The handler list is captured when the call starts, so registrations
    /// and removals made by a handler take effect from the next trigger. The
    /// first handler error aborts delivery and is returned. Records whose
    /// context has been dropped are removed before delivery.
    pub fn trigger(&self, event: &str, args: &[Value]) -> Result<()> {
        let (records, pruned) = self.inner.emitter.borrow_mut().live_snapshot(event);
        tracing::trace!(
            class = %self.class().name(),
            event,
            subscribers = records.len(),
            pruned,
            "trigger"
        );
        for record in records {
            // A handler earlier in this delivery may have dropped the context.
            let Some(context) = record.context.upgrade() else {
                tracing::trace!(event, "skipping listener with dropped context");
                continue;
            };
            record.handler.call(&context, args)?;
        }
        Ok(())
    }

    /// Removes listeners.
    ///
    /// | `event` | `handler` | effect                                         |
    /// |---------|-----------|------------------------------------------------|
    /// | `None`  | `None`    | clear every event                              |
    /// | `Some`  | `None`    | clear that event                               |
    /// | `Some`  | `Some`    | remove every record of that event with handler |
    /// | `None`  | `Some`    | [`Error::ListenerWithoutEvent`]                |
    pub fn remove_listener(&self, event: Option<&str>, handler: Option<&Handler>) -> Result<()> {
        let mut emitter = self.inner.emitter.borrow_mut();
        match (event, handler) {
            (None, None) => {
                emitter.clear_all();
                tracing::trace!(class = %self.class().name(), "all listeners removed");
            }
            (None, Some(_)) => return Err(Error::ListenerWithoutEvent),
            (Some(event), None) => {
                let removed = emitter.clear(event);
                tracing::trace!(class = %self.class().name(), event, removed, "listeners cleared");
            }
            (Some(event), Some(handler)) => {
                let removed = emitter.remove(event, handler);
                tracing::trace!(class = %self.class().name(), event, removed, "listener removed");
            }
        }
        Ok(())
    }

    /// Number of records stored for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner.emitter.borrow().count(event)
    }

    /// Records stored for `event`, in registration order.
    pub fn subscribers(&self, event: &str) -> Vec<SubscriberRecord> {
        self.inner.emitter.borrow().records(event)
    }

    /// Event names that have a subscriber list, in first-use order.
    pub fn events(&self) -> Vec<String> {
        self.inner.emitter.borrow().events()
    }
}
