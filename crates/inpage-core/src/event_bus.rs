//! Fault-isolated publish/subscribe.
//!
//! Listeners run synchronously, in registration order, against a snapshot
//! of the listener list taken when `emit` starts. A listener that returns an
//! error or panics does not stop delivery to the remaining listeners and is
//! never reported to the emitter; the failure is logged and forwarded to
//! every `listener_failures()` receiver instead.
//!
//! The one exception is the `"error"` event type: emitting it with no
//! listener registered fails the emit call itself.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::ProviderError;

/// Event type that fails loudly when nobody listens.
pub const ERROR_EVENT: &str = "error";

/// An event deliverable through an [`EventBus`].
pub trait BusEvent: Send + Sync + 'static {
    /// Name listeners subscribe to.
    fn event_type(&self) -> &str;

    /// Text carried by an unhandled `error` event.
    fn describe(&self) -> String {
        self.event_type().to_string()
    }
}

/// Handle returned by `on` / `once`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A listener failure that was isolated during dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    pub event_type: String,
    pub listener: ListenerId,
    pub message: String,
}

type Listener<E> = Arc<dyn Fn(&E) -> anyhow::Result<()> + Send + Sync>;

struct Entry<E> {
    id: ListenerId,
    once: bool,
    listener: Listener<E>,
}

impl<E> Clone for Entry<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            once: self.once,
            listener: Arc::clone(&self.listener),
        }
    }
}

/// Named-event dispatcher with per-listener fault isolation.
pub struct EventBus<E> {
    listeners: Mutex<HashMap<String, Vec<Entry<E>>>>,
    next_id: AtomicU64,
    failure_sinks: Mutex<Vec<mpsc::UnboundedSender<ListenerFailure>>>,
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            failure_sinks: Mutex::new(Vec::new()),
        }
    }

    /// Register `listener` for every future `event_type` event.
    pub fn on<F>(&self, event_type: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(event_type.into(), false, Arc::new(listener))
    }

    /// Register `listener` for the next `event_type` event only.
    pub fn once<F>(&self, event_type: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(event_type.into(), true, Arc::new(listener))
    }

    fn register(&self, event_type: String, once: bool, listener: Listener<E>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .entry(event_type)
            .or_default()
            .push(Entry { id, once, listener });
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let mut removed = false;
        listeners.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            removed |= entries.len() != before;
            !entries.is_empty()
        });
        removed
    }

    /// Remove every listener of `event_type`.
    pub fn remove_all_listeners(&self, event_type: &str) {
        self.listeners.lock().remove(event_type);
    }

    /// Number of listeners currently registered for `event_type`.
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .lock()
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Receive every listener failure isolated from now on.
    pub fn listener_failures(&self) -> mpsc::UnboundedReceiver<ListenerFailure> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.failure_sinks.lock().push(tx);
        rx
    }

    /// Deliver `event` to its listeners.
    ///
    /// Returns `Ok(true)` if at least one listener was invoked, `Ok(false)`
    /// if none was registered, and `Err(UnhandledErrorEvent)` for an `"error"`
    /// event nobody listens to.
    pub fn emit(&self, event: E) -> Result<bool, ProviderError> {
        let event_type = event.event_type().to_string();

        let snapshot = {
            let mut listeners = self.listeners.lock();
            match listeners.get_mut(&event_type) {
                Some(entries) => {
                    let snapshot = entries.clone();
                    entries.retain(|entry| !entry.once);
                    snapshot
                }
                None => Vec::new(),
            }
        };

        if snapshot.is_empty() {
            if event_type == ERROR_EVENT {
                return Err(ProviderError::UnhandledErrorEvent(event.describe()));
            }
            tracing::trace!(event = %event_type, "no listeners");
            return Ok(false);
        }

        for entry in &snapshot {
            self.invoke(&event_type, entry, &event);
        }
        Ok(true)
    }

    fn invoke(&self, event_type: &str, entry: &Entry<E>, event: &E) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (entry.listener)(event)));
        let message = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => format!("{err:#}"),
            Err(payload) => panic_message(payload.as_ref()),
        };

        tracing::error!(
            event = %event_type,
            listener = %entry.id,
            error = %message,
            "event listener failed"
        );

        let failure = ListenerFailure {
            event_type: event_type.to_string(),
            listener: entry.id,
            message,
        };
        self.failure_sinks
            .lock()
            .retain(|sink| sink.send(failure.clone()).is_ok());
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock();
        f.debug_struct("EventBus")
            .field("event_types", &listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("listener panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("listener panicked: {s}")
    } else {
        "listener panicked".to_string()
    }
}
