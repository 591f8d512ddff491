use crate::RealtimeEvent;
use crate::types::constants::SUBSCRIBER_BUFFER_SIZE;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Callback invoked with the payload of a re-published event.
///
/// Identity is the allocation: registering the same `Listener` twice is a
/// no-op, and `off` removes exactly the listener passed in.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync + 'static>;

/// Wraps a closure as a [`Listener`].
pub fn listener<F>(callback: F) -> Listener
where
    F: Fn(&Value) + Send + Sync + 'static,
{
    Arc::new(callback)
}

#[derive(Default)]
struct Bindings {
    listeners: Vec<Listener>,
    subscribers: Vec<mpsc::Sender<Value>>,
}

impl Bindings {
    fn is_empty(&self) -> bool {
        self.listeners.is_empty() && self.subscribers.is_empty()
    }
}

/// Event name to set-of-callbacks mapping shared by every consumer of a client.
///
/// Entries outlive reconnects; nothing is removed unless a caller asks.
#[derive(Default)]
pub struct ListenerRegistry {
    bindings: RwLock<HashMap<RealtimeEvent, Bindings>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener. Returns `false` if it was already registered for the event.
    pub fn on(&self, event: impl Into<RealtimeEvent>, listener: Listener) -> bool {
        let event = event.into();
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        let entry = bindings.entry(event).or_default();

        if entry.listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        entry.listeners.push(listener);
        true
    }

    /// Removes a listener. Returns `false` if it was not registered for the event.
    pub fn off(&self, event: impl Into<RealtimeEvent>, listener: &Listener) -> bool {
        let event = event.into();
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = bindings.get_mut(&event) else {
            return false;
        };

        let before = entry.listeners.len();
        entry.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        let removed = entry.listeners.len() != before;

        if entry.is_empty() {
            bindings.remove(&event);
        }
        removed
    }

    /// Channel-backed subscription. Dropping the receiver unsubscribes.
    pub fn subscribe(&self, event: impl Into<RealtimeEvent>) -> mpsc::Receiver<Value> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER_SIZE);
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.into())
            .or_default()
            .subscribers
            .push(tx);
        rx
    }

    /// Number of callbacks and live subscribers for an event.
    pub fn listener_count(&self, event: &RealtimeEvent) -> usize {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map(|b| {
                b.listeners.len() + b.subscribers.iter().filter(|s| !s.is_closed()).count()
            })
            .unwrap_or(0)
    }

    /// Delivers a payload to everything registered for the event.
    ///
    /// Callbacks run outside the registry lock, so they may call `on`/`off`.
    /// Returns the number of deliveries made.
    pub fn publish(&self, event: &RealtimeEvent, payload: &Value) -> usize {
        let (listeners, subscribers) = {
            let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
            match bindings.get(event) {
                Some(b) => (b.listeners.clone(), b.subscribers.clone()),
                None => {
                    tracing::debug!("No listeners for '{}'", event);
                    return 0;
                }
            }
        };

        let mut delivered = 0;
        for listener in &listeners {
            listener(payload);
            delivered += 1;
        }

        let mut saw_closed = false;
        for subscriber in &subscribers {
            match subscriber.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        "Subscriber for '{}' is full, dropping event",
                        event
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => saw_closed = true,
            }
        }

        if saw_closed {
            self.prune_closed(event);
        }

        tracing::debug!("Published '{}' to {} listener(s)", event, delivered);
        delivered
    }

    fn prune_closed(&self, event: &RealtimeEvent) {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = bindings.get_mut(event) {
            entry.subscribers.retain(|s| !s.is_closed());
            if entry.is_empty() {
                bindings.remove(event);
            }
        }
    }
}
