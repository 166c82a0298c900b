//! Named-signal dispatcher with scoped subscriptions.
//!
//! Listeners connect to a signal name (e.g. `ios.<device id>`) and receive
//! every payload sent on it. Connecting returns a [`Subscription`] guard;
//! dropping the guard disconnects the listener, so a listener can never
//! outlive the scope that owns its guard.

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback invoked with each payload sent on a signal.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    next_id: AtomicU64,
    signals: RwLock<HashMap<String, Vec<(u64, Listener<T>)>>>,
}

impl<T> Inner<T> {
    fn disconnect(&self, signal: &str, id: u64) {
        let mut signals = self.signals.write();
        if let Some(listeners) = signals.get_mut(signal) {
            listeners.retain(|(listener_id, _)| *listener_id != id);
            if listeners.is_empty() {
                signals.remove(signal);
            }
        }
    }
}

/// In-process dispatcher for payloads of type `T`.
///
/// Delivery is synchronous: [`Dispatcher::send`] runs every listener on the
/// caller's task in connection order before returning. There is no queue,
/// so the last payload sent is the last one every listener saw.
pub struct Dispatcher<T> {
    inner: Arc<Inner<T>>,
}

impl<T: 'static> Dispatcher<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(0),
                signals: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Connect a listener to `signal`.
    pub fn connect<F>(&self, signal: impl Into<String>, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let signal = signal.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .signals
            .write()
            .entry(signal.clone())
            .or_default()
            .push((id, Arc::new(listener)));
        debug!("[Hub] Connected listener {} to {}", id, signal);

        let inner: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.disconnect(&signal, id);
                    debug!("[Hub] Disconnected listener {} from {}", id, signal);
                }
            })),
        }
    }

    /// Send `payload` to every listener of `signal`.
    ///
    /// Returns the number of listeners that were called.
    pub fn send(&self, signal: &str, payload: &T) -> usize {
        // Snapshot so listeners may connect or disconnect while being called.
        let listeners: Vec<Listener<T>> = match self.inner.signals.read().get(signal) {
            Some(listeners) => listeners.iter().map(|(_, l)| l.clone()).collect(),
            None => return 0,
        };

        for listener in &listeners {
            listener(payload);
        }
        listeners.len()
    }

    /// Number of listeners currently connected to `signal`.
    pub fn receivers(&self, signal: &str) -> usize {
        self.inner
            .signals
            .read()
            .get(signal)
            .map_or(0, |listeners| listeners.len())
    }
}

impl<T: 'static> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for a connected listener. Disconnects on drop.
#[must_use = "dropping a Subscription disconnects the listener immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Disconnect now instead of waiting for drop.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
