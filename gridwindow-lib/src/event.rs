//! Cache lifecycle events
//!
//! Each event kind has its own [`EventHandlers`] registry. Handlers run
//! synchronously on the task that raised the event, in subscription order.

use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde_json::Value;

use crate::cache::Window;
use crate::error::TransportError;

// =============================================================================
// Payloads
// =============================================================================

/// Raised when a window is about to be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingStarted {
    /// The window being fetched.
    pub window: Window,
}

/// Raised after a response has been merged into the row store.
///
/// The window is the one that was requested, not what the server returned;
/// consumers should re-check `is_range_loaded` for the rows they care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loaded {
    /// The window that was requested.
    pub window: Window,
}

/// Raised when column metadata arrives with a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnsLoaded {
    /// Opaque column descriptors, in server order.
    pub columns: Arc<Vec<Value>>,
}

/// Raised when the transport fails to deliver a window.
#[derive(Debug, Clone)]
pub struct FetchFailed {
    /// The window that could not be fetched.
    pub window: Window,
    /// The transport error.
    pub error: Arc<TransportError>,
}

// =============================================================================
// EventHandlers
// =============================================================================

/// Identifies a subscription so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A list of subscribers for one event kind.
///
/// Cheap to clone; clones share the same subscriber list.
pub struct EventHandlers<T> {
    handlers: Arc<RwLock<Vec<(SubscriptionId, Handler<T>)>>>,
    next_id: Arc<AtomicU64>,
}

impl<T> Clone for EventHandlers<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<T> Default for EventHandlers<T> {
    fn default() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<T> EventHandlers<T> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler and return its subscription id.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.push((id, Arc::new(handler)));
        }
        id
    }

    /// Remove a handler. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Ok(mut handlers) = self.handlers.write() else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Invoke every handler with the given payload.
    ///
    /// The subscriber list is snapshotted first, so handlers may subscribe,
    /// unsubscribe or call back into the cache.
    pub fn notify(&self, event: &T) {
        let snapshot: Vec<Handler<T>> = match self.handlers.read() {
            Ok(handlers) => handlers.iter().map(|(_, h)| h.clone()).collect(),
            Err(_) => return,
        };
        for handler in snapshot {
            handler(event);
        }
    }

    /// Remove all handlers.
    pub fn clear(&self) {
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.clear();
        }
    }

    /// Get the number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> std::fmt::Debug for EventHandlers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlers")
            .field("handler_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_notify_reaches_all_subscribers_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handlers = EventHandlers::<u32>::new();

        let a = seen.clone();
        handlers.subscribe(move |v| a.lock().unwrap().push(("a", *v)));
        let b = seen.clone();
        handlers.subscribe(move |v| b.lock().unwrap().push(("b", *v)));

        handlers.notify(&3);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 3), ("b", 3)]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Arc::new(AtomicU64::new(0));
        let handlers = EventHandlers::<()>::new();

        let c = count.clone();
        let id = handlers.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        handlers.notify(&());
        assert!(handlers.unsubscribe(id));
        assert!(!handlers.unsubscribe(id));
        handlers.notify(&());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(handlers.is_empty());
    }

    #[test]
    fn test_handler_may_subscribe_during_notify() {
        let handlers = EventHandlers::<()>::new();
        let inner = handlers.clone();
        handlers.subscribe(move |_| {
            inner.subscribe(|_| {});
        });

        handlers.notify(&());
        assert_eq!(handlers.len(), 2);
    }
}
