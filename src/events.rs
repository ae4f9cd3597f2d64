//! Listener registration for callbacks published by the fetch layer.
//!
//! A component owns a [`Listeners`] registry; callers register a handler,
//! receive one callback per published event and deregister with the returned
//! [`Subscription`] on teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Token returned by [`Listeners::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

pub struct Listeners<E> {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<u64, Handler<E>>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            handlers: Mutex::new(HashMap::new()),
        }
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.insert(id, Arc::new(handler));
        Subscription(id)
    }

    /// Returns `false` if the subscription was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.remove(&subscription.0).is_some()
    }

    pub fn len(&self) -> usize {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every registered handler.
    ///
    /// Handlers run outside the registry lock, so a handler may subscribe or
    /// unsubscribe without deadlocking.
    pub fn publish(&self, event: &E) {
        let handlers: Vec<Handler<E>> = {
            let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
            handlers.values().cloned().collect()
        };

        for handler in handlers {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_publish_reaches_every_listener() {
        let listeners = Listeners::<u32>::new();
        let total = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let total = total.clone();
            listeners.subscribe(move |n| {
                total.fetch_add(*n as usize, Ordering::SeqCst);
            });
        }

        listeners.publish(&2);
        assert_eq!(total.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let listeners = Listeners::<&'static str>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let subscription = listeners.subscribe(move |s| sink.lock().unwrap().push(*s));

        listeners.publish(&"first");
        assert!(listeners.unsubscribe(subscription));
        assert!(!listeners.unsubscribe(subscription));
        listeners.publish(&"second");

        assert_eq!(*seen.lock().unwrap(), vec!["first"]);
        assert!(listeners.is_empty());
    }
}
