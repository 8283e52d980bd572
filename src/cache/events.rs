//! Event Bus Module
//!
//! Fans out `load` notifications whenever a fetch stores fresh data.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

// == Load Event ==
/// Published after a fetch for `id` validated and saved `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadEvent<T> {
    /// The namespaced cache key
    pub id: String,
    pub data: T,
}

type Listener<T> = Arc<dyn Fn(&LoadEvent<T>) + Send + Sync>;

// == Event Bus ==
/// Synchronous listeners plus an async broadcast channel.
pub(crate) struct EventBus<T> {
    listeners: RwLock<Vec<Listener<T>>>,
    sender: broadcast::Sender<LoadEvent<T>>,
}

impl<T: Clone> EventBus<T> {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            listeners: RwLock::new(Vec::new()),
            sender,
        }
    }

    /// Registers a listener called inline on every publish.
    pub fn on(&self, listener: impl Fn(&LoadEvent<T>) + Send + Sync + 'static) {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        listeners.push(Arc::new(listener));
    }

    /// Returns a receiver for events published from now on.
    ///
    /// A receiver that falls more than the channel capacity behind observes
    /// `RecvError::Lagged` and skips ahead.
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent<T>> {
        self.sender.subscribe()
    }

    // == Publish ==
    pub fn publish(&self, event: LoadEvent<T>) {
        // Snapshot so listeners may register more listeners
        let listeners: Vec<Listener<T>> = {
            let guard = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
            guard.clone()
        };
        for listener in &listeners {
            listener(&event);
        }

        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
