//! In-Flight Registry Module
//!
//! Tracks which keys have a fetch running. Each entry is a one-message
//! broadcast channel: the fetch sends its outcome once and every caller
//! subscribed before that receives it exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::error::{CacheError, Result};

type Resolver<T> = broadcast::Sender<Result<T>>;

// == Registry ==
#[derive(Debug)]
pub(crate) struct InflightRegistry<T> {
    flights: Mutex<HashMap<String, Resolver<T>>>,
}

/// Result of attaching to a key.
pub(crate) enum Attach<T> {
    /// A fetch was already running; wait for its outcome.
    Joined(Waiter<T>),
    /// No fetch was running; the caller must run one and resolve the flight.
    Leader(Flight<T>, Waiter<T>),
}

impl<T: Clone> InflightRegistry<T> {
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
        }
    }

    // == Attach ==
    /// Joins the running fetch for `key`, or registers a new one.
    ///
    /// Subscription happens under the registry lock, so a joined waiter can
    /// never miss an outcome sent after the entry is released.
    pub fn attach(self: &Arc<Self>, key: &str) -> Attach<T> {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(resolver) = flights.get(key) {
            return Attach::Joined(Waiter::new(key, resolver.subscribe()));
        }

        let (resolver, receiver) = broadcast::channel(1);
        flights.insert(key.to_string(), resolver.clone());

        let flight = Flight {
            key: key.to_string(),
            registry: Arc::clone(self),
            resolver,
            released: false,
        };
        Attach::Leader(flight, Waiter::new(key, receiver))
    }

}

impl<T> InflightRegistry<T> {
    pub fn is_in_flight(&self, key: &str) -> bool {
        let flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        flights.contains_key(key)
    }

    fn remove(&self, key: &str) {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        flights.remove(key);
    }
}

impl<T: Clone> Default for InflightRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

// == Flight ==
/// Ownership of a running fetch.
///
/// Dropping an unreleased flight clears the key and closes the channel, so
/// waiters of a fetch that panicked or was dropped get an error instead of
/// waiting forever.
pub(crate) struct Flight<T> {
    key: String,
    registry: Arc<InflightRegistry<T>>,
    resolver: Resolver<T>,
    released: bool,
}

impl<T> Flight<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Clears the in-flight entry and hands back the sender for the outcome.
    pub fn release(mut self) -> Outcome<T> {
        self.registry.remove(&self.key);
        self.released = true;
        Outcome {
            resolver: self.resolver.clone(),
        }
    }
}

impl<T> Drop for Flight<T> {
    fn drop(&mut self) {
        if !self.released {
            self.registry.remove(&self.key);
        }
    }
}

/// Sender half of a released flight.
pub(crate) struct Outcome<T> {
    resolver: Resolver<T>,
}

impl<T> Outcome<T> {
    /// Delivers `result` to every waiter. Returns how many received it.
    pub fn resolve(self, result: Result<T>) -> usize {
        self.resolver.send(result).unwrap_or(0)
    }
}

// == Waiter ==
pub(crate) struct Waiter<T> {
    key: String,
    receiver: broadcast::Receiver<Result<T>>,
}

impl<T: Clone> Waiter<T> {
    fn new(key: &str, receiver: broadcast::Receiver<Result<T>>) -> Self {
        Self {
            key: key.to_string(),
            receiver,
        }
    }

    /// Waits for the flight's outcome.
    pub async fn wait(mut self) -> Result<T> {
        match self.receiver.recv().await {
            Ok(result) => result,
            Err(_) => Err(CacheError::FetchAbandoned(self.key)),
        }
    }
}
