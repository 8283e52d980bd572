//! Cache Engine Module
//!
//! Read-through cache over a hot in-process map and an optional durable
//! store, with background revalidation and one fetch per key at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::cache::events::{EventBus, LoadEvent};
use crate::cache::inflight::{Attach, Flight, InflightRegistry};
use crate::cache::strategy::{Failure, Fetcher, Strategy, Validator};
use crate::cache::{CacheStats, Envelope};
use crate::config::CacheOptions;
use crate::durable::{DurableStore, StoreError};
use crate::error::{CacheError, Result};

// == Lookup ==
/// Tier a `get` was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Memory,
    Durable,
    Origin,
}

/// A value returned by `get`, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<T> {
    pub value: T,
    pub source: Source,
}

// == Cache ==
/// Tiered read-through cache engine.
///
/// Cloning is cheap and every clone shares the same tiers. The hot cache,
/// in-flight registry and event bus belong to this engine alone; the durable
/// store may be shared with other engines using different prefixes.
pub struct Cache<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    options: CacheOptions,
    hot: RwLock<HashMap<String, T>>,
    store: Option<Arc<dyn DurableStore>>,
    inflight: Arc<InflightRegistry<T>>,
    events: EventBus<T>,
    stats: Mutex<CacheStats>,
}

impl<T> Clone for Cache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Cache<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an engine over `store`; `None` runs memory-only.
    pub fn new(options: CacheOptions, store: Option<Arc<dyn DurableStore>>) -> Self {
        info!(
            "Cache engine initialized: prefix={}, backend={}",
            options.prefix,
            store.as_ref().map_or("none", |s| s.backend())
        );
        Self {
            inner: Arc::new(Inner {
                options,
                hot: RwLock::new(HashMap::new()),
                store,
                inflight: Arc::new(InflightRegistry::new()),
                events: EventBus::new(),
                stats: Mutex::new(CacheStats::new()),
            }),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.inner.options.prefix
    }

    /// Namespaced key for `id`.
    pub fn key(&self, id: &str) -> String {
        format!("{}{}", self.inner.options.prefix, id)
    }

    pub fn has_durable_store(&self) -> bool {
        self.inner.store.is_some()
    }

    /// Whether a fetch for `id` is currently running.
    pub fn is_fetching(&self, id: &str) -> bool {
        self.inner.inflight.is_in_flight(&self.key(id))
    }

    // == Events ==
    /// Registers a listener called after every successful fetch.
    pub fn on(&self, listener: impl Fn(&LoadEvent<T>) + Send + Sync + 'static) {
        self.inner.events.on(listener);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent<T>> {
        self.inner.events.subscribe()
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let hot_entries = self.inner.hot.read().await.len();
        let mut stats = self.stats_guard().clone();
        stats.set_hot_entries(hot_entries);
        stats
    }

    // == Get ==
    /// Returns the freshest value available without waiting on the origin
    /// when either tier has one.
    ///
    /// A hot cache hit is final. A durable hit is returned at once and, when
    /// the strategy's update policy says so, refreshed by a background fetch
    /// whose result arrives as a `load` event. Only a miss in both tiers
    /// waits for the strategy's fetch.
    pub async fn get(&self, strategy: Strategy<T>) -> Result<Lookup<T>> {
        let key = self.key(&strategy.id);

        let hot = self.inner.hot.read().await.get(&key).cloned();
        if let Some(value) = hot {
            self.trace("memory hit", &key);
            self.stats_guard().record_memory_hit();
            return Ok(Lookup {
                value,
                source: Source::Memory,
            });
        }

        if let Some(envelope) = self.read_envelope(&key) {
            self.trace("storage hit", &key);
            self.stats_guard().record_durable_hit();
            self.revalidate(key, strategy);
            return Ok(Lookup {
                value: envelope.data,
                source: Source::Durable,
            });
        }

        self.stats_guard().record_miss();
        let value = self.fetch_keyed(key, strategy).await?;
        Ok(Lookup {
            value,
            source: Source::Origin,
        })
    }

    // == Fetch ==
    /// Fetches from the origin, bypassing both tiers for the read.
    ///
    /// Joins the running fetch for the same key instead of starting another.
    pub async fn fetch(&self, strategy: Strategy<T>) -> Result<T> {
        let key = self.key(&strategy.id);
        self.fetch_keyed(key, strategy).await
    }

    // == Save ==
    /// Stores `data` in the hot cache and, best effort, the durable store.
    pub async fn save(&self, id: &str, data: T) {
        let key = self.key(id);
        self.save_keyed(&key, data).await;
    }

    // == Clear ==
    /// Removes every durable key under this engine's prefix and returns how
    /// many were removed. The hot cache is left as is.
    pub fn clear(&self) -> usize {
        let Some(store) = &self.inner.store else {
            return 0;
        };

        let prefix = self.prefix();
        let keys: Vec<String> = store
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect();
        for key in &keys {
            store.remove(key);
        }

        self.trace("clear", prefix);
        keys.len()
    }

    // == Timestamp ==
    /// Write time of the durable entry for `id` in Unix milliseconds, or 0.
    pub fn timestamp(&self, id: &str) -> i64 {
        self.read_envelope(&self.key(id))
            .map_or(0, |envelope| envelope.timestamp)
    }

    // == Internals ==
    fn read_envelope(&self, key: &str) -> Option<Envelope<T>> {
        let raw = self.inner.store.as_ref()?.get(key)?;
        Envelope::decode(&raw)
    }

    fn revalidate(&self, key: String, mut strategy: Strategy<T>) {
        if !strategy.update.is_due() {
            return;
        }

        self.stats_guard().record_revalidation();
        let ready = strategy.update_after.take();
        let cache = self.clone();
        tokio::spawn(async move {
            match ready {
                Some(ready) => {
                    ready().await;
                    cache.trace("revalidate after delay", &key);
                }
                None => cache.trace("revalidate now", &key),
            }
            // Failures reach the strategy's error hook inside fetch_keyed
            let _ = cache.fetch_keyed(key, strategy).await;
        });
    }

    async fn fetch_keyed(&self, key: String, strategy: Strategy<T>) -> Result<T> {
        let waiter = match self.inner.inflight.attach(&key) {
            Attach::Joined(waiter) => {
                self.trace("queued behind fetch", &key);
                self.stats_guard().record_join();
                waiter
            }
            Attach::Leader(flight, waiter) => {
                self.trace("fetch", &key);
                self.stats_guard().record_fetch();
                let cache = self.clone();
                let fetch = Arc::clone(&strategy.fetch);
                let validate = Arc::clone(&strategy.validate);
                tokio::spawn(async move { cache.run_flight(flight, fetch, validate).await });
                waiter
            }
        };

        let result = waiter.wait().await;
        if let Err(err) = &result {
            (strategy.on_error)(err);
        }
        result
    }

    /// Runs one fetch to completion: parse, validate, save, clear the
    /// in-flight entry, publish `load`, then resolve every waiter.
    async fn run_flight(self, flight: Flight<T>, fetch: Fetcher<T>, validate: Validator<T>) {
        let key = flight.key().to_string();

        let result = match fetch().await {
            Ok(data) if validate(&data) => Ok(data),
            Ok(_) => Err(CacheError::DataInvalid(key.clone())),
            Err(Failure::Fetch(cause)) => Err(CacheError::Fetch {
                key: key.clone(),
                cause: Arc::new(cause),
            }),
            Err(Failure::Parse(cause)) => Err(CacheError::Parse {
                key: key.clone(),
                cause: Arc::new(cause),
            }),
        };

        match &result {
            Ok(data) => self.save_keyed(&key, data.clone()).await,
            Err(err) => {
                self.trace("fetch failed", &key);
                debug!("Fetch for {} failed: {}", key, err);
                self.stats_guard().record_fetch_error();
            }
        }

        let outcome = flight.release();
        if let Ok(data) = &result {
            self.inner.events.publish(LoadEvent {
                id: key.clone(),
                data: data.clone(),
            });
        }
        outcome.resolve(result);
    }

    async fn save_keyed(&self, key: &str, data: T) {
        self.trace("save", key);
        let encoded = Envelope::new(&data).encode();

        {
            let mut hot = self.inner.hot.write().await;
            hot.insert(key.to_string(), data);
        }

        let Some(store) = &self.inner.store else {
            return;
        };
        match encoded {
            Ok(encoded) => self.persist(store.as_ref(), key, &encoded),
            Err(e) => {
                warn!("Failed to encode entry {}: {}", key, e);
                self.stats_guard().record_dropped_write();
            }
        }
    }

    /// Writes to the durable store, clearing this prefix and retrying once
    /// when the store is full or the write did not land.
    fn persist(&self, store: &dyn DurableStore, key: &str, encoded: &str) {
        match store.set(key, encoded) {
            Ok(()) => {}
            Err(StoreError::QuotaExceeded { .. }) => {
                warn!("Durable store full writing {}, clearing prefix {}", key, self.prefix());
                self.clear_and_retry(store, key, encoded);
                return;
            }
            Err(e) => {
                warn!("Durable write for {} failed: {}", key, e);
                self.stats_guard().record_dropped_write();
                return;
            }
        }

        if store.verifies_writes() && store.get(key).is_none() {
            warn!("Durable write for {} did not land, clearing prefix {}", key, self.prefix());
            self.clear_and_retry(store, key, encoded);
        }
    }

    fn clear_and_retry(&self, store: &dyn DurableStore, key: &str, encoded: &str) {
        self.stats_guard().record_quota_clear();
        self.clear();

        let landed = match store.set(key, encoded) {
            Ok(()) => !store.verifies_writes() || store.get(key).is_some(),
            Err(e) => {
                warn!("Retried durable write for {} failed: {}", key, e);
                false
            }
        };
        if !landed {
            self.stats_guard().record_dropped_write();
        }
    }

    fn trace(&self, event: &str, key: &str) {
        if self.inner.options.debug {
            debug!("{}: {}", event, key);
        }
    }

    fn stats_guard(&self) -> std::sync::MutexGuard<'_, CacheStats> {
        self.inner.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
