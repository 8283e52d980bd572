//! Tiered Cache - A read-through cache with stale-while-revalidate
//!
//! Serves values from an in-process hot cache or a durable key/value store,
//! refreshes them from the origin in the background, and runs at most one
//! origin fetch per key at a time.

pub mod api;
pub mod cache;
pub mod config;
pub mod durable;
pub mod error;
pub mod models;
pub mod origin;

pub use api::AppState;
pub use cache::{Cache, LoadEvent, Lookup, Source, Strategy, Update};
pub use config::{CacheOptions, Config};
pub use durable::{DurableStore, FileStore, MemoryStore, StoreError};
pub use error::CacheError;
pub use origin::Origin;
