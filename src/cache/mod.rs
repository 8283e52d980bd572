//! Cache Module
//!
//! Tiered read-through caching: a hot in-process map in front of an optional
//! durable store, with deduplicated fetches and background revalidation.

mod engine;
mod envelope;
mod events;
mod inflight;
mod stats;
mod strategy;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use engine::{Cache, Lookup, Source};
pub use envelope::{current_timestamp_ms, Envelope};
pub use events::LoadEvent;
pub use stats::CacheStats;
pub use strategy::{BoxFuture, Strategy, Update};
