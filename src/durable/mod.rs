//! Durable Store Module
//!
//! Uniform interface over persistent key/value backends, plus the
//! construction-time backend selection.

mod file;
mod memory;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

pub use file::FileStore;
pub use memory::MemoryStore;

// == Store Error ==
/// Failures a backend can report from `set`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend's storage limit was reached
    #[error("QUOTA_EXCEEDED: writing {key} would exceed {quota} bytes")]
    QuotaExceeded { key: String, quota: usize },

    /// Any other backend failure
    #[error("storage I/O error: {0}")]
    Io(String),
}

// == Durable Store Trait ==
/// A persistent string key/value backend with enumerable keys.
///
/// One backend instance may be shared by several cache engines; they are
/// partitioned only by their key prefixes.
pub trait DurableStore: Send + Sync {
    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    /// All keys currently held by the backend, across every prefix.
    fn keys(&self) -> Vec<String>;

    fn get(&self, key: &str) -> Option<String>;

    /// Fails with [`StoreError::QuotaExceeded`] when the backend is full.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing an absent key is a no-op.
    fn remove(&self, key: &str);

    /// Whether writes must be read back to confirm they landed.
    fn verifies_writes(&self) -> bool {
        false
    }
}

// == Backend Selection ==
/// Picks the first available backend from `candidates`, in order.
///
/// Returns `None` when no candidate is available; the cache then runs
/// memory-only without reporting an error.
pub fn select<I>(candidates: I) -> Option<Arc<dyn DurableStore>>
where
    I: IntoIterator<Item = Option<Arc<dyn DurableStore>>>,
{
    match candidates.into_iter().flatten().next() {
        Some(store) => {
            info!("Durable store selected: backend={}", store.backend());
            Some(store)
        }
        None => {
            info!("No durable store available, running memory-only");
            None
        }
    }
}
