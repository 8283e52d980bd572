//! Configuration Module
//!
//! Cache engine options and the server configuration loaded from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::durable::{self, DurableStore, FileStore, MemoryStore};

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "myCachePrefix_";

// == Cache Options ==
/// Options recognized by [`crate::cache::Cache::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Namespace prepended to every id before it touches either tier
    pub prefix: String,
    /// Emit a debug line for every tier hit, fetch and save
    pub debug: bool,
}

impl CacheOptions {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            debug: false,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key prefix for the served cache
    pub prefix: String,
    /// Per-operation debug logging in the cache engine
    pub debug: bool,
    /// HTTP server port
    pub server_port: u16,
    /// Origin that cache misses are fetched from
    pub upstream_url: String,
    /// Directory for the file backend, None = file backend unavailable
    pub storage_dir: Option<PathBuf>,
    /// Byte quota applied to the selected durable backend
    pub storage_quota: Option<usize>,
    /// Whether the shared in-process backend may be used as a fallback
    pub memory_store: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PREFIX` - Key prefix (default: myCachePrefix_)
    /// - `CACHE_DEBUG` - Per-operation debug logging (default: false)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_URL` - Origin base URL (default: http://127.0.0.1:8080)
    /// - `STORAGE_DIR` - File backend directory (default: unset)
    /// - `STORAGE_QUOTA_BYTES` - Durable store quota (default: unlimited)
    /// - `MEMORY_STORE` - Allow the in-process backend (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            prefix: env::var("CACHE_PREFIX").unwrap_or(defaults.prefix),
            debug: env::var("CACHE_DEBUG")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.debug),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            upstream_url: env::var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            storage_dir: env::var("STORAGE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            storage_quota: env::var("STORAGE_QUOTA_BYTES")
                .ok()
                .and_then(|v| v.parse().ok()),
            memory_store: env::var("MEMORY_STORE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.memory_store),
        }
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            prefix: self.prefix.clone(),
            debug: self.debug,
        }
    }

    // == Backend Selection ==
    /// Tries the file backend, then the memory backend.
    pub fn durable_store(&self) -> Option<Arc<dyn DurableStore>> {
        let file = self.storage_dir.as_ref().and_then(|dir| {
            match FileStore::open(dir, self.storage_quota) {
                Ok(store) => Some(Arc::new(store) as Arc<dyn DurableStore>),
                Err(e) => {
                    warn!("File store at {} unavailable: {}", dir.display(), e);
                    None
                }
            }
        });

        let memory = self.memory_store.then(|| {
            let store = match self.storage_quota {
                Some(quota) => MemoryStore::with_quota(quota),
                None => MemoryStore::new(),
            };
            Arc::new(store) as Arc<dyn DurableStore>
        });

        durable::select([file, memory])
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            debug: false,
            server_port: 3000,
            upstream_url: "http://127.0.0.1:8080".to_string(),
            storage_dir: None,
            storage_quota: None,
            memory_store: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_options_default() {
        let options = CacheOptions::default();
        assert_eq!(options.prefix, "myCachePrefix_");
        assert!(!options.debug);
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.prefix, DEFAULT_PREFIX);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.upstream_url, "http://127.0.0.1:8080");
        assert!(config.storage_dir.is_none());
        assert!(config.memory_store);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for var in [
            "CACHE_PREFIX",
            "CACHE_DEBUG",
            "SERVER_PORT",
            "UPSTREAM_URL",
            "STORAGE_DIR",
            "STORAGE_QUOTA_BYTES",
            "MEMORY_STORE",
        ] {
            env::remove_var(var);
        }

        let config = Config::from_env();
        assert_eq!(config.prefix, DEFAULT_PREFIX);
        assert!(!config.debug);
        assert_eq!(config.server_port, 3000);
        assert!(config.storage_quota.is_none());
        assert_eq!(config.cache_options(), CacheOptions::default());
    }

    #[test]
    fn test_durable_store_falls_back_to_memory() {
        let config = Config::default();
        let store = config.durable_store().unwrap();
        assert_eq!(store.backend(), "memory");
    }

    #[test]
    fn test_durable_store_prefers_file() {
        let dir = std::env::temp_dir().join(format!("tiered_cache_config_{}", std::process::id()));
        let config = Config {
            storage_dir: Some(dir.clone()),
            ..Config::default()
        };
        let store = config.durable_store().unwrap();
        assert_eq!(store.backend(), "file");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_durable_store_none_available() {
        let config = Config {
            memory_store: false,
            ..Config::default()
        };
        assert!(config.durable_store().is_none());
    }
}
