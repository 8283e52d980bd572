//! Directory-backed durable store.
//!
//! Each key is one file named by the SHA-256 digest of the key, so filenames
//! stay a fixed length whatever the key. The first line of the file is the
//! key as a JSON string and the rest is the stored value. Writes go to a
//! uniquely named temporary file and are renamed into place; the rename can
//! be lost when several processes race on one directory, so this backend asks
//! for write verification.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use tracing::warn;

use super::{DurableStore, StoreError};

const ENTRY_SUFFIX: &str = ".entry";
const TMP_SUFFIX: &str = ".tmp";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

// == File Store ==
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    /// Maximum total bytes of stored values, None = unlimited
    quota: Option<usize>,
}

impl FileStore {
    // == Constructor ==
    /// Opens (creating if needed) a store rooted at `dir`.
    ///
    /// Fails when the directory cannot be created or is not writable, which
    /// is how backend selection detects that this store is unavailable.
    pub fn open(dir: impl AsRef<Path>, quota: Option<usize>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        if fs::metadata(&dir)?.permissions().readonly() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is read-only", dir.display()),
            ));
        }
        Ok(Self { dir, quota })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(entry_name(key))
    }

    /// Stored entry files, skipping temporaries and anything foreign.
    fn entry_paths(&self) -> io::Result<Vec<PathBuf>> {
        Ok(fs::read_dir(&self.dir)?
            .flatten()
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.ends_with(ENTRY_SUFFIX))
            })
            .map(|entry| entry.path())
            .collect())
    }

    /// Bytes held by every stored value except `key`'s.
    fn used_bytes_excluding(&self, key: &str) -> u64 {
        let skip = self.path_for(key);
        let Ok(paths) = self.entry_paths() else {
            return 0;
        };
        paths
            .iter()
            .filter(|path| **path != skip)
            .filter_map(|path| {
                let len = fs::metadata(path).ok()?.len();
                let (_, header_len) = read_header(path)?;
                Some(len.saturating_sub(header_len))
            })
            .sum()
    }
}

impl DurableStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn keys(&self) -> Vec<String> {
        match self.entry_paths() {
            Ok(paths) => paths
                .iter()
                .filter_map(|path| read_header(path).map(|(key, _)| key))
                .collect(),
            Err(e) => {
                warn!("Failed to list {}: {}", self.dir.display(), e);
                Vec::new()
            }
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        let contents = fs::read_to_string(self.path_for(key)).ok()?;
        let (header, value) = contents.split_once('\n')?;
        let stored: String = serde_json::from_str(header).ok()?;
        (stored == key).then(|| value.to_string())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::Io("empty key".to_string()));
        }

        if let Some(quota) = self.quota {
            if self.used_bytes_excluding(key) + value.len() as u64 > quota as u64 {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    quota,
                });
            }
        }

        let header = serde_json::to_string(key).map_err(|e| StoreError::Io(e.to_string()))?;
        let path = self.path_for(key);
        let tmp = self.dir.join(tmp_name(key));
        fs::write(&tmp, format!("{}\n{}", header, value))
            .map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::Io(e.to_string())
        })
    }

    fn remove(&self, key: &str) {
        if let Err(e) = fs::remove_file(self.path_for(key)) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", key, e);
            }
        }
    }

    fn verifies_writes(&self) -> bool {
        true
    }
}

// == Entry Naming ==
fn digest(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn entry_name(key: &str) -> String {
    format!("{}{}", digest(key), ENTRY_SUFFIX)
}

/// Unique per write, so concurrent writers of one key never share a file.
fn tmp_name(key: &str) -> String {
    format!(
        "{}.{}.{}{}",
        digest(key),
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed),
        TMP_SUFFIX
    )
}

/// Key stored in an entry file and the byte length of its header line.
fn read_header(path: &Path) -> Option<(String, u64)> {
    let mut line = String::new();
    let read = BufReader::new(File::open(path).ok()?).read_line(&mut line).ok()?;
    if !line.ends_with('\n') {
        return None;
    }
    let key = serde_json::from_str(line.trim_end_matches('\n')).ok()?;
    Some((key, read as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn temp_store(name: &str, quota: Option<usize>) -> FileStore {
        let dir = std::env::temp_dir().join(format!(
            "tiered_cache_file_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        FileStore::open(&dir, quota).unwrap()
    }

    #[test]
    fn test_entry_names_are_fixed_length() {
        let short = entry_name("a");
        let long = entry_name(&"p".repeat(4096));
        assert_eq!(short.len(), long.len());
        assert!(short.ends_with(ENTRY_SUFFIX));
        assert_ne!(tmp_name("a"), tmp_name("a"));
    }

    #[test]
    fn test_file_set_get_keys_remove() {
        let store = temp_store("basic", None);

        store.set("app_post-1", r#"{"timestamp":1,"data":"x"}"#).unwrap();
        assert_eq!(
            store.get("app_post-1"),
            Some(r#"{"timestamp":1,"data":"x"}"#.to_string())
        );
        assert_eq!(store.keys(), vec!["app_post-1".to_string()]);

        store.remove("app_post-1");
        assert!(store.get("app_post-1").is_none());
        assert!(store.keys().is_empty());

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_long_and_multiline_keys() {
        let store = temp_store("long", None);
        let long = format!("myCachePrefix_{}", "p".repeat(256));
        let odd = "app_posts/1?draft=true\nsecond line";

        store.set(&long, "long value").unwrap();
        store.set(odd, "multi\nline\nvalue").unwrap();

        assert_eq!(store.get(&long), Some("long value".to_string()));
        assert_eq!(store.get(odd), Some("multi\nline\nvalue".to_string()));

        let mut keys = store.keys();
        keys.sort();
        let mut expected = vec![long.clone(), odd.to_string()];
        expected.sort();
        assert_eq!(keys, expected);

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_survives_reopen() {
        let store = temp_store("reopen", None);
        store.set("persisted", "value").unwrap();

        let reopened = FileStore::open(store.dir(), None).unwrap();
        assert_eq!(reopened.get("persisted"), Some("value".to_string()));

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_quota_exceeded() {
        let store = temp_store("quota", Some(8));
        store.set("a", "12345").unwrap();

        let result = store.set("b", "12345");
        assert!(matches!(result, Err(StoreError::QuotaExceeded { quota: 8, .. })));

        // Replacing an existing value only counts the new size
        store.set("a", "1234567").unwrap();

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_concurrent_writes_to_one_key() {
        let store = Arc::new(temp_store("race", None));
        let values: Vec<String> = (0..8).map(|i| format!("{}", i).repeat(4096)).collect();

        let handles: Vec<_> = values
            .iter()
            .cloned()
            .map(|value| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..16 {
                        store.set("shared", &value).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stored = store.get("shared").unwrap();
        assert!(values.contains(&stored));
        assert_eq!(store.keys(), vec!["shared".to_string()]);
        let leftovers = fs::read_dir(store.dir())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(TMP_SUFFIX))
            .count();
        assert_eq!(leftovers, 0);

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_verifies_writes() {
        let store = temp_store("verify", None);
        assert!(store.verifies_writes());
        let _ = fs::remove_dir_all(store.dir());
    }
}
