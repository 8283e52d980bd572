//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine's tier and namespacing properties.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cache::{current_timestamp_ms, Cache, Envelope, Source};
use crate::config::CacheOptions;
use crate::durable::{DurableStore, MemoryStore};

// == Test Configuration ==
const TEST_PREFIX: &str = "prop_";

// == Strategies ==
/// Generates resource ids
fn id_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,32}"
}

/// Generates cached values
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,128}"
}

fn new_cache(store: &MemoryStore) -> Cache<String> {
    Cache::new(
        CacheOptions::with_prefix(TEST_PREFIX),
        Some(Arc::new(store.clone())),
    )
}

fn counting(id: &str, value: &str, calls: &Arc<AtomicUsize>) -> crate::cache::Strategy<String> {
    let calls = Arc::clone(calls);
    let value = value.to_string();
    crate::cache::Strategy::new(id, move || {
        calls.fetch_add(1, Ordering::SeqCst);
        let value = value.clone();
        async move { Ok(value) }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Saving a value persists an envelope holding exactly that value, stamped
    // inside the call window, under the prefixed key.
    #[test]
    fn prop_save_roundtrip(id in id_strategy(), value in value_strategy()) {
        let store = MemoryStore::new();
        let cache = new_cache(&store);

        let before = current_timestamp_ms();
        tokio_test::block_on(cache.save(&id, value.clone()));
        let after = current_timestamp_ms();

        let raw = store.get(&format!("{}{}", TEST_PREFIX, id));
        prop_assert!(raw.is_some(), "Envelope should be stored under the prefixed key");
        let envelope: Envelope<String> = Envelope::decode(&raw.unwrap()).unwrap();
        prop_assert_eq!(envelope.data, value);
        prop_assert!(envelope.timestamp >= before && envelope.timestamp <= after);
        prop_assert_eq!(cache.timestamp(&id), envelope.timestamp);
    }

    // Clearing removes every prefixed key, leaves foreign keys alone, and a
    // second clear changes nothing.
    #[test]
    fn prop_clear_idempotent(
        ids in prop::collection::vec(id_strategy(), 0..20),
        foreign in prop::collection::vec(id_strategy(), 0..10)
    ) {
        let store = MemoryStore::new();
        let cache = new_cache(&store);

        for id in &ids {
            tokio_test::block_on(cache.save(id, "v".to_string()));
        }
        for id in &foreign {
            store.set(&format!("other_{}", id), "x").unwrap();
        }

        let unique: HashSet<&String> = ids.iter().collect();
        prop_assert_eq!(cache.clear(), unique.len());
        let after_first = store.keys();

        prop_assert_eq!(cache.clear(), 0);
        prop_assert_eq!(store.keys(), after_first.clone());

        prop_assert!(after_first.iter().all(|k| !k.starts_with(TEST_PREFIX)));
        let foreign_unique: HashSet<&String> = foreign.iter().collect();
        prop_assert_eq!(after_first.len(), foreign_unique.len());
    }

    // Whatever string sits in the durable store, a lookup never fails when the
    // fetch succeeds; unreadable entries count as misses.
    #[test]
    fn prop_garbage_envelope_is_miss(id in id_strategy(), garbage in "\\PC{0,64}") {
        let store = MemoryStore::new();
        let cache = new_cache(&store);
        let key = format!("{}{}", TEST_PREFIX, id);
        store.set(&key, &garbage).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let lookup = tokio_test::block_on(cache.get(counting(&id, "fresh", &calls).update(false)));
        prop_assert!(lookup.is_ok());
        let lookup = lookup.unwrap();

        match Envelope::<String>::decode(&garbage) {
            Some(envelope) => {
                prop_assert_eq!(lookup.source, Source::Durable);
                prop_assert_eq!(lookup.value, envelope.data);
                prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
            }
            None => {
                prop_assert_eq!(lookup.source, Source::Origin);
                prop_assert_eq!(lookup.value, "fresh");
                prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
            }
        }
    }

    // After a fetch, every later lookup is a hot hit and never fetches again.
    #[test]
    fn prop_fetched_value_served_from_memory(
        id in id_strategy(),
        value in value_strategy(),
        repeats in 1usize..5
    ) {
        let store = MemoryStore::new();
        let cache = new_cache(&store);
        let calls = Arc::new(AtomicUsize::new(0));

        tokio_test::block_on(async {
            cache.get(counting(&id, &value, &calls)).await.unwrap();
        });

        for _ in 0..repeats {
            let lookup = tokio_test::block_on(cache.get(counting(&id, "other", &calls))).unwrap();
            prop_assert_eq!(lookup.source, Source::Memory);
            prop_assert_eq!(&lookup.value, &value);
        }
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
