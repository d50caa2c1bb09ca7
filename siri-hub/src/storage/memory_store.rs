/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Single-node store: sharded maps with per-entry deadlines.

use crate::observability::events;
use crate::storage::keyed_ttl_store::{Compute, ExpiryMaintenance, KeyedTtlStore, StoreProvider};
use fxhash::FxHasher;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

const COMPONENT: &str = "memory_store";
const DEFAULT_SHARD_COUNT: usize = 16;
// Deadline used when `now + ttl` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

struct Slot<V> {
    value: V,
    deadline: Instant,
}

impl<V> Slot<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline > now
    }
}

fn deadline_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl).unwrap_or(now + FAR_FUTURE)
}

/// In-process [`KeyedTtlStore`].
///
/// Expired entries are invisible to every read and are physically dropped either when
/// touched or by [`ExpiryMaintenance::purge_expired`].
pub struct InMemoryTtlStore<K, V> {
    name: String,
    shards: Vec<Mutex<HashMap<K, Slot<V>>>>,
}

impl<K, V> InMemoryTtlStore<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(name: &str) -> Self {
        Self::with_shards(name, DEFAULT_SHARD_COUNT)
    }

    pub fn with_shards(name: &str, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            name: name.to_string(),
            shards: (0..shard_count).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard_for(&self, key: &K) -> &Mutex<HashMap<K, Slot<V>>> {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        &self.shards[index]
    }
}

impl<K, V> KeyedTtlStore<K, V> for InMemoryTtlStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut shard = self.shard_for(key).lock();
        match shard.get(key) {
            Some(slot) if slot.is_live(now) => Some(slot.value.clone()),
            Some(_) => {
                shard.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: K, value: V, ttl: Duration) {
        let mut shard = self.shard_for(&key).lock();
        if ttl.is_zero() {
            shard.remove(&key);
            return;
        }
        let deadline = deadline_after(Instant::now(), ttl);
        shard.insert(key, Slot { value, deadline });
    }

    fn delete(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.shard_for(key)
            .lock()
            .remove(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value)
    }

    fn contains_key(&self, key: &K) -> bool {
        let now = Instant::now();
        self.shard_for(key)
            .lock()
            .get(key)
            .is_some_and(|slot| slot.is_live(now))
    }

    fn size(&self) -> usize {
        let now = Instant::now();
        self.shards
            .iter()
            .map(|shard| shard.lock().values().filter(|slot| slot.is_live(now)).count())
            .sum()
    }

    fn keys_matching(&self, predicate: &dyn Fn(&K) -> bool) -> HashSet<K> {
        let now = Instant::now();
        let mut keys = HashSet::new();
        for shard in &self.shards {
            let shard = shard.lock();
            keys.extend(
                shard
                    .iter()
                    .filter(|(key, slot)| slot.is_live(now) && predicate(key))
                    .map(|(key, _)| key.clone()),
            );
        }
        keys
    }

    fn get_all(&self, keys: &HashSet<K>) -> HashMap<K, V> {
        keys.iter()
            .filter_map(|key| self.get(key).map(|value| (key.clone(), value)))
            .collect()
    }

    fn compute(&self, key: &K, remap: &mut dyn FnMut(Option<&V>) -> Compute<V>) {
        let now = Instant::now();
        let mut shard = self.shard_for(key).lock();
        let committed = shard
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| &slot.value);

        match remap(committed) {
            Compute::Keep => {}
            Compute::Put { value, ttl } if !ttl.is_zero() => {
                shard.insert(
                    key.clone(),
                    Slot {
                        value,
                        deadline: deadline_after(now, ttl),
                    },
                );
            }
            Compute::Put { .. } | Compute::Delete => {
                shard.remove(key);
            }
        }
    }
}

impl<K, V> ExpiryMaintenance for InMemoryTtlStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        for shard in &self.shards {
            let mut shard = shard.lock();
            let before = shard.len();
            shard.retain(|_, slot| slot.is_live(now));
            purged += before - shard.len();
        }
        if purged > 0 {
            trace!(
                event = events::STORE_PURGE,
                component = COMPONENT,
                store = self.name.as_str(),
                purged,
                "purged expired entries"
            );
        }
        purged
    }
}

/// Hands out [`InMemoryTtlStore`]s and remembers them for the purge sweep.
#[derive(Default)]
pub struct InMemoryStoreProvider {
    created: Mutex<Vec<Arc<dyn ExpiryMaintenance>>>,
}

impl InMemoryStoreProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreProvider for InMemoryStoreProvider {
    fn create<K, V>(&self, name: &str) -> Arc<dyn KeyedTtlStore<K, V>>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let store = Arc::new(InMemoryTtlStore::<K, V>::new(name));
        self.created.lock().push(store.clone());
        store
    }

    fn purge_expired(&self) -> usize {
        let created = self.created.lock().clone();
        created.iter().map(|store| store.purge_expired()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryStoreProvider, InMemoryTtlStore};
    use crate::storage::keyed_ttl_store::{Compute, ExpiryMaintenance, KeyedTtlStore, StoreProvider};
    use std::collections::HashSet;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn entries_disappear_after_their_ttl() {
        let store = InMemoryTtlStore::<String, u32>::new("ttl");
        store.put("a".to_string(), 1, Duration::from_millis(200));

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(store.get(&"a".to_string()), Some(1));
        assert_eq!(store.size(), 1);

        tokio::time::advance(Duration::from_millis(101)).await;
        assert_eq!(store.get(&"a".to_string()), None);
        assert!(!store.contains_key(&"a".to_string()));
        assert_eq!(store.size(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_expired_slots_only() {
        let store = InMemoryTtlStore::<u32, u32>::with_shards("purge", 2);
        store.put(1, 1, Duration::from_secs(1));
        store.put(2, 2, Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.keys_matching(&|_| true), HashSet::from([2]));
    }

    #[test]
    fn compute_observes_committed_value_and_applies_decision() {
        let store = InMemoryTtlStore::<u32, u32>::new("compute");
        store.put(7, 1, Duration::from_secs(60));

        let mut seen = None;
        store.compute(&7, &mut |existing| {
            seen = existing.copied();
            Compute::Put {
                value: existing.copied().unwrap_or_default() + 1,
                ttl: Duration::from_secs(60),
            }
        });
        assert_eq!(seen, Some(1));
        assert_eq!(store.get(&7), Some(2));

        store.compute(&7, &mut |_| Compute::Delete);
        assert_eq!(store.get(&7), None);

        store.compute(&8, &mut |existing| {
            assert!(existing.is_none());
            Compute::Keep
        });
        assert!(!store.contains_key(&8));
    }

    #[test]
    fn zero_ttl_put_removes_the_entry() {
        let store = InMemoryTtlStore::<u32, u32>::new("zero");
        store.put(1, 1, Duration::from_secs(5));
        store.put(1, 2, Duration::ZERO);

        assert_eq!(store.get(&1), None);
    }

    #[test]
    fn get_all_returns_only_present_keys() {
        let store = InMemoryTtlStore::<u32, &'static str>::new("get-all");
        store.put(1, "one", Duration::from_secs(5));
        store.put(2, "two", Duration::from_secs(5));

        let found = store.get_all(&HashSet::from([1, 3]));

        assert_eq!(found.len(), 1);
        assert_eq!(found.get(&1), Some(&"one"));
    }

    #[tokio::test(start_paused = true)]
    async fn provider_purges_every_created_store() {
        let provider = InMemoryStoreProvider::new();
        let first = provider.create::<u32, u32>("first");
        let second = provider.create::<String, u32>("second");
        first.put(1, 1, Duration::from_secs(1));
        second.put("x".to_string(), 1, Duration::from_secs(1));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(provider.purge_expired(), 2);
    }
}
