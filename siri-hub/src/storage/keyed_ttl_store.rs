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

//! Keyed store contract every piece of hub state is written against.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// Decision returned by a [`KeyedTtlStore::compute`] remapping function.
#[derive(Debug)]
pub enum Compute<V> {
    /// Leave the committed entry (or its absence) untouched.
    Keep,
    /// Replace the entry and restart its time-to-live.
    Put { value: V, ttl: Duration },
    /// Remove the entry.
    Delete,
}

/// Keyed map with per-entry time-to-live.
///
/// Implementations may be a local map or a distributed cache. Eviction of expired
/// entries is owned by the implementation: an expired entry must never be returned
/// from any read. Across nodes the store is only expected to be eventually consistent.
pub trait KeyedTtlStore<K, V>: Send + Sync
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn get(&self, key: &K) -> Option<V>;

    fn put(&self, key: K, value: V, ttl: Duration);

    fn delete(&self, key: &K) -> Option<V>;

    fn contains_key(&self, key: &K) -> bool;

    fn size(&self) -> usize;

    fn keys_matching(&self, predicate: &dyn Fn(&K) -> bool) -> HashSet<K>;

    fn get_all(&self, keys: &HashSet<K>) -> HashMap<K, V>;

    /// Conditionally updates one entry.
    ///
    /// `remap` observes the committed value and its decision is applied before any
    /// other writer can touch the same key, so compare-then-write sequences built on
    /// top of it are atomic per key.
    fn compute(&self, key: &K, remap: &mut dyn FnMut(Option<&V>) -> Compute<V>);
}

/// Backends that evict lazily expose their sweep so the hub can schedule it.
pub trait ExpiryMaintenance: Send + Sync {
    /// Drops every expired entry, returning how many were removed.
    fn purge_expired(&self) -> usize;
}

/// Factory for the stores backing one hub instance.
pub trait StoreProvider {
    fn create<K, V>(&self, name: &str) -> Arc<dyn KeyedTtlStore<K, V>>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static;

    /// Sweeps every store created so far; backends with native eviction return zero.
    fn purge_expired(&self) -> usize {
        0
    }
}
