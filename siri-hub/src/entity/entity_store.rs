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

//! Generic entity store: one instance per SIRI kind, configured by an [`EntityProfile`].

use crate::entity::expiration::Expiration;
use crate::entity::profile::EntityProfile;
use crate::model::{EntityFilter, RecordKey};
use crate::observability::events;
use crate::storage::{Compute, KeyedTtlStore, StoreProvider};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "entity_store";

/// Stored form of one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope<T> {
    pub value: T,
    pub expires_at: DateTime<Utc>,
}

/// Per-batch counters reported by [`EntityStore::upsert_all`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct UpsertSummary {
    pub total: usize,
    pub added_or_updated: usize,
    pub unchanged: usize,
    pub expired: usize,
    pub outdated: usize,
    pub ignored: usize,
}

impl UpsertSummary {
    /// Items that left the store or were rejected by recency arbitration.
    pub fn expired_or_discarded(&self) -> usize {
        self.expired + self.outdated
    }
}

/// Outcome of one ingestion batch: counters plus the entities that actually changed.
#[derive(Clone, Debug)]
pub struct UpsertResult<T> {
    pub summary: UpsertSummary,
    pub changed: Vec<(RecordKey, T)>,
}

impl<T> UpsertResult<T> {
    pub fn changed_keys(&self) -> HashSet<RecordKey> {
        self.changed.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn into_changed_values(self) -> Vec<T> {
        self.changed.into_iter().map(|(_, value)| value).collect()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Outcome {
    Changed,
    Unchanged,
    Expired,
    Outdated,
    Dropped,
}

/// Keyed storage of one kind with checksum dedup, recency arbitration and TTL expiry.
pub struct EntityStore<P: EntityProfile> {
    profile: Arc<P>,
    records: Arc<dyn KeyedTtlStore<RecordKey, Envelope<P::Entity>>>,
    checksums: Arc<dyn KeyedTtlStore<RecordKey, u64>>,
}

impl<P: EntityProfile> EntityStore<P> {
    pub fn new<S: StoreProvider>(profile: Arc<P>, provider: &S) -> Self {
        let kind = profile.kind().as_str().to_ascii_lowercase();
        Self {
            records: provider.create(&format!("{kind}-records")),
            checksums: provider.create(&format!("{kind}-checksums")),
            profile,
        }
    }

    pub fn profile(&self) -> &Arc<P> {
        &self.profile
    }

    /// Ingests one batch for a dataset.
    ///
    /// Never fails: malformed items are counted as ignored and fingerprinting errors
    /// make the item count as changed. A key appearing twice in the batch is reported
    /// once in `changed`, with its last accepted value.
    pub fn upsert_all(&self, dataset_id: &str, items: Vec<P::Entity>) -> UpsertResult<P::Entity> {
        let now = Utc::now();
        let mut summary = UpsertSummary {
            total: items.len(),
            ..Default::default()
        };
        let mut changed: Vec<(RecordKey, P::Entity)> = Vec::new();
        let mut changed_index: HashMap<RecordKey, usize> = HashMap::new();

        for item in items {
            let Some(key) = self.profile.record_key(dataset_id, &item) else {
                summary.ignored += 1;
                continue;
            };

            match self.upsert_one(&key, &item, now) {
                Outcome::Changed => {
                    summary.added_or_updated += 1;
                    match changed_index.get(&key) {
                        Some(&position) => changed[position].1 = item,
                        None => {
                            changed_index.insert(key.clone(), changed.len());
                            changed.push((key, item));
                        }
                    }
                }
                Outcome::Unchanged => summary.unchanged += 1,
                Outcome::Expired => summary.expired += 1,
                Outcome::Outdated => summary.outdated += 1,
                Outcome::Dropped => {}
            }
        }

        debug!(
            event = events::INGEST_BATCH,
            component = COMPONENT,
            kind = self.profile.kind().as_str(),
            dataset_id,
            total = summary.total,
            added_or_updated = summary.added_or_updated,
            unchanged = summary.unchanged,
            expired = summary.expired,
            outdated = summary.outdated,
            ignored = summary.ignored,
            "ingested batch"
        );

        UpsertResult { summary, changed }
    }

    fn upsert_one(&self, key: &RecordKey, item: &P::Entity, now: DateTime<Utc>) -> Outcome {
        let checksum = match self.profile.checksum(item) {
            Ok(checksum) => Some(checksum),
            Err(err) => {
                warn!(
                    event = events::CHECKSUM_FAILED,
                    component = COMPONENT,
                    kind = self.profile.kind().as_str(),
                    record_key = %key,
                    err = %err,
                    "fingerprinting failed; treating item as changed"
                );
                None
            }
        };
        let policy = self.profile.expiration_policy();
        let expiration = policy.evaluate(self.profile.validity_end(item), now);
        let expires_at = policy
            .expires_at(expiration, now)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let incoming_recorded_at = self.profile.recorded_at(item);

        let mut outcome = Outcome::Dropped;
        self.records.compute(key, &mut |existing| {
            let Some(existing) = existing else {
                return match expiration {
                    Expiration::Expired => {
                        outcome = Outcome::Dropped;
                        Compute::Keep
                    }
                    Expiration::After(ttl) => {
                        self.store_checksum(key, checksum, ttl);
                        outcome = Outcome::Changed;
                        Compute::Put {
                            value: Envelope {
                                value: item.clone(),
                                expires_at,
                            },
                            ttl,
                        }
                    }
                };
            };

            let existing_recorded_at = self.profile.recorded_at(&existing.value);
            let unchanged = checksum.is_some() && self.checksums.get(key) == checksum;
            let outdated = match (incoming_recorded_at, existing_recorded_at) {
                (Some(incoming), Some(stored)) if unchanged => incoming < stored,
                (Some(incoming), Some(stored)) => incoming <= stored,
                _ => false,
            };
            if outdated {
                outcome = Outcome::Outdated;
                return Compute::Keep;
            }

            match expiration {
                Expiration::Expired => {
                    self.checksums.delete(key);
                    outcome = Outcome::Expired;
                    Compute::Delete
                }
                Expiration::After(ttl) => {
                    self.store_checksum(key, checksum, ttl);
                    outcome = if unchanged {
                        Outcome::Unchanged
                    } else {
                        Outcome::Changed
                    };
                    Compute::Put {
                        value: Envelope {
                            value: item.clone(),
                            expires_at,
                        },
                        ttl,
                    }
                }
            }
        });
        outcome
    }

    fn store_checksum(&self, key: &RecordKey, checksum: Option<u64>, ttl: std::time::Duration) {
        match checksum {
            Some(checksum) => self.checksums.put(key.clone(), checksum, ttl),
            None => {
                self.checksums.delete(key);
            }
        }
    }

    pub fn get(&self, key: &RecordKey) -> Option<P::Entity> {
        self.records.get(key).map(|envelope| envelope.value)
    }

    /// Full snapshot ordered by key, optionally limited to one dataset.
    pub fn get_all(&self, dataset_id: Option<&str>) -> Vec<P::Entity> {
        let keys = self.query_keys(&|key| dataset_id.map_or(true, |dataset| key.belongs_to(dataset)));
        self.get_many(&keys)
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    /// Current values for `keys`, ordered by key. Keys without a live record are skipped.
    pub fn get_many(&self, keys: &HashSet<RecordKey>) -> Vec<(RecordKey, P::Entity)> {
        let mut found: Vec<_> = self
            .records
            .get_all(keys)
            .into_iter()
            .map(|(key, envelope)| (key, envelope.value))
            .collect();
        found.sort_by(|(left, _), (right, _)| left.cmp(right));
        found
    }

    pub fn query_keys(&self, predicate: &dyn Fn(&RecordKey) -> bool) -> HashSet<RecordKey> {
        self.records.keys_matching(predicate)
    }

    /// Entities matching every populated dimension of `filter`.
    pub fn query(&self, filter: &EntityFilter) -> Vec<P::Entity> {
        let keys = self.query_keys(&|key| filter.matches_key(key));
        self.get_many(&keys)
            .into_iter()
            .map(|(_, value)| value)
            .filter(|value| self.matches_values(filter, value))
            .collect()
    }

    /// Applies only the value-level dimensions of `filter`.
    pub fn matches_values(&self, filter: &EntityFilter, value: &P::Entity) -> bool {
        filter.matches_values(|dimension| self.profile.filter_values(value, dimension))
    }

    /// Removes every record of one dataset, returning how many were deleted.
    pub fn clear_dataset(&self, dataset_id: &str) -> usize {
        let keys = self.query_keys(&|key| key.belongs_to(dataset_id));
        let mut removed = 0;
        for key in &keys {
            self.checksums.delete(key);
            if self.records.delete(key).is_some() {
                removed += 1;
            }
        }
        debug!(
            event = events::DATASET_CLEARED,
            component = COMPONENT,
            kind = self.profile.kind().as_str(),
            dataset_id,
            removed,
            "cleared dataset"
        );
        removed
    }

    pub fn size(&self) -> usize {
        self.records.size()
    }
}
