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

//! Per-consumer incremental change sets for polling clients.

use crate::entity::{EntityProfile, EntityStore};
use crate::model::{EntityFilter, RecordKey};
use crate::observability::events;
use crate::paging::take_page;
use crate::storage::{Compute, KeyedTtlStore, StoreProvider};
use crate::tracking::dirty_buffer::DirtyBuffer;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

const COMPONENT: &str = "change_tracker";

/// Keys one consumer has not retrieved yet.
#[derive(Clone, Debug)]
pub struct ConsumerChangeSet {
    pub pending_keys: HashSet<RecordKey>,
    pub last_access: Instant,
    /// Dirty-buffer sequence at registration. Keys recorded up to it were already
    /// covered by the registration snapshot and are not merged again.
    pub baseline: u64,
}

/// Parameters of one poll.
#[derive(Clone, Debug, Default)]
pub struct ReadRequest {
    /// Dataset dimensions select the keys to consume; the other dimensions filter the values.
    pub filter: EntityFilter,
    /// Page size; `None` serves everything pending.
    pub max_size: Option<usize>,
}

impl ReadRequest {
    pub fn for_dataset(dataset_id: impl Into<String>) -> Self {
        Self {
            filter: EntityFilter::for_dataset(dataset_id),
            max_size: None,
        }
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

#[derive(Clone, Debug)]
pub struct ReadResult<T> {
    pub items: Vec<T>,
    /// `false` when this poll registered the consumer.
    pub known_consumer: bool,
    /// Keys in scope were left pending because of `max_size`.
    pub more_data: bool,
}

enum ReadPlan {
    Snapshot,
    Keys(HashSet<RecordKey>),
}

/// Tracks which keys each polling consumer still has to fetch.
///
/// Ingestion appends to a local [`DirtyBuffer`]; [`ChangeTracker::commit`] merges the
/// drained keys into every live consumer's change set in one pass.
pub struct ChangeTracker<P: EntityProfile> {
    store: Arc<EntityStore<P>>,
    change_sets: Arc<dyn KeyedTtlStore<String, ConsumerChangeSet>>,
    dirty: DirtyBuffer,
    tracking_period: Duration,
}

impl<P: EntityProfile> ChangeTracker<P> {
    pub fn new<S: StoreProvider>(
        store: Arc<EntityStore<P>>,
        provider: &S,
        tracking_period: Duration,
    ) -> Self {
        let kind = store.profile().kind().as_str().to_ascii_lowercase();
        Self {
            change_sets: provider.create(&format!("{kind}-change-sets")),
            store,
            dirty: DirtyBuffer::new(),
            tracking_period,
        }
    }

    pub fn record_change<I>(&self, keys: I)
    where
        I: IntoIterator<Item = RecordKey>,
    {
        self.dirty.record(keys);
    }

    /// Merges the buffered keys into every tracked consumer, returning how many keys were merged.
    ///
    /// A change set keeps the expiry it got from its consumer's last poll; merging never
    /// extends it.
    pub fn commit(&self) -> usize {
        let drained = self.dirty.drain();
        if drained.is_empty() {
            return 0;
        }

        let consumers = self.change_sets.keys_matching(&|_| true);
        let mut merged_into = 0usize;
        for consumer in &consumers {
            self.change_sets.compute(consumer, &mut |existing| {
                let Some(existing) = existing else {
                    return Compute::Keep;
                };
                let remaining = self
                    .tracking_period
                    .saturating_sub(existing.last_access.elapsed());
                if remaining.is_zero() {
                    return Compute::Delete;
                }
                let mut updated = existing.clone();
                updated.pending_keys.extend(
                    drained
                        .iter()
                        .filter(|(_, sequence)| **sequence > existing.baseline)
                        .map(|(key, _)| key.clone()),
                );
                merged_into += 1;
                Compute::Put {
                    value: updated,
                    ttl: remaining,
                }
            });
        }

        debug!(
            event = events::TRACKER_COMMIT_OK,
            component = COMPONENT,
            kind = self.store.profile().kind().as_str(),
            keys = drained.len(),
            consumers = merged_into,
            "committed change batch"
        );
        drained.len()
    }

    /// Commits until nothing is buffered. Used on shutdown.
    pub fn flush(&self) -> usize {
        let mut flushed = 0;
        while !self.dirty.is_empty() {
            flushed += self.commit();
        }
        trace!(
            event = events::TRACKER_FLUSH,
            component = COMPONENT,
            kind = self.store.profile().kind().as_str(),
            flushed,
            "flushed change buffer"
        );
        flushed
    }

    /// Serves the consumer's pending changes and forgets the served keys.
    ///
    /// An unknown consumer is registered: unpaged it gets the full snapshot with an empty
    /// baseline, paged it gets every key in scope seeded as pending and the first page
    /// served. Changes still buffered at registration are part of that snapshot and are
    /// not merged into the new change set by the next commit. Concurrent polls by the
    /// same consumer never serve a key twice.
    pub fn read_and_reset(
        &self,
        consumer_id: &str,
        request: &ReadRequest,
    ) -> ReadResult<P::Entity> {
        let consumer_key = consumer_id.to_string();
        let filter = &request.filter;
        let mut plan = ReadPlan::Keys(HashSet::new());
        let mut known_consumer = false;
        let mut more_data = false;

        self.change_sets.compute(&consumer_key, &mut |existing| {
            known_consumer = existing.is_some();
            let baseline = match existing {
                Some(existing) => existing.baseline,
                None => self.dirty.sequence(),
            };
            let candidates = match (existing, request.max_size) {
                (None, None) => {
                    plan = ReadPlan::Snapshot;
                    return Compute::Put {
                        value: ConsumerChangeSet {
                            pending_keys: HashSet::new(),
                            last_access: Instant::now(),
                            baseline,
                        },
                        ttl: self.tracking_period,
                    };
                }
                (None, Some(_)) => self.store.query_keys(&|key| filter.matches_key(key)),
                (Some(existing), _) => existing.pending_keys.clone(),
            };

            let (mut in_scope, mut pending): (Vec<_>, HashSet<_>) = (Vec::new(), HashSet::new());
            for key in candidates {
                if filter.matches_key(&key) {
                    in_scope.push(key);
                } else {
                    pending.insert(key);
                }
            }
            in_scope.sort();
            let (page, rest) = take_page(in_scope, request.max_size);
            more_data = !rest.is_empty();
            pending.extend(rest);
            plan = ReadPlan::Keys(page.into_iter().collect());

            Compute::Put {
                value: ConsumerChangeSet {
                    pending_keys: pending,
                    last_access: Instant::now(),
                    baseline,
                },
                ttl: self.tracking_period,
            }
        });

        let items: Vec<P::Entity> = match plan {
            ReadPlan::Snapshot => self.store.query(filter),
            ReadPlan::Keys(keys) => self
                .store
                .get_many(&keys)
                .into_iter()
                .map(|(_, value)| value)
                .filter(|value| self.store.matches_values(filter, value))
                .collect(),
        };

        debug!(
            event = events::TRACKER_READ,
            component = COMPONENT,
            kind = self.store.profile().kind().as_str(),
            consumer_id,
            known_consumer,
            served = items.len(),
            more_data,
            "served change set"
        );

        ReadResult {
            items,
            known_consumer,
            more_data,
        }
    }

    /// Number of keys still pending for a consumer, `None` when it is not tracked.
    pub fn pending_count(&self, consumer_id: &str) -> Option<usize> {
        self.change_sets
            .get(&consumer_id.to_string())
            .map(|change_set| change_set.pending_keys.len())
    }

    pub fn consumer_count(&self) -> usize {
        self.change_sets.size()
    }

    pub fn buffered(&self) -> usize {
        self.dirty.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeTracker, ReadRequest};
    use crate::entity::{EntityStore, VehicleActivityProfile};
    use crate::model::{EntityFilter, FilterDimension, RecordKey, VehicleActivity};
    use crate::storage::InMemoryStoreProvider;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        store: Arc<EntityStore<VehicleActivityProfile>>,
        tracker: ChangeTracker<VehicleActivityProfile>,
    }

    impl Fixture {
        fn new(tracking_period: Duration) -> Self {
            let provider = InMemoryStoreProvider::new();
            let store = Arc::new(EntityStore::new(
                Arc::new(VehicleActivityProfile::default()),
                &provider,
            ));
            let tracker = ChangeTracker::new(store.clone(), &provider, tracking_period);
            Self { store, tracker }
        }

        fn ingest(&self, dataset_id: &str, vehicles: &[&str]) {
            self.ingest_uncommitted(dataset_id, vehicles);
            self.tracker.commit();
        }

        fn ingest_uncommitted(&self, dataset_id: &str, vehicles: &[&str]) {
            let now = Utc::now();
            let items = vehicles
                .iter()
                .map(|vehicle| VehicleActivity {
                    recorded_at_time: Some(now),
                    valid_until_time: Some(now + ChronoDuration::minutes(10)),
                    vehicle_ref: Some(vehicle.to_string()),
                    line_ref: Some(format!("{dataset_id}:Line:{vehicle}")),
                    ..Default::default()
                })
                .collect();
            let result = self.store.upsert_all(dataset_id, items);
            self.tracker.record_change(result.changed_keys());
        }
    }

    #[test]
    fn polls_return_snapshot_then_nothing_then_new_changes() {
        let fixture = Fixture::new(Duration::from_secs(600));
        fixture.ingest("RUT", &["1", "2", "3"]);
        let request = ReadRequest::default();

        let first = fixture.tracker.read_and_reset("consumer", &request);
        assert!(!first.known_consumer);
        assert_eq!(first.items.len(), 3);

        let second = fixture.tracker.read_and_reset("consumer", &request);
        assert!(second.known_consumer);
        assert!(second.items.is_empty());

        fixture.ingest("RUT", &["4"]);
        let third = fixture.tracker.read_and_reset("consumer", &request);
        assert_eq!(third.items.len(), 1);
        assert_eq!(third.items[0].vehicle_ref.as_deref(), Some("4"));
    }

    #[test]
    fn changes_buffered_at_registration_are_not_served_twice() {
        let fixture = Fixture::new(Duration::from_secs(600));
        fixture.ingest_uncommitted("RUT", &["1", "2"]);
        let request = ReadRequest::default();

        let first = fixture.tracker.read_and_reset("consumer", &request);
        assert_eq!(first.items.len(), 2);

        fixture.tracker.commit();
        assert_eq!(fixture.tracker.pending_count("consumer"), Some(0));
        let second = fixture.tracker.read_and_reset("consumer", &request);
        assert!(second.items.is_empty());

        fixture.ingest("RUT", &["3"]);
        let third = fixture.tracker.read_and_reset("consumer", &request);
        assert_eq!(third.items.len(), 1);
        assert_eq!(third.items[0].vehicle_ref.as_deref(), Some("3"));
    }

    #[test]
    fn paged_registration_skips_buffered_changes_too() {
        let fixture = Fixture::new(Duration::from_secs(600));
        fixture.ingest_uncommitted("RUT", &["1", "2", "3"]);
        let request = ReadRequest::default().with_max_size(2);

        let first = fixture.tracker.read_and_reset("consumer", &request);
        assert_eq!(first.items.len(), 2);
        fixture.tracker.commit();

        let second = fixture.tracker.read_and_reset("consumer", &request);
        assert_eq!(second.items.len(), 1);
        assert!(!second.more_data);
        assert_eq!(fixture.tracker.pending_count("consumer"), Some(0));
    }

    #[test]
    fn concurrent_polls_never_serve_a_key_twice() {
        let fixture = Fixture::new(Duration::from_secs(600));
        fixture.tracker.read_and_reset("consumer", &ReadRequest::default());
        let vehicles: Vec<String> = (0..60).map(|n| n.to_string()).collect();
        let refs: Vec<&str> = vehicles.iter().map(String::as_str).collect();
        fixture.ingest("RUT", &refs);
        let request = ReadRequest::default().with_max_size(3);

        let mut served: Vec<String> = std::thread::scope(|scope| {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    let tracker = &fixture.tracker;
                    let request = &request;
                    scope.spawn(move || {
                        let mut seen = Vec::new();
                        loop {
                            let read = tracker.read_and_reset("consumer", request);
                            if read.items.is_empty() && !read.more_data {
                                break;
                            }
                            seen.extend(read.items.into_iter().filter_map(|item| item.vehicle_ref));
                        }
                        seen
                    })
                })
                .collect();
            readers
                .into_iter()
                .flat_map(|reader| reader.join().expect("reader thread"))
                .collect()
        });

        assert_eq!(served.len(), 60);
        served.sort();
        served.dedup();
        assert_eq!(served.len(), 60);
    }

    #[test]
    fn paged_reads_leave_the_remainder_pending() {
        let fixture = Fixture::new(Duration::from_secs(600));
        fixture.tracker.read_and_reset("consumer", &ReadRequest::default());
        fixture.ingest("RUT", &["1", "2", "3"]);

        let page = fixture
            .tracker
            .read_and_reset("consumer", &ReadRequest::for_dataset("RUT").with_max_size(1));

        assert_eq!(page.items.len(), 1);
        assert!(page.more_data);
        assert_eq!(fixture.tracker.pending_count("consumer"), Some(2));

        let rest = fixture
            .tracker
            .read_and_reset("consumer", &ReadRequest::for_dataset("RUT").with_max_size(5));
        assert_eq!(rest.items.len(), 2);
        assert!(!rest.more_data);
        assert_eq!(fixture.tracker.pending_count("consumer"), Some(0));
    }

    #[test]
    fn paged_first_poll_seeds_the_snapshot() {
        let fixture = Fixture::new(Duration::from_secs(600));
        fixture.ingest("RUT", &["1", "2", "3"]);
        let request = ReadRequest::default().with_max_size(2);

        let first = fixture.tracker.read_and_reset("consumer", &request);
        assert!(!first.known_consumer);
        assert_eq!(first.items.len(), 2);
        assert!(first.more_data);

        let second = fixture.tracker.read_and_reset("consumer", &request);
        assert_eq!(second.items.len(), 1);
        assert!(!second.more_data);
    }

    #[test]
    fn dataset_filtered_polls_keep_other_datasets_pending() {
        let fixture = Fixture::new(Duration::from_secs(600));
        fixture.tracker.read_and_reset("consumer", &ReadRequest::default());
        fixture.ingest("RUT", &["1"]);
        fixture.ingest("ATB", &["2"]);

        let rut = fixture
            .tracker
            .read_and_reset("consumer", &ReadRequest::for_dataset("RUT"));

        assert_eq!(rut.items.len(), 1);
        assert_eq!(rut.items[0].vehicle_ref.as_deref(), Some("1"));
        assert_eq!(fixture.tracker.pending_count("consumer"), Some(1));

        let atb = fixture
            .tracker
            .read_and_reset("consumer", &ReadRequest::for_dataset("ATB"));
        assert_eq!(atb.items[0].vehicle_ref.as_deref(), Some("2"));
    }

    #[test]
    fn value_filters_drop_items_without_requeueing_them() {
        let fixture = Fixture::new(Duration::from_secs(600));
        fixture.tracker.read_and_reset("consumer", &ReadRequest::default());
        fixture.ingest("RUT", &["1", "2"]);
        let request = ReadRequest {
            filter: EntityFilter::new().with(FilterDimension::LineRef, ["RUT:Line:2"]),
            max_size: None,
        };

        let result = fixture.tracker.read_and_reset("consumer", &request);

        assert_eq!(result.items.len(), 1);
        assert_eq!(fixture.tracker.pending_count("consumer"), Some(0));
    }

    #[test]
    fn expired_records_are_not_resurrected() {
        let fixture = Fixture::new(Duration::from_secs(600));
        fixture.tracker.read_and_reset("consumer", &ReadRequest::default());
        fixture.ingest("RUT", &["1"]);
        fixture.store.clear_dataset("RUT");

        let result = fixture.tracker.read_and_reset("consumer", &ReadRequest::default());

        assert!(result.items.is_empty());
    }

    #[test]
    fn changes_recorded_after_a_drain_reach_the_next_commit() {
        let fixture = Fixture::new(Duration::from_secs(600));
        fixture.tracker.read_and_reset("consumer", &ReadRequest::default());
        fixture.tracker.record_change([RecordKey::new("RUT", "1")]);
        assert_eq!(fixture.tracker.commit(), 1);

        fixture.tracker.record_change([RecordKey::new("RUT", "2")]);
        assert_eq!(fixture.tracker.buffered(), 1);
        assert_eq!(fixture.tracker.flush(), 1);

        assert_eq!(fixture.tracker.buffered(), 0);
        assert_eq!(fixture.tracker.pending_count("consumer"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_consumers_are_forgotten_after_the_tracking_period() {
        let fixture = Fixture::new(Duration::from_secs(60));
        fixture.tracker.read_and_reset("consumer", &ReadRequest::default());
        assert_eq!(fixture.tracker.consumer_count(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        fixture.ingest("RUT", &["1"]);
        assert_eq!(fixture.tracker.pending_count("consumer"), Some(1));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(fixture.tracker.pending_count("consumer"), None);

        let result = fixture.tracker.read_and_reset("consumer", &ReadRequest::default());
        assert!(!result.known_consumer);
        assert_eq!(result.items.len(), 1);
    }
}
