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

//! One SIRI kind wired end to end: store, change tracker and push fan-out.

use crate::delivery::{DeliveryDispatcher, OutboundSubscriptionSetup};
use crate::entity::{EntityProfile, EntityStore, UpsertSummary};
use crate::metrics::MetricsSink;
use crate::model::{EntityFilter, FilterDimension, SiriDataKind};
use crate::observability::events;
use crate::storage::StoreProvider;
use crate::tracking::{ChangeTracker, ReadRequest, ReadResult};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

const COMPONENT: &str = "kind_engine";

/// Ingestion and read entry point for one kind.
///
/// Every accepted change is handed to the change tracker for pollers and, off the
/// caller's task, to the dispatcher for push subscribers.
pub struct KindEngine<P: EntityProfile> {
    store: Arc<EntityStore<P>>,
    tracker: Arc<ChangeTracker<P>>,
    dispatcher: Arc<DeliveryDispatcher>,
    metrics: Arc<dyn MetricsSink>,
    handle: Handle,
}

impl<P: EntityProfile> KindEngine<P> {
    pub fn new<S: StoreProvider>(
        profile: P,
        provider: &S,
        tracking_period: Duration,
        dispatcher: Arc<DeliveryDispatcher>,
        metrics: Arc<dyn MetricsSink>,
        handle: Handle,
    ) -> Self {
        let store = Arc::new(EntityStore::new(Arc::new(profile), provider));
        let tracker = Arc::new(ChangeTracker::new(store.clone(), provider, tracking_period));
        Self {
            store,
            tracker,
            dispatcher,
            metrics,
            handle,
        }
    }

    pub fn kind(&self) -> SiriDataKind {
        self.store.profile().kind()
    }

    pub fn store(&self) -> &Arc<EntityStore<P>> {
        &self.store
    }

    pub fn tracker(&self) -> &Arc<ChangeTracker<P>> {
        &self.tracker
    }

    /// Upserts one batch from `dataset_id`. Never fails; rejected items are only counted.
    pub fn ingest(&self, dataset_id: &str, items: Vec<P::Entity>) -> UpsertSummary {
        self.ingest_counting(dataset_id, items, 0)
    }

    /// Decodes loosely typed items before ingesting them. Items that do not decode count
    /// as ignored.
    pub fn ingest_json(&self, dataset_id: &str, items: Vec<Value>) -> UpsertSummary {
        let mut undecodable = 0;
        let decoded = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<P::Entity>(item) {
                Ok(entity) => Some(entity),
                Err(err) => {
                    undecodable += 1;
                    warn!(
                        event = events::INGEST_ITEM_UNDECODABLE,
                        component = COMPONENT,
                        kind = self.kind().as_str(),
                        dataset_id,
                        err = %err,
                        "dropping item that does not decode"
                    );
                    None
                }
            })
            .collect();
        self.ingest_counting(dataset_id, decoded, undecodable)
    }

    fn ingest_counting(
        &self,
        dataset_id: &str,
        items: Vec<P::Entity>,
        undecodable: usize,
    ) -> UpsertSummary {
        let result = self.store.upsert_all(dataset_id, items);
        let mut summary = result.summary;
        summary.total += undecodable;
        summary.ignored += undecodable;

        self.metrics.record_ingest(
            self.kind(),
            dataset_id,
            summary.total,
            summary.added_or_updated,
            summary.expired_or_discarded(),
            summary.ignored,
        );

        if !result.changed.is_empty() {
            self.tracker.record_change(result.changed_keys());
            if !self.dispatcher.registry().is_empty() {
                self.dispatch(dataset_id, result.into_changed_values());
            }
        }
        summary
    }

    fn dispatch(&self, dataset_id: &str, changed: Vec<P::Entity>) {
        let dispatcher = self.dispatcher.clone();
        let profile = self.store.profile().clone();
        let dataset_id = dataset_id.to_string();
        self.handle.spawn(async move {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                dispatcher.on_change(profile.as_ref(), &dataset_id, &changed)
            }));
            if outcome.is_err() {
                error!(
                    event = events::DISPATCH_TASK_FAILED,
                    component = COMPONENT,
                    kind = profile.kind().as_str(),
                    dataset_id = dataset_id.as_str(),
                    changed = changed.len(),
                    "change batch dispatch panicked"
                );
            }
        });
    }

    /// Incremental read for a polling consumer.
    pub fn poll(&self, consumer_id: &str, request: &ReadRequest) -> ReadResult<P::Entity> {
        self.tracker.read_and_reset(consumer_id, request)
    }

    pub fn get_all(&self, dataset_id: Option<&str>) -> Vec<P::Entity> {
        self.store.get_all(dataset_id)
    }

    pub fn query(&self, filter: &EntityFilter) -> Vec<P::Entity> {
        self.store.query(filter)
    }

    pub fn clear_dataset(&self, dataset_id: &str) -> usize {
        self.store.clear_dataset(dataset_id)
    }

    pub fn commit(&self) -> usize {
        self.tracker.commit()
    }

    pub fn flush(&self) -> usize {
        self.tracker.flush()
    }

    /// Pushes everything currently matching `setup` to it, off the caller's task.
    pub fn deliver_snapshot(&self, setup: Arc<OutboundSubscriptionSetup>) {
        let mut filter = setup.filter.clone();
        if let Some(dataset_id) = &setup.dataset_id {
            filter = filter.with(FilterDimension::DatasetId, [dataset_id.clone()]);
        }

        let store = self.store.clone();
        let dispatcher = self.dispatcher.clone();
        let kind = self.kind();
        self.handle.spawn(async move {
            let items = store.query(&filter);
            let count = items.len();
            let scheduled = dispatcher.deliver_entities(kind, setup.clone(), &items);
            info!(
                event = events::INITIAL_SNAPSHOT_SCHEDULED,
                component = COMPONENT,
                kind = kind.as_str(),
                subscription_id = setup.subscription_id.as_str(),
                items = count,
                scheduled,
                "initial snapshot scheduled"
            );
        });
    }
}
