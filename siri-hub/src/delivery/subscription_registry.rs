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

//! Owner of push subscription descriptors.

use crate::delivery::fail_tracker::FailTracker;
use crate::delivery::subscription::{
    OutboundSubscriptionSetup, SubscribeRejection, SubscribeResponse, SubscriptionRequest,
    SubscriptionState, SubscriptionStatus,
};
use crate::delivery::subscription_directory::SubscriptionDirectory;
use crate::model::SiriDataKind;
use crate::observability::{events, fields};
use crate::storage::{Compute, KeyedTtlStore, StoreProvider};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

const COMPONENT: &str = "subscription_registry";
// Retention for subscriptions without a termination time.
const OPEN_ENDED_RETENTION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Subscriptions live in a [`KeyedTtlStore`] so they can be shared between nodes; matching
/// reads a versioned local snapshot rebuilt on every local change and on [`Self::refresh`].
pub struct SubscriptionRegistry {
    subscriptions: Arc<dyn KeyedTtlStore<String, Arc<OutboundSubscriptionSetup>>>,
    directory: SubscriptionDirectory,
    rebuild_lock: Mutex<()>,
    fail_tracker: Arc<FailTracker>,
}

impl SubscriptionRegistry {
    pub fn new<S: StoreProvider>(provider: &S) -> Self {
        Self {
            subscriptions: provider.create("subscriptions"),
            directory: SubscriptionDirectory::empty(),
            rebuild_lock: Mutex::new(()),
            fail_tracker: Arc::new(FailTracker::new()),
        }
    }

    pub fn fail_tracker(&self) -> &Arc<FailTracker> {
        &self.fail_tracker
    }

    /// Validates and stores a subscription. Rejections are returned, never raised.
    pub fn subscribe(&self, request: SubscriptionRequest) -> SubscribeResponse {
        let subscription_id = request
            .subscription_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        match self.store_subscription(subscription_id.clone(), request, Utc::now()) {
            Ok(setup) => {
                let version = self.rebuild_directory();
                info!(
                    event = events::SUBSCRIPTION_ADDED,
                    component = COMPONENT,
                    subscription_id = setup.subscription_id.as_str(),
                    kind = setup.kind.as_str(),
                    dataset_id = fields::dataset_or_all(setup.dataset_id.as_deref()),
                    consumer_address = setup.consumer_address.as_str(),
                    snapshot_version = version,
                    "subscription added"
                );
                SubscribeResponse::accepted(subscription_id, setup.kind.requires_initial_snapshot())
            }
            Err(rejection) => {
                warn!(
                    event = events::SUBSCRIPTION_REJECTED,
                    component = COMPONENT,
                    subscription_id = subscription_id.as_str(),
                    reason = rejection.reason_code(),
                    err = %rejection,
                    "subscription rejected"
                );
                SubscribeResponse::rejected(subscription_id, rejection)
            }
        }
    }

    fn store_subscription(
        &self,
        subscription_id: String,
        request: SubscriptionRequest,
        now: DateTime<Utc>,
    ) -> Result<Arc<OutboundSubscriptionSetup>, SubscribeRejection> {
        let consumer_address = request
            .consumer_address
            .filter(|address| !address.trim().is_empty())
            .ok_or(SubscribeRejection::MissingAddress)?;
        let ttl = match request.initial_termination_time {
            Some(termination) => termination
                .signed_duration_since(now)
                .to_std()
                .ok()
                .filter(|ttl| !ttl.is_zero())
                .ok_or(SubscribeRejection::TerminationTimeInPast { termination })?,
            None => OPEN_ENDED_RETENTION,
        };

        let setup = Arc::new(OutboundSubscriptionSetup {
            subscription_id,
            kind: request.kind,
            consumer_address,
            dataset_id: request.dataset_id,
            filter: request.filter,
            heartbeat_interval_ms: request.heartbeat_interval_ms,
            initial_termination_time: request.initial_termination_time,
            value_adapters: request.value_adapters,
            update_interval_ms: request.update_interval_ms,
            requestor_ref: request.requestor_ref,
            created_at: now,
        });

        let mut conflict = None;
        self.subscriptions
            .compute(&setup.subscription_id, &mut |existing| match existing {
                Some(existing) if existing.kind != setup.kind => {
                    conflict = Some(SubscribeRejection::KindConflict {
                        existing: existing.kind,
                        requested: setup.kind,
                    });
                    Compute::Keep
                }
                _ => Compute::Put {
                    value: setup.clone(),
                    ttl,
                },
            });

        match conflict {
            Some(rejection) => Err(rejection),
            None => Ok(setup),
        }
    }

    /// Removes a subscription and its failure streak. Effective for the next match lookup.
    pub fn terminate(&self, subscription_id: &str) -> Option<Arc<OutboundSubscriptionSetup>> {
        let removed = self.subscriptions.delete(&subscription_id.to_string());
        self.fail_tracker.clear(subscription_id);
        if removed.is_some() {
            let version = self.rebuild_directory();
            info!(
                event = events::SUBSCRIPTION_TERMINATED,
                component = COMPONENT,
                subscription_id,
                snapshot_version = version,
                "subscription terminated"
            );
        }
        removed
    }

    /// Live subscriptions for one change batch. Subscriptions past their termination
    /// time are skipped and swept.
    pub fn matching_subscriptions(
        &self,
        kind: SiriDataKind,
        dataset_id: &str,
    ) -> Vec<Arc<OutboundSubscriptionSetup>> {
        let now = Utc::now();
        let (version, candidates) = self.directory.lookup_with_version(kind);

        let mut expired = Vec::new();
        let mut matching = Vec::new();
        for setup in candidates {
            if setup.is_expired(now) {
                expired.push(setup);
            } else if setup.matches(kind, dataset_id) {
                matching.push(setup);
            }
        }

        if !expired.is_empty() {
            for setup in &expired {
                self.subscriptions.delete(&setup.subscription_id);
                self.fail_tracker.clear(&setup.subscription_id);
                info!(
                    event = events::SUBSCRIPTION_EXPIRED,
                    component = COMPONENT,
                    subscription_id = setup.subscription_id.as_str(),
                    kind = setup.kind.as_str(),
                    "subscription reached its termination time"
                );
            }
            self.rebuild_directory();
        }

        if matching.is_empty() {
            debug!(
                event = events::SUBSCRIPTION_LOOKUP_EMPTY,
                component = COMPONENT,
                kind = kind.as_str(),
                dataset_id,
                snapshot_version = version,
                "no subscriptions match change batch"
            );
        }
        matching
    }

    pub fn get(&self, subscription_id: &str) -> Option<Arc<OutboundSubscriptionSetup>> {
        self.subscriptions.get(&subscription_id.to_string())
    }

    pub fn contains(&self, subscription_id: &str) -> bool {
        self.subscriptions.contains_key(&subscription_id.to_string())
    }

    /// Active subscriptions ordered by id.
    pub fn list(&self) -> Vec<Arc<OutboundSubscriptionSetup>> {
        let now = Utc::now();
        self.directory
            .all()
            .into_iter()
            .filter(|setup| !setup.is_expired(now))
            .collect()
    }

    pub fn status(&self, now: Instant) -> Vec<SubscriptionStatus> {
        self.list()
            .into_iter()
            .map(|setup| {
                let state = match self.fail_tracker.failing_for(&setup.subscription_id, now) {
                    Some(failing_for) => SubscriptionState::Degraded { failing_for },
                    None => SubscriptionState::Active,
                };
                SubscriptionStatus { setup, state }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuilds the match snapshot from the backing store.
    pub fn refresh(&self) -> u64 {
        self.rebuild_directory()
    }

    fn rebuild_directory(&self) -> u64 {
        let _guard = self.rebuild_lock.lock();
        let ids = self.subscriptions.keys_matching(&|_| true);
        let setups = self.subscriptions.get_all(&ids);
        let count = setups.len();
        let stale_streaks = self
            .fail_tracker
            .retain(|subscription_id| setups.contains_key(subscription_id));
        let version = self.directory.apply(setups.into_values());
        debug!(
            event = events::SUBSCRIPTION_SNAPSHOT_REBUILD_OK,
            component = COMPONENT,
            snapshot_version = version,
            subscriptions = count,
            stale_streaks,
            "subscription snapshot rebuilt"
        );
        version
    }
}

#[cfg(test)]
mod tests {
    use super::SubscriptionRegistry;
    use crate::delivery::subscription::{
        SubscribeRejection, SubscriptionRequest, SubscriptionState,
    };
    use crate::model::SiriDataKind;
    use crate::storage::InMemoryStoreProvider;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;
    use tokio::time::Instant;

    fn registry() -> SubscriptionRegistry {
        SubscriptionRegistry::new(&InMemoryStoreProvider::new())
    }

    #[test]
    fn subscribe_validates_address_and_termination() {
        let registry = registry();

        let missing = SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "  ");
        let response = registry.subscribe(missing);
        assert!(!response.accepted);
        assert_eq!(response.error, Some(SubscribeRejection::MissingAddress));

        let past = SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://consumer")
            .with_termination_time(Utc::now() - ChronoDuration::minutes(1));
        let response = registry.subscribe(past);
        assert_eq!(
            response.error.map(|error| error.reason_code()),
            Some("already-expired-termination")
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn existing_ids_keep_their_kind() {
        let registry = registry();
        let first = registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::SituationExchange, "http://consumer")
                .with_subscription_id("sub-1"),
        );
        assert!(first.accepted);
        assert!(first.initial_snapshot);

        let conflict = registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://consumer")
                .with_subscription_id("sub-1"),
        );
        assert_eq!(
            conflict.error,
            Some(SubscribeRejection::KindConflict {
                existing: SiriDataKind::SituationExchange,
                requested: SiriDataKind::VehicleMonitoring,
            })
        );

        let update = registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::SituationExchange, "http://consumer/v2")
                .with_subscription_id("sub-1"),
        );
        assert!(update.accepted);
        assert_eq!(
            registry.get("sub-1").map(|setup| setup.consumer_address.clone()),
            Some("http://consumer/v2".to_string())
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn generated_ids_are_unique() {
        let registry = registry();
        let first =
            registry.subscribe(SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://a"));
        let second =
            registry.subscribe(SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://b"));

        assert!(first.accepted && second.accepted);
        assert_ne!(first.subscription_id, second.subscription_id);
        assert!(!first.initial_snapshot);
    }

    #[test]
    fn matching_honours_kind_and_dataset_scope() {
        let registry = registry();
        registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://global")
                .with_subscription_id("global"),
        );
        registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://rut")
                .with_subscription_id("rut")
                .with_dataset_id("RUT"),
        );
        registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::SituationExchange, "http://sx")
                .with_subscription_id("sx"),
        );

        let ids = |dataset: &str| {
            registry
                .matching_subscriptions(SiriDataKind::VehicleMonitoring, dataset)
                .iter()
                .map(|setup| setup.subscription_id.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(ids("RUT"), vec!["global".to_string(), "rut".to_string()]);
        assert_eq!(ids("ATB"), vec!["global".to_string()]);
    }

    #[test]
    fn terminate_is_effective_immediately_and_clears_failures() {
        let registry = registry();
        registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://consumer")
                .with_subscription_id("sub-1"),
        );
        registry.fail_tracker().record_failure("sub-1", Instant::now());

        assert!(registry.terminate("sub-1").is_some());
        assert!(registry.terminate("sub-1").is_none());
        assert!(registry
            .matching_subscriptions(SiriDataKind::VehicleMonitoring, "RUT")
            .is_empty());
        assert!(registry.fail_tracker().is_empty());
    }

    #[test]
    fn expired_subscriptions_are_excluded_and_swept() {
        let registry = registry();
        registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://consumer")
                .with_subscription_id("short")
                .with_termination_time(Utc::now() + ChronoDuration::milliseconds(20)),
        );
        assert_eq!(registry.list().len(), 1);

        std::thread::sleep(Duration::from_millis(50));

        assert!(registry
            .matching_subscriptions(SiriDataKind::VehicleMonitoring, "RUT")
            .is_empty());
        assert!(registry.list().is_empty());
        assert!(!registry.contains("short"));
    }

    #[test]
    fn refresh_bumps_the_snapshot_version_and_keeps_live_entries() {
        let registry = registry();
        registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::SituationExchange, "http://consumer")
                .with_subscription_id("sx"),
        );

        let first = registry.refresh();
        let second = registry.refresh();

        assert!(second > first);
        assert_eq!(
            registry
                .matching_subscriptions(SiriDataKind::SituationExchange, "RUT")
                .len(),
            1
        );
    }

    #[test]
    fn refresh_forgets_failures_of_naturally_expired_subscriptions() {
        let registry = registry();
        registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://consumer")
                .with_subscription_id("short")
                .with_termination_time(Utc::now() + ChronoDuration::milliseconds(30)),
        );
        registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://consumer")
                .with_subscription_id("long"),
        );
        registry.fail_tracker().record_failure("short", Instant::now());
        registry.fail_tracker().record_failure("long", Instant::now());

        std::thread::sleep(Duration::from_millis(80));
        registry.refresh();

        assert!(!registry.contains("short"));
        assert_eq!(registry.fail_tracker().first_failure("short"), None);
        assert!(registry.fail_tracker().first_failure("long").is_some());
        assert_eq!(registry.fail_tracker().len(), 1);
    }

    #[test]
    fn status_reports_degraded_subscriptions() {
        let registry = registry();
        registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://consumer")
                .with_subscription_id("sub-1"),
        );
        let start = Instant::now();
        registry.fail_tracker().record_failure("sub-1", start);

        let status = registry.status(start + Duration::from_secs(30));

        assert_eq!(status.len(), 1);
        assert_eq!(
            status[0].state,
            SubscriptionState::Degraded {
                failing_for: Duration::from_secs(30)
            }
        );
    }
}
