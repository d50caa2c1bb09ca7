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

//! Versioned, lock-free read snapshot of subscriptions grouped by kind.

use crate::delivery::subscription::OutboundSubscriptionSetup;
use crate::model::SiriDataKind;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct SubscriptionDirectorySnapshot {
    version: u64,
    by_kind: HashMap<SiriDataKind, Vec<Arc<OutboundSubscriptionSetup>>>,
}

/// Readers load the current snapshot without locking; writers swap in a rebuilt one.
pub(crate) struct SubscriptionDirectory {
    snapshot: ArcSwap<SubscriptionDirectorySnapshot>,
    next_version: AtomicU64,
}

impl SubscriptionDirectory {
    pub(crate) fn empty() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(SubscriptionDirectorySnapshot::default()),
            next_version: AtomicU64::new(1),
        }
    }

    /// Replaces the snapshot, returning the new version.
    pub(crate) fn apply<I>(&self, setups: I) -> u64
    where
        I: IntoIterator<Item = Arc<OutboundSubscriptionSetup>>,
    {
        let mut by_kind: HashMap<SiriDataKind, Vec<Arc<OutboundSubscriptionSetup>>> =
            HashMap::new();
        for setup in setups {
            by_kind.entry(setup.kind).or_default().push(setup);
        }
        for setups in by_kind.values_mut() {
            setups.sort_by(|left, right| left.subscription_id.cmp(&right.subscription_id));
        }

        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        self.snapshot.store(Arc::new(SubscriptionDirectorySnapshot { version, by_kind }));
        version
    }

    /// Subscriptions of one kind plus the snapshot version they came from.
    pub(crate) fn lookup_with_version(
        &self,
        kind: SiriDataKind,
    ) -> (u64, Vec<Arc<OutboundSubscriptionSetup>>) {
        let snapshot = self.snapshot.load();
        (
            snapshot.version,
            snapshot.by_kind.get(&kind).cloned().unwrap_or_default(),
        )
    }

    pub(crate) fn all(&self) -> Vec<Arc<OutboundSubscriptionSetup>> {
        let snapshot = self.snapshot.load();
        let mut all: Vec<_> = snapshot.by_kind.values().flatten().cloned().collect();
        all.sort_by(|left, right| left.subscription_id.cmp(&right.subscription_id));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::SubscriptionDirectory;
    use crate::delivery::subscription::OutboundSubscriptionSetup;
    use crate::model::{EntityFilter, SiriDataKind};
    use chrono::Utc;
    use std::sync::Arc;

    fn setup(id: &str, kind: SiriDataKind) -> Arc<OutboundSubscriptionSetup> {
        Arc::new(OutboundSubscriptionSetup {
            subscription_id: id.to_string(),
            kind,
            consumer_address: format!("http://consumer/{id}"),
            dataset_id: None,
            filter: EntityFilter::default(),
            heartbeat_interval_ms: 0,
            initial_termination_time: None,
            value_adapters: Vec::new(),
            update_interval_ms: None,
            requestor_ref: None,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn apply_groups_by_kind_and_advances_version() {
        let directory = SubscriptionDirectory::empty();
        assert_eq!(
            directory
                .lookup_with_version(SiriDataKind::VehicleMonitoring)
                .0,
            0
        );

        let version = directory.apply([
            setup("b", SiriDataKind::VehicleMonitoring),
            setup("a", SiriDataKind::VehicleMonitoring),
            setup("c", SiriDataKind::SituationExchange),
        ]);

        let (lookup_version, vehicles) =
            directory.lookup_with_version(SiriDataKind::VehicleMonitoring);
        assert_eq!(version, 1);
        assert_eq!(lookup_version, 1);
        assert_eq!(
            vehicles
                .iter()
                .map(|setup| setup.subscription_id.as_str())
                .collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert!(directory
            .lookup_with_version(SiriDataKind::GeneralMessage)
            .1
            .is_empty());
        assert_eq!(directory.all().len(), 3);
    }
}
