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

//! Heartbeat notifications for push subscriptions.

use crate::delivery::dispatcher::DeliveryDispatcher;
use crate::observability::events;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::trace;

const COMPONENT: &str = "heartbeat_scheduler";

/// Sends a heartbeat to every subscription whose interval elapsed since its last one.
///
/// Heartbeats travel through the dispatcher, so their failures feed the fail tracker and
/// a silent consumer is cancelled even when no data changes.
pub struct HeartbeatScheduler {
    dispatcher: Arc<DeliveryDispatcher>,
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl HeartbeatScheduler {
    pub fn new(dispatcher: Arc<DeliveryDispatcher>) -> Self {
        Self {
            dispatcher,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Returns how many heartbeats were queued. Subscriptions seen for the first time
    /// start their interval at `now`.
    pub fn scan(&self, now: Instant) -> usize {
        let active = self.dispatcher.registry().list();
        let mut due = Vec::new();
        {
            let mut last_sent = self.last_sent.lock();
            let active_ids: HashSet<&str> = active
                .iter()
                .map(|setup| setup.subscription_id.as_str())
                .collect();
            last_sent.retain(|subscription_id, _| active_ids.contains(subscription_id.as_str()));

            for setup in &active {
                let interval = setup.heartbeat_interval();
                if interval.is_zero() {
                    continue;
                }
                let last = last_sent
                    .entry(setup.subscription_id.clone())
                    .or_insert(now);
                if now.saturating_duration_since(*last) >= interval {
                    *last = now;
                    due.push(setup.clone());
                }
            }
        }

        let sent = due
            .into_iter()
            .filter(|setup| self.dispatcher.send_heartbeat(setup.clone()))
            .count();
        trace!(
            event = events::HEARTBEAT_SCAN,
            component = COMPONENT,
            subscriptions = active.len(),
            sent,
            "heartbeat scan finished"
        );
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::HeartbeatScheduler;
    use crate::delivery::dispatcher::{DeliveryDispatcher, DispatcherSettings};
    use crate::delivery::payload::{JsonServiceDeliveryBuilder, PushPayload};
    use crate::delivery::push_transport::{PushError, PushTransport};
    use crate::delivery::subscription::SubscriptionRequest;
    use crate::delivery::subscription_registry::SubscriptionRegistry;
    use crate::model::SiriDataKind;
    use crate::storage::InMemoryStoreProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;
    use tokio::time::Instant;

    #[derive(Default)]
    struct CountingTransport {
        posts: AtomicUsize,
    }

    #[async_trait]
    impl PushTransport for CountingTransport {
        async fn post(&self, _address: &str, _payload: &PushPayload) -> Result<(), PushError> {
            self.posts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn heartbeats_follow_each_subscription_interval() {
        let registry = Arc::new(SubscriptionRegistry::new(&InMemoryStoreProvider::new()));
        registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://fast")
                .with_subscription_id("fast")
                .with_heartbeat_interval(Duration::from_secs(1)),
        );
        registry.subscribe(
            SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://silent")
                .with_subscription_id("silent"),
        );
        let transport = Arc::new(CountingTransport::default());
        let dispatcher = Arc::new(DeliveryDispatcher::new(
            &Handle::current(),
            registry,
            transport.clone(),
            Arc::new(JsonServiceDeliveryBuilder::new("hub")),
            DispatcherSettings::default(),
        ));
        let scheduler = HeartbeatScheduler::new(dispatcher.clone());
        let start = Instant::now();

        assert_eq!(scheduler.scan(start), 0);
        assert_eq!(scheduler.scan(start + Duration::from_millis(500)), 0);
        assert_eq!(scheduler.scan(start + Duration::from_secs(1)), 1);
        assert_eq!(scheduler.scan(start + Duration::from_millis(1500)), 0);
        assert_eq!(scheduler.scan(start + Duration::from_secs(2)), 1);

        dispatcher.close().await;
        assert_eq!(transport.posts.load(Ordering::SeqCst), 2);
    }
}
