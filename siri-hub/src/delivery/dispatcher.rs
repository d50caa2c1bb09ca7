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

//! Fan-out of change batches to push subscribers.

use crate::delivery::fail_tracker::grace_period;
use crate::delivery::payload::{DeliveryContent, PushPayload, ServiceDeliveryBuilder};
use crate::delivery::push_pool::PushWorkerPool;
use crate::delivery::push_transport::{PushError, PushTransport};
use crate::delivery::subscription::OutboundSubscriptionSetup;
use crate::delivery::subscription_registry::SubscriptionRegistry;
use crate::entity::EntityProfile;
use crate::model::SiriDataKind;
use crate::observability::{events, fields};
use crate::paging::split_into_chunks;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info, warn, Level};

const COMPONENT: &str = "delivery_dispatcher";

/// What a delivery failure led to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureOutcome {
    /// The subscription no longer exists.
    Ignored,
    Degraded { failing_for: Duration },
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct DispatcherSettings {
    /// Chunk size for subscriptions that are not scoped to one dataset.
    pub default_max_elements_per_delivery: usize,
    pub workers: usize,
    pub queue_size: usize,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            default_max_elements_per_delivery: 1000,
            workers: 16,
            queue_size: 4096,
        }
    }
}

/// Filters, splits and pushes change batches to every matching subscription.
///
/// Each subscription gets one job per batch on the shared [`PushWorkerPool`]; its chunks
/// are posted in order and the job stops at the first failure.
pub struct DeliveryDispatcher {
    registry: Arc<SubscriptionRegistry>,
    transport: Arc<dyn PushTransport>,
    builder: Arc<dyn ServiceDeliveryBuilder>,
    pool: PushWorkerPool,
    default_max_elements: usize,
}

impl DeliveryDispatcher {
    pub fn new(
        handle: &Handle,
        registry: Arc<SubscriptionRegistry>,
        transport: Arc<dyn PushTransport>,
        builder: Arc<dyn ServiceDeliveryBuilder>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            pool: PushWorkerPool::new(handle, settings.workers, settings.queue_size),
            registry,
            transport,
            builder,
            default_max_elements: settings.default_max_elements_per_delivery,
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Pushes one change batch, returning how many subscriptions got a job.
    pub fn on_change<P: EntityProfile>(
        &self,
        profile: &P,
        dataset_id: &str,
        changed: &[P::Entity],
    ) -> usize {
        if changed.is_empty() {
            return 0;
        }

        let kind = profile.kind();
        let mut scheduled = 0;
        for setup in self.registry.matching_subscriptions(kind, dataset_id) {
            if !setup.filter.matches_dataset(dataset_id) {
                continue;
            }
            let selected: Vec<&P::Entity> = changed
                .iter()
                .filter(|value| {
                    setup
                        .filter
                        .matches_values(|dimension| profile.filter_values(*value, dimension))
                })
                .collect();
            if self.deliver_entities(kind, setup, &selected) {
                scheduled += 1;
            }
        }

        debug!(
            event = events::DELIVERY_BATCH,
            component = COMPONENT,
            kind = kind.as_str(),
            dataset_id,
            changed = changed.len(),
            scheduled,
            "dispatched change batch"
        );
        scheduled
    }

    /// Pushes already-selected entities to one subscription, chunked by its delivery limit.
    pub fn deliver_entities<T: serde::Serialize>(
        &self,
        kind: SiriDataKind,
        setup: Arc<OutboundSubscriptionSetup>,
        items: &[T],
    ) -> bool {
        // Every subscription serialises its own copy of the batch.
        let values: Vec<Value> = items
            .iter()
            .filter_map(|item| match serde_json::to_value(item) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(
                        event = events::PAYLOAD_BUILD_FAILED,
                        component = COMPONENT,
                        subscription_id = setup.subscription_id.as_str(),
                        err = %err,
                        "dropping entity that cannot be encoded"
                    );
                    None
                }
            })
            .collect();

        let limit = (!setup.is_dataset_scoped()).then_some(self.default_max_elements);
        let chunks = split_into_chunks(values, limit);
        let chunk_count = chunks.len();
        let contents = chunks
            .into_iter()
            .enumerate()
            .map(|(index, items)| DeliveryContent::Entities {
                kind,
                items,
                more_data: index + 1 < chunk_count,
            })
            .collect();
        self.submit(setup, contents)
    }

    pub fn send_heartbeat(&self, setup: Arc<OutboundSubscriptionSetup>) -> bool {
        self.submit(setup, vec![DeliveryContent::Heartbeat])
    }

    pub fn send_termination(&self, setup: Arc<OutboundSubscriptionSetup>) -> bool {
        self.submit(setup, vec![DeliveryContent::Termination])
    }

    fn submit(&self, setup: Arc<OutboundSubscriptionSetup>, contents: Vec<DeliveryContent>) -> bool {
        if contents.is_empty() {
            return false;
        }

        let mut payloads = Vec::with_capacity(contents.len());
        for content in &contents {
            match self.builder.build(&setup, content) {
                Ok(payload) => payloads.push(payload),
                Err(err) => {
                    warn!(
                        event = events::PAYLOAD_BUILD_FAILED,
                        component = COMPONENT,
                        subscription_id = setup.subscription_id.as_str(),
                        content = content.label(),
                        err = %err,
                        "failed to build push payload"
                    );
                    return false;
                }
            }
        }

        let subscription_id = setup.subscription_id.clone();
        let registry = self.registry.clone();
        let transport = self.transport.clone();
        let job = Self::execute(registry, transport, setup, payloads).boxed();
        self.pool.submit(&subscription_id, job)
    }

    async fn execute(
        registry: Arc<SubscriptionRegistry>,
        transport: Arc<dyn PushTransport>,
        setup: Arc<OutboundSubscriptionSetup>,
        payloads: Vec<PushPayload>,
    ) {
        let chunks = payloads.len();
        for (index, payload) in payloads.iter().enumerate() {
            if tracing::enabled!(Level::DEBUG) {
                debug!(
                    event = events::PUSH_SEND_ATTEMPT,
                    component = COMPONENT,
                    subscription_id = setup.subscription_id.as_str(),
                    address = setup.consumer_address.as_str(),
                    chunk = index + 1,
                    chunks,
                    bytes = payload.body.len(),
                    "attempting push"
                );
            }

            if let Err(err) = transport.post(&setup.consumer_address, payload).await {
                warn!(
                    event = events::PUSH_SEND_FAILED,
                    component = COMPONENT,
                    subscription_id = setup.subscription_id.as_str(),
                    address = setup.consumer_address.as_str(),
                    chunk = index + 1,
                    chunks,
                    err = %err,
                    "push failed"
                );
                Self::handle_failure(&registry, &setup, &err, Instant::now());
                return;
            }
        }

        Self::handle_success(&registry, &setup.subscription_id);
    }

    /// Records a failed push and cancels the subscription once its grace period is exceeded.
    pub fn handle_failure(
        registry: &SubscriptionRegistry,
        setup: &OutboundSubscriptionSetup,
        err: &PushError,
        now: Instant,
    ) -> FailureOutcome {
        let subscription_id = setup.subscription_id.as_str();
        let fail_tracker = registry.fail_tracker();
        if !registry.contains(subscription_id) {
            fail_tracker.clear(subscription_id);
            return FailureOutcome::Ignored;
        }

        let first_failure = fail_tracker.record_failure(subscription_id, now);
        if !registry.contains(subscription_id) {
            // terminated between the check and the record
            fail_tracker.clear(subscription_id);
            return FailureOutcome::Ignored;
        }
        let failing_for = now.saturating_duration_since(first_failure);
        let grace = grace_period(setup.heartbeat_interval());
        if !fail_tracker.exceeded(subscription_id, grace, now) {
            return FailureOutcome::Degraded { failing_for };
        }

        registry.terminate(subscription_id);
        warn!(
            event = events::SUBSCRIPTION_AUTO_CANCELLED,
            component = COMPONENT,
            subscription_id,
            address = setup.consumer_address.as_str(),
            failing_for_ms = fields::duration_ms(failing_for),
            grace_ms = fields::duration_ms(grace),
            err = %err,
            "subscription cancelled after continuous delivery failures"
        );
        FailureOutcome::Cancelled
    }

    pub fn handle_success(registry: &SubscriptionRegistry, subscription_id: &str) {
        if registry.fail_tracker().clear(subscription_id) {
            info!(
                event = events::SUBSCRIPTION_RECOVERED,
                component = COMPONENT,
                subscription_id,
                "delivery recovered"
            );
        }
    }

    /// Stops accepting pushes and waits for queued ones.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
