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

use crate::config::HubConfig;
use crate::delivery::{
    DeliveryDispatcher, HeartbeatScheduler, JsonServiceDeliveryBuilder, PushTransport,
    ServiceDeliveryBuilder, SubscribeResponse, SubscriptionRegistry, SubscriptionRequest,
    SubscriptionStatus,
};
use crate::entity::{
    EntityProfile, EstimatedJourneyProfile, ExpirationPolicy, FacilityConditionProfile,
    InfoMessageProfile, SituationProfile, StopVisitProfile, UpsertSummary,
    VehicleActivityProfile,
};
use crate::hub::kind_engine::KindEngine;
use crate::metrics::{MetricsSink, TracingMetricsSink};
use crate::model::SiriDataKind;
use crate::observability::{events, fields};
use crate::runtime::spawn_periodic;
use crate::storage::{InMemoryStoreProvider, StoreProvider};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

const COMPONENT: &str = "siri_hub";

type PurgeFn = Arc<dyn Fn() -> usize + Send + Sync>;

/// Assembles a [`SiriHub`]. Only the push transport is mandatory.
pub struct SiriHubBuilder {
    config: HubConfig,
    transport: Arc<dyn PushTransport>,
    delivery_builder: Option<Arc<dyn ServiceDeliveryBuilder>>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl SiriHubBuilder {
    pub fn new(transport: Arc<dyn PushTransport>) -> Self {
        Self {
            config: HubConfig::default(),
            transport,
            delivery_builder: None,
            metrics: None,
        }
    }

    pub fn with_config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_delivery_builder(mut self, builder: Arc<dyn ServiceDeliveryBuilder>) -> Self {
        self.delivery_builder = Some(builder);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds on the in-process store backend.
    pub fn build(self, handle: &Handle) -> SiriHub {
        self.build_with_provider(handle, Arc::new(InMemoryStoreProvider::new()))
    }

    pub fn build_with_provider<S>(self, handle: &Handle, provider: Arc<S>) -> SiriHub
    where
        S: StoreProvider + Send + Sync + 'static,
    {
        let config = self.config;
        let delivery_builder = self.delivery_builder.unwrap_or_else(|| {
            Arc::new(JsonServiceDeliveryBuilder::new(config.producer_ref.clone()))
        });
        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(TracingMetricsSink::new()));

        let registry = Arc::new(SubscriptionRegistry::new(provider.as_ref()));
        let dispatcher = Arc::new(DeliveryDispatcher::new(
            handle,
            registry.clone(),
            self.transport,
            delivery_builder,
            config.dispatcher_settings(),
        ));
        let heartbeat = Arc::new(HeartbeatScheduler::new(dispatcher.clone()));

        let engines = EngineParts {
            provider: provider.as_ref(),
            config: &config,
            dispatcher: &dispatcher,
            metrics: &metrics,
            handle,
        };
        let situations = engines.build(SituationProfile::new, SiriDataKind::SituationExchange);
        let vehicles = engines.build(VehicleActivityProfile::new, SiriDataKind::VehicleMonitoring);
        let estimated_journeys =
            engines.build(EstimatedJourneyProfile::new, SiriDataKind::EstimatedTimetable);
        let stop_visits = engines.build(StopVisitProfile::new, SiriDataKind::StopMonitoring);
        let general_messages =
            engines.build(InfoMessageProfile::new, SiriDataKind::GeneralMessage);
        let facilities =
            engines.build(FacilityConditionProfile::new, SiriDataKind::FacilityMonitoring);

        let purge_provider = provider.clone();
        let (shutdown_tx, _) = watch::channel(false);
        SiriHub {
            situations,
            vehicles,
            estimated_journeys,
            stop_visits,
            general_messages,
            facilities,
            purge: Arc::new(move || purge_provider.purge_expired()),
            registry,
            dispatcher,
            heartbeat,
            config,
            handle: handle.clone(),
            shutdown_tx,
            started: AtomicBool::new(false),
            background: Mutex::new(Vec::new()),
        }
    }
}

/// Shared ingredients of the six kind engines.
struct EngineParts<'a, S> {
    provider: &'a S,
    config: &'a HubConfig,
    dispatcher: &'a Arc<DeliveryDispatcher>,
    metrics: &'a Arc<dyn MetricsSink>,
    handle: &'a Handle,
}

impl<S: StoreProvider> EngineParts<'_, S> {
    fn build<P: EntityProfile>(
        &self,
        profile: impl FnOnce(ExpirationPolicy) -> P,
        kind: SiriDataKind,
    ) -> Arc<KindEngine<P>> {
        Arc::new(KindEngine::new(
            profile(self.config.expiration_policy(kind)),
            self.provider,
            self.config.tracking_period(),
            self.dispatcher.clone(),
            self.metrics.clone(),
            self.handle.clone(),
        ))
    }
}

/// The hub facade: one engine per SIRI kind sharing a subscription registry and dispatcher.
///
/// Nothing runs in the background until [`SiriHub::start`]; [`SiriHub::shutdown`] stops
/// the loops, flushes every tracker and drains queued pushes.
pub struct SiriHub {
    situations: Arc<KindEngine<SituationProfile>>,
    vehicles: Arc<KindEngine<VehicleActivityProfile>>,
    estimated_journeys: Arc<KindEngine<EstimatedJourneyProfile>>,
    stop_visits: Arc<KindEngine<StopVisitProfile>>,
    general_messages: Arc<KindEngine<InfoMessageProfile>>,
    facilities: Arc<KindEngine<FacilityConditionProfile>>,
    purge: PurgeFn,
    registry: Arc<SubscriptionRegistry>,
    dispatcher: Arc<DeliveryDispatcher>,
    heartbeat: Arc<HeartbeatScheduler>,
    config: HubConfig,
    handle: Handle,
    shutdown_tx: watch::Sender<bool>,
    started: AtomicBool,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl SiriHub {
    pub fn builder(transport: Arc<dyn PushTransport>) -> SiriHubBuilder {
        SiriHubBuilder::new(transport)
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn situations(&self) -> &Arc<KindEngine<SituationProfile>> {
        &self.situations
    }

    pub fn vehicles(&self) -> &Arc<KindEngine<VehicleActivityProfile>> {
        &self.vehicles
    }

    pub fn estimated_journeys(&self) -> &Arc<KindEngine<EstimatedJourneyProfile>> {
        &self.estimated_journeys
    }

    pub fn stop_visits(&self) -> &Arc<KindEngine<StopVisitProfile>> {
        &self.stop_visits
    }

    pub fn general_messages(&self) -> &Arc<KindEngine<InfoMessageProfile>> {
        &self.general_messages
    }

    pub fn facilities(&self) -> &Arc<KindEngine<FacilityConditionProfile>> {
        &self.facilities
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<DeliveryDispatcher> {
        &self.dispatcher
    }

    /// Spawns the committers, heartbeat scan, subscription refresh and store purge.
    /// Calling it again is a no-op.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let commit_interval = self.config.commit_interval();
        let mut tasks = vec![
            self.spawn_committer(&self.situations, "commit-situations"),
            self.spawn_committer(&self.vehicles, "commit-vehicles"),
            self.spawn_committer(&self.estimated_journeys, "commit-estimated-journeys"),
            self.spawn_committer(&self.stop_visits, "commit-stop-visits"),
            self.spawn_committer(&self.general_messages, "commit-general-messages"),
            self.spawn_committer(&self.facilities, "commit-facilities"),
        ];

        let heartbeat = self.heartbeat.clone();
        tasks.push(spawn_periodic(
            &self.handle,
            "heartbeat-scan",
            self.config.heartbeat_scan_interval(),
            self.shutdown_tx.subscribe(),
            move || {
                heartbeat.scan(Instant::now());
            },
        ));

        let registry = self.registry.clone();
        tasks.push(spawn_periodic(
            &self.handle,
            "subscription-refresh",
            self.config.subscription_refresh_interval(),
            self.shutdown_tx.subscribe(),
            move || {
                registry.refresh();
            },
        ));

        let purge = self.purge.clone();
        tasks.push(spawn_periodic(
            &self.handle,
            "store-purge",
            self.config.store_purge_interval(),
            self.shutdown_tx.subscribe(),
            move || {
                purge();
            },
        ));

        let task_count = tasks.len();
        self.background.lock().extend(tasks);
        info!(
            event = events::HUB_STARTED,
            component = COMPONENT,
            tasks = task_count,
            commit_interval_ms = fields::duration_ms(commit_interval),
            "hub started"
        );
    }

    fn spawn_committer<P: EntityProfile>(
        &self,
        engine: &Arc<KindEngine<P>>,
        name: &'static str,
    ) -> JoinHandle<()> {
        let engine = engine.clone();
        spawn_periodic(
            &self.handle,
            name,
            self.config.commit_interval(),
            self.shutdown_tx.subscribe(),
            move || {
                engine.commit();
            },
        )
    }

    /// Ingests loosely typed items of any kind, as read from replay files or a
    /// generic endpoint.
    pub fn ingest_json(
        &self,
        kind: SiriDataKind,
        dataset_id: &str,
        items: Vec<Value>,
    ) -> UpsertSummary {
        match kind {
            SiriDataKind::SituationExchange => self.situations.ingest_json(dataset_id, items),
            SiriDataKind::VehicleMonitoring => self.vehicles.ingest_json(dataset_id, items),
            SiriDataKind::EstimatedTimetable => {
                self.estimated_journeys.ingest_json(dataset_id, items)
            }
            SiriDataKind::StopMonitoring => self.stop_visits.ingest_json(dataset_id, items),
            SiriDataKind::GeneralMessage => self.general_messages.ingest_json(dataset_id, items),
            SiriDataKind::FacilityMonitoring => self.facilities.ingest_json(dataset_id, items),
        }
    }

    /// Registers a push subscription and, for kinds that need one, schedules the
    /// initial snapshot.
    pub fn subscribe(&self, request: SubscriptionRequest) -> SubscribeResponse {
        let response = self.registry.subscribe(request);
        if response.accepted && response.initial_snapshot {
            if let Some(setup) = self.registry.get(&response.subscription_id) {
                match setup.kind {
                    SiriDataKind::SituationExchange => self.situations.deliver_snapshot(setup),
                    SiriDataKind::VehicleMonitoring => self.vehicles.deliver_snapshot(setup),
                    SiriDataKind::EstimatedTimetable => {
                        self.estimated_journeys.deliver_snapshot(setup)
                    }
                    SiriDataKind::StopMonitoring => self.stop_visits.deliver_snapshot(setup),
                    SiriDataKind::GeneralMessage => self.general_messages.deliver_snapshot(setup),
                    SiriDataKind::FacilityMonitoring => self.facilities.deliver_snapshot(setup),
                }
            }
        }
        response
    }

    /// Removes a subscription, optionally acknowledging it to the consumer.
    /// Returns `false` when no such subscription exists.
    pub fn terminate(&self, subscription_id: &str, send_response: bool) -> bool {
        let Some(setup) = self.registry.terminate(subscription_id) else {
            return false;
        };
        if send_response && !self.dispatcher.send_termination(setup) {
            warn!(
                event = events::PAYLOAD_BUILD_FAILED,
                component = COMPONENT,
                subscription_id,
                "termination notice could not be queued"
            );
        }
        true
    }

    pub fn subscription_status(&self) -> Vec<SubscriptionStatus> {
        self.registry.status(Instant::now())
    }

    /// Drops every record of `dataset_id`, for one kind or for all of them.
    pub fn clear_dataset(&self, kind: Option<SiriDataKind>, dataset_id: &str) -> usize {
        let selected = |candidate: SiriDataKind| kind.map_or(true, |kind| kind == candidate);
        let mut cleared = 0;
        if selected(SiriDataKind::SituationExchange) {
            cleared += self.situations.clear_dataset(dataset_id);
        }
        if selected(SiriDataKind::VehicleMonitoring) {
            cleared += self.vehicles.clear_dataset(dataset_id);
        }
        if selected(SiriDataKind::EstimatedTimetable) {
            cleared += self.estimated_journeys.clear_dataset(dataset_id);
        }
        if selected(SiriDataKind::StopMonitoring) {
            cleared += self.stop_visits.clear_dataset(dataset_id);
        }
        if selected(SiriDataKind::GeneralMessage) {
            cleared += self.general_messages.clear_dataset(dataset_id);
        }
        if selected(SiriDataKind::FacilityMonitoring) {
            cleared += self.facilities.clear_dataset(dataset_id);
        }
        cleared
    }

    /// Commits every buffered change to the pollers now.
    pub fn flush_trackers(&self) -> usize {
        self.situations.flush()
            + self.vehicles.flush()
            + self.estimated_journeys.flush()
            + self.stop_visits.flush()
            + self.general_messages.flush()
            + self.facilities.flush()
    }

    /// Stops background loops, flushes the trackers and waits for queued pushes.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);

        let tasks: Vec<_> = std::mem::take(&mut *self.background.lock());
        for task in tasks {
            if let Err(err) = task.await {
                warn!(
                    event = events::PERIODIC_TASK_STOPPED,
                    component = COMPONENT,
                    err = %err,
                    "background task ended abnormally"
                );
            }
        }

        let flushed = self.flush_trackers();
        self.dispatcher.close().await;
        info!(
            event = events::HUB_SHUTDOWN,
            component = COMPONENT,
            flushed,
            "hub stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::SiriHub;
    use crate::config::HubConfig;
    use crate::delivery::{PushError, PushPayload, PushTransport, SubscriptionRequest};
    use crate::model::{SiriDataKind, VehicleActivity};
    use crate::tracking::ReadRequest;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    struct NullTransport;

    #[async_trait]
    impl PushTransport for NullTransport {
        async fn post(&self, _address: &str, _payload: &PushPayload) -> Result<(), PushError> {
            Ok(())
        }
    }

    fn hub() -> SiriHub {
        SiriHub::builder(Arc::new(NullTransport)).build(&Handle::current())
    }

    #[tokio::test]
    async fn ingest_json_routes_to_the_kind_engine() {
        let hub = hub();

        let summary = hub.ingest_json(
            SiriDataKind::VehicleMonitoring,
            "RUT",
            vec![json!({"vehicleRef": "123", "lineRef": "RUT:Line:1"})],
        );

        assert_eq!(summary.added_or_updated, 1);
        assert_eq!(hub.vehicles().get_all(Some("RUT")).len(), 1);
        assert!(hub.stop_visits().get_all(None).is_empty());
    }

    #[tokio::test]
    async fn clear_dataset_can_target_one_kind_or_all() {
        let hub = hub();
        hub.ingest_json(
            SiriDataKind::VehicleMonitoring,
            "RUT",
            vec![json!({"vehicleRef": "123"})],
        );
        hub.ingest_json(
            SiriDataKind::GeneralMessage,
            "RUT",
            vec![json!({"infoMessageIdentifier": "gm-1"})],
        );

        assert_eq!(hub.clear_dataset(Some(SiriDataKind::GeneralMessage), "RUT"), 1);
        assert_eq!(hub.vehicles().get_all(Some("RUT")).len(), 1);
        assert_eq!(hub.clear_dataset(None, "RUT"), 1);
        assert!(hub.vehicles().get_all(Some("RUT")).is_empty());
    }

    #[tokio::test]
    async fn terminate_reports_unknown_subscriptions() {
        let hub = hub();
        let response = hub.subscribe(
            SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://consumer/vm")
                .with_subscription_id("vm-1"),
        );
        assert!(response.accepted);
        assert!(!response.initial_snapshot);

        assert!(hub.terminate("vm-1", false));
        assert!(!hub.terminate("vm-1", false));
        assert!(hub.subscription_status().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn started_committers_publish_and_shutdown_flushes() {
        let config = HubConfig {
            commit_interval_ms: 100,
            ..HubConfig::default()
        };
        let hub = SiriHub::builder(Arc::new(NullTransport))
            .with_config(config)
            .build(&Handle::current());
        hub.start();
        hub.start();

        let request = ReadRequest::for_dataset("RUT");
        hub.vehicles().poll("poller", &request);

        hub.vehicles().ingest(
            "RUT",
            vec![VehicleActivity {
                vehicle_ref: Some("123".to_string()),
                ..Default::default()
            }],
        );
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(hub.vehicles().poll("poller", &request).items.len(), 1);

        hub.vehicles().ingest(
            "RUT",
            vec![VehicleActivity {
                vehicle_ref: Some("456".to_string()),
                ..Default::default()
            }],
        );
        hub.shutdown().await;
        assert_eq!(hub.vehicles().tracker().buffered(), 0);
        assert_eq!(hub.vehicles().tracker().pending_count("poller"), Some(1));
    }
}
