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

//! # siri-hub
//!
//! `siri-hub` ingests SIRI real-time updates (situations, vehicle activity, estimated
//! journeys, stop visits, general messages, facility conditions) from many providers,
//! deduplicates and expires them, and serves them to consumers by polling or by push
//! subscription.
//!
//! Typical usage goes through [`SiriHub`]: ingest through a [`KindEngine`], poll with
//! [`KindEngine::poll`], and register push consumers with [`SiriHub::subscribe`].
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use siri_hub::{
//!     PushError, PushPayload, PushTransport, ReadRequest, SiriHub, VehicleActivity,
//! };
//!
//! struct Discard;
//!
//! #[async_trait]
//! impl PushTransport for Discard {
//!     async fn post(&self, _address: &str, _payload: &PushPayload) -> Result<(), PushError> {
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let hub = SiriHub::builder(Arc::new(Discard)).build(&tokio::runtime::Handle::current());
//!
//! let request = ReadRequest::for_dataset("RUT");
//! assert!(!hub.vehicles().poll("consumer", &request).known_consumer);
//!
//! hub.vehicles().ingest(
//!     "RUT",
//!     vec![VehicleActivity {
//!         vehicle_ref: Some("123".to_string()),
//!         ..Default::default()
//!     }],
//! );
//! hub.flush_trackers();
//!
//! assert_eq!(hub.vehicles().poll("consumer", &request).items.len(), 1);
//! hub.shutdown().await;
//! # });
//! ```
//!
//! ## Layers
//!
//! - `storage`: the [`KeyedTtlStore`] contract every piece of shared state goes through,
//!   plus the in-process backend.
//! - `model`: record keys, kinds, filters and the SIRI entities.
//! - `entity`: per-kind [`EntityProfile`]s and the generic [`EntityStore`].
//! - `tracking`: dirty buffer and per-consumer [`ChangeTracker`].
//! - `delivery`: subscriptions, fail tracking, payload building and the push pool.
//! - `runtime`: interval loops with shutdown.
//! - `hub`: the [`SiriHub`] facade.
//!
//! ## Observability model
//!
//! Every log line is a `tracing` event carrying an `event` name from
//! `observability::events` and a `component`. Library code never installs a global
//! subscriber; binaries and tests initialise `tracing_subscriber` once.

mod config;
mod delivery;
mod entity;
mod hub;
mod metrics;
mod model;
#[doc(hidden)]
pub mod observability;
mod paging;
mod runtime;
mod storage;
mod tracking;

pub use config::{ConfigError, ExpirationOverride, HubConfig};
pub use delivery::{
    grace_period, DeliveryContent, DeliveryDispatcher, DispatcherSettings, FailTracker,
    FailureOutcome, HeartbeatScheduler, JsonServiceDeliveryBuilder, OutboundSubscriptionSetup,
    PayloadError, PushError, PushJob, PushPayload, PushTransport, PushWorkerPool,
    ServiceDeliveryBuilder, SubscribeRejection, SubscribeResponse, SubscriptionRegistry,
    SubscriptionRequest, SubscriptionState, SubscriptionStatus, JSON_CONTENT_TYPE,
    SUBSCRIPTION_ID_HEADER,
};
pub use entity::{
    fingerprint, ChecksumError, EntityProfile, EntityStore, Envelope, EstimatedJourneyProfile,
    Expiration, ExpirationPolicy, FacilityConditionProfile, InfoMessageProfile,
    SituationProfile, StopVisitProfile, UpsertResult, UpsertSummary, VehicleActivityProfile,
};
pub use hub::{KindEngine, SiriHub, SiriHubBuilder};
pub use metrics::{IngestTotals, MetricsSink, TracingMetricsSink};
pub use model::{
    EntityFilter, EstimatedVehicleJourney, FacilityCondition, FilterDimension, InfoMessage,
    JourneyCall, Location, MonitoredStopVisit, PtSituationElement, RecordKey, SiriDataKind,
    ValidityPeriod, VehicleActivity,
};
pub use paging::{split_into_chunks, take_page};
pub use runtime::spawn_periodic;
pub use storage::{
    Compute, ExpiryMaintenance, InMemoryStoreProvider, InMemoryTtlStore, KeyedTtlStore,
    StoreProvider,
};
pub use tracking::{ChangeTracker, ConsumerChangeSet, DirtyBuffer, ReadRequest, ReadResult};
