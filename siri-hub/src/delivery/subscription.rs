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

//! Push subscription descriptors, requests and rejections.

use crate::model::{EntityFilter, SiriDataKind};
use crate::observability::fields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// A registered push subscription.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundSubscriptionSetup {
    pub subscription_id: String,
    pub kind: SiriDataKind,
    pub consumer_address: String,
    pub dataset_id: Option<String>,
    pub filter: EntityFilter,
    pub heartbeat_interval_ms: u64,
    pub initial_termination_time: Option<DateTime<Utc>>,
    /// Names of value adapters the consumer asked for, passed through to payload builders.
    pub value_adapters: Vec<String>,
    pub update_interval_ms: Option<u64>,
    pub requestor_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OutboundSubscriptionSetup {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn update_interval(&self) -> Option<Duration> {
        self.update_interval_ms.map(Duration::from_millis)
    }

    pub fn is_dataset_scoped(&self) -> bool {
        self.dataset_id.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.initial_termination_time
            .is_some_and(|termination| termination <= now)
    }

    /// Global subscriptions match every dataset.
    pub fn matches(&self, kind: SiriDataKind, dataset_id: &str) -> bool {
        self.kind == kind
            && self
                .dataset_id
                .as_deref()
                .map_or(true, |scoped| scoped == dataset_id)
    }
}

fn default_heartbeat_interval_ms() -> u64 {
    0
}

/// Incoming subscribe request. Missing fields are validated by the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubscriptionRequest {
    #[serde(default)]
    pub subscription_id: Option<String>,
    pub kind: SiriDataKind,
    #[serde(default)]
    pub consumer_address: Option<String>,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub filter: EntityFilter,
    /// Zero disables heartbeats.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default)]
    pub initial_termination_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub value_adapters: Vec<String>,
    #[serde(default)]
    pub update_interval_ms: Option<u64>,
    #[serde(default)]
    pub requestor_ref: Option<String>,
}

impl SubscriptionRequest {
    pub fn new(kind: SiriDataKind, consumer_address: impl Into<String>) -> Self {
        Self {
            subscription_id: None,
            kind,
            consumer_address: Some(consumer_address.into()),
            dataset_id: None,
            filter: EntityFilter::default(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            initial_termination_time: None,
            value_adapters: Vec::new(),
            update_interval_ms: None,
            requestor_ref: None,
        }
    }

    pub fn with_subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    pub fn with_dataset_id(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_id = Some(dataset_id.into());
        self
    }

    pub fn with_filter(mut self, filter: EntityFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = fields::duration_ms(interval);
        self
    }

    pub fn with_termination_time(mut self, termination: DateTime<Utc>) -> Self {
        self.initial_termination_time = Some(termination);
        self
    }

    pub fn with_requestor_ref(mut self, requestor_ref: impl Into<String>) -> Self {
        self.requestor_ref = Some(requestor_ref.into());
        self
    }
}

/// Why a subscribe request was refused.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubscribeRejection {
    MissingAddress,
    TerminationTimeInPast {
        termination: DateTime<Utc>,
    },
    KindConflict {
        existing: SiriDataKind,
        requested: SiriDataKind,
    },
}

impl SubscribeRejection {
    /// Stable code reported back to the requestor.
    pub fn reason_code(&self) -> &'static str {
        match self {
            SubscribeRejection::MissingAddress => "missing-address",
            SubscribeRejection::TerminationTimeInPast { .. } => "already-expired-termination",
            SubscribeRejection::KindConflict { .. } => "kind-conflict",
        }
    }
}

impl Display for SubscribeRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscribeRejection::MissingAddress => write!(f, "consumer address is required"),
            SubscribeRejection::TerminationTimeInPast { termination } => {
                write!(f, "initial termination time {termination} is not in the future")
            }
            SubscribeRejection::KindConflict {
                existing,
                requested,
            } => write!(
                f,
                "subscription already exists for {existing}, cannot change it to {requested}"
            ),
        }
    }
}

impl Error for SubscribeRejection {}

#[derive(Clone, Debug, PartialEq)]
pub struct SubscribeResponse {
    pub subscription_id: String,
    pub accepted: bool,
    pub error: Option<SubscribeRejection>,
    /// The current state of the kind should be pushed to the new subscriber right away.
    pub initial_snapshot: bool,
}

impl SubscribeResponse {
    pub(crate) fn accepted(subscription_id: String, initial_snapshot: bool) -> Self {
        Self {
            subscription_id,
            accepted: true,
            error: None,
            initial_snapshot,
        }
    }

    pub(crate) fn rejected(subscription_id: String, rejection: SubscribeRejection) -> Self {
        Self {
            subscription_id,
            accepted: false,
            error: Some(rejection),
            initial_snapshot: false,
        }
    }
}

/// Delivery health as seen from the fail tracker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubscriptionState {
    Active,
    Degraded { failing_for: Duration },
}

#[derive(Clone, Debug)]
pub struct SubscriptionStatus {
    pub setup: Arc<OutboundSubscriptionSetup>,
    pub state: SubscriptionState,
}

#[cfg(test)]
mod tests {
    use super::{SubscribeRejection, SubscriptionRequest};
    use crate::model::SiriDataKind;
    use std::time::Duration;

    #[test]
    fn rejection_codes_are_stable() {
        assert_eq!(SubscribeRejection::MissingAddress.reason_code(), "missing-address");
        assert_eq!(
            SubscribeRejection::KindConflict {
                existing: SiriDataKind::SituationExchange,
                requested: SiriDataKind::VehicleMonitoring,
            }
            .to_string(),
            "subscription already exists for SITUATION_EXCHANGE, cannot change it to VEHICLE_MONITORING"
        );
    }

    #[test]
    fn requests_deserialize_with_defaults() {
        let request: SubscriptionRequest = serde_json::from_str(
            r#"{"kind":"VEHICLE_MONITORING","consumerAddress":"http://consumer/vm","filter":{"LINE_REF":["RUT:Line:1"]}}"#,
        )
        .expect("request should parse");

        assert_eq!(request.kind, SiriDataKind::VehicleMonitoring);
        assert_eq!(request.heartbeat_interval_ms, 0);
        assert!(!request.filter.is_empty());

        let built = SubscriptionRequest::new(SiriDataKind::VehicleMonitoring, "http://consumer/vm")
            .with_heartbeat_interval(Duration::from_secs(2));
        assert_eq!(built.heartbeat_interval_ms, 2000);
    }
}
