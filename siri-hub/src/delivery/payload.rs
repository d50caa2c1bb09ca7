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

//! Push payload construction.

use crate::delivery::subscription::OutboundSubscriptionSetup;
use crate::model::SiriDataKind;
use chrono::Utc;
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const SUBSCRIPTION_ID_HEADER: &str = "X-Subscription-Id";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// What one push carries.
#[derive(Clone, Debug, PartialEq)]
pub enum DeliveryContent {
    Entities {
        kind: SiriDataKind,
        items: Vec<Value>,
        /// More chunks of the same change batch follow.
        more_data: bool,
    },
    Heartbeat,
    Termination,
}

impl DeliveryContent {
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryContent::Entities { .. } => "service_delivery",
            DeliveryContent::Heartbeat => "heartbeat",
            DeliveryContent::Termination => "termination",
        }
    }
}

/// Encoded body plus transport headers.
#[derive(Clone, Debug, PartialEq)]
pub struct PushPayload {
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug)]
pub enum PayloadError {
    Encode(serde_json::Error),
}

impl Display for PayloadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::Encode(err) => write!(f, "failed to encode push payload: {err}"),
        }
    }
}

impl Error for PayloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PayloadError::Encode(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        PayloadError::Encode(err)
    }
}

/// Turns delivery content into the bytes posted to a subscriber.
pub trait ServiceDeliveryBuilder: Send + Sync {
    fn build(
        &self,
        setup: &OutboundSubscriptionSetup,
        content: &DeliveryContent,
    ) -> Result<PushPayload, PayloadError>;
}

/// JSON rendition of SIRI service deliveries and notifications.
#[derive(Clone, Debug)]
pub struct JsonServiceDeliveryBuilder {
    producer_ref: String,
}

impl JsonServiceDeliveryBuilder {
    pub fn new(producer_ref: impl Into<String>) -> Self {
        Self {
            producer_ref: producer_ref.into(),
        }
    }
}

impl ServiceDeliveryBuilder for JsonServiceDeliveryBuilder {
    fn build(
        &self,
        setup: &OutboundSubscriptionSetup,
        content: &DeliveryContent,
    ) -> Result<PushPayload, PayloadError> {
        let response_timestamp = Utc::now().to_rfc3339();
        let document = match content {
            DeliveryContent::Entities {
                kind,
                items,
                more_data,
            } => json!({
                "serviceDelivery": {
                    "responseTimestamp": response_timestamp,
                    "producerRef": self.producer_ref,
                    "subscriptionRef": setup.subscription_id,
                    "requestorRef": setup.requestor_ref,
                    "moreData": more_data,
                    "kind": kind,
                    "items": items,
                }
            }),
            DeliveryContent::Heartbeat => json!({
                "heartbeatNotification": {
                    "responseTimestamp": response_timestamp,
                    "producerRef": self.producer_ref,
                    "subscriptionRef": setup.subscription_id,
                    "status": true,
                }
            }),
            DeliveryContent::Termination => json!({
                "subscriptionTerminatedNotification": {
                    "responseTimestamp": response_timestamp,
                    "producerRef": self.producer_ref,
                    "subscriptionRef": setup.subscription_id,
                }
            }),
        };

        Ok(PushPayload {
            body: serde_json::to_vec(&document)?,
            content_type: JSON_CONTENT_TYPE,
            headers: vec![(
                SUBSCRIPTION_ID_HEADER.to_string(),
                setup.subscription_id.clone(),
            )],
        })
    }
}
