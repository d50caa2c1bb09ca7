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

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use siri_hub::{PushError, PushPayload, PushTransport, SUBSCRIPTION_ID_HEADER};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// One post seen by [`RecordingPushTransport`], decoded back to JSON.
#[derive(Clone, Debug)]
pub struct RecordedPost {
    pub address: String,
    pub subscription_id: Option<String>,
    pub body: Value,
    /// `false` when the transport was failing at the time of the post.
    pub delivered: bool,
}

impl RecordedPost {
    pub fn is_service_delivery(&self) -> bool {
        self.body.get("serviceDelivery").is_some()
    }

    pub fn is_heartbeat(&self) -> bool {
        self.body.get("heartbeatNotification").is_some()
    }

    pub fn is_termination(&self) -> bool {
        self.body.get("subscriptionTerminatedNotification").is_some()
    }

    /// Entities carried by a service delivery; empty for notifications.
    pub fn items(&self) -> Vec<Value> {
        self.body["serviceDelivery"]["items"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }

    pub fn more_data(&self) -> bool {
        self.body["serviceDelivery"]["moreData"]
            .as_bool()
            .unwrap_or(false)
    }
}

/// Push transport that keeps every post in memory and can be switched to failing.
#[derive(Default)]
pub struct RecordingPushTransport {
    posts: Mutex<Vec<RecordedPost>>,
    failing: AtomicBool,
    posted: Notify,
}

impl RecordingPushTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following post fail as unreachable until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().clone()
    }

    pub fn delivered(&self) -> Vec<RecordedPost> {
        self.posts
            .lock()
            .iter()
            .filter(|post| post.delivered)
            .cloned()
            .collect()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().len()
    }

    pub fn clear(&self) {
        self.posts.lock().clear();
    }

    /// Waits until at least `count` posts were recorded. Returns `false` on timeout.
    pub async fn wait_for_posts(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.posted.notified();
                if self.post_count() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

#[async_trait]
impl PushTransport for RecordingPushTransport {
    async fn post(&self, address: &str, payload: &PushPayload) -> Result<(), PushError> {
        let failing = self.failing.load(Ordering::SeqCst);
        let subscription_id = payload
            .headers
            .iter()
            .find(|(name, _)| name == SUBSCRIPTION_ID_HEADER)
            .map(|(_, value)| value.clone());
        let body = serde_json::from_slice(&payload.body).unwrap_or(Value::Null);
        debug!(address, ?subscription_id, failing, "recording push");

        self.posts.lock().push(RecordedPost {
            address: address.to_string(),
            subscription_id,
            body,
            delivered: !failing,
        });
        self.posted.notify_waiters();

        if failing {
            Err(PushError::Unreachable(address.to_string()))
        } else {
            Ok(())
        }
    }
}
