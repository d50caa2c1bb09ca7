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

//! First-failure bookkeeping for push subscriptions.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

const MIN_GRACE_PERIOD: Duration = Duration::from_secs(5 * 60);

/// How long a subscription may keep failing before it is cancelled.
pub fn grace_period(heartbeat_interval: Duration) -> Duration {
    heartbeat_interval.saturating_mul(3).max(MIN_GRACE_PERIOD)
}

/// Remembers when each subscription started failing. Cleared by the next success.
#[derive(Debug, Default)]
pub struct FailTracker {
    first_failures: Mutex<HashMap<String, Instant>>,
}

impl FailTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure and returns when the current failure streak started.
    pub fn record_failure(&self, subscription_id: &str, now: Instant) -> Instant {
        *self
            .first_failures
            .lock()
            .entry(subscription_id.to_string())
            .or_insert(now)
    }

    /// Returns `true` when a failure streak was pending.
    pub fn clear(&self, subscription_id: &str) -> bool {
        self.first_failures.lock().remove(subscription_id).is_some()
    }

    pub fn first_failure(&self, subscription_id: &str) -> Option<Instant> {
        self.first_failures.lock().get(subscription_id).copied()
    }

    pub fn failing_for(&self, subscription_id: &str, now: Instant) -> Option<Duration> {
        self.first_failure(subscription_id)
            .map(|first| now.saturating_duration_since(first))
    }

    /// Strictly longer than `grace` since the first failure.
    pub fn exceeded(&self, subscription_id: &str, grace: Duration, now: Instant) -> bool {
        self.failing_for(subscription_id, now)
            .is_some_and(|failing_for| failing_for > grace)
    }

    /// Drops streaks of subscriptions `keep` rejects. Returns how many were dropped.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let mut first_failures = self.first_failures.lock();
        let before = first_failures.len();
        first_failures.retain(|subscription_id, _| keep(subscription_id));
        before - first_failures.len()
    }

    pub fn len(&self) -> usize {
        self.first_failures.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_failures.lock().is_empty()
    }
}
