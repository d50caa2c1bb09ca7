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

//! Per-kind time-to-live rules.

use crate::model::SiriDataKind;
use chrono::{DateTime, Utc};
use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Outcome of evaluating an [`ExpirationPolicy`] for one entity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Expiration {
    /// The entity is no longer valid and must not be stored.
    Expired,
    /// Keep the entity for this long.
    After(Duration),
}

/// TTL rule: validity end plus a grace period, or a fixed horizon without validity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExpirationPolicy {
    pub grace: Duration,
    pub horizon: Duration,
}

impl ExpirationPolicy {
    pub const fn new(grace: Duration, horizon: Duration) -> Self {
        Self { grace, horizon }
    }

    pub fn default_for(kind: SiriDataKind) -> Self {
        let (grace, horizon) = match kind {
            SiriDataKind::VehicleMonitoring => (0, HOUR),
            SiriDataKind::StopMonitoring => (5 * MINUTE, 6 * HOUR),
            SiriDataKind::EstimatedTimetable => (10 * MINUTE, 12 * HOUR),
            SiriDataKind::SituationExchange => (6 * HOUR, 365 * DAY),
            SiriDataKind::GeneralMessage => (0, 7 * DAY),
            SiriDataKind::FacilityMonitoring => (0, 30 * DAY),
        };
        Self::new(Duration::from_secs(grace), Duration::from_secs(horizon))
    }

    pub fn evaluate(&self, validity_end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Expiration {
        let Some(validity_end) = validity_end else {
            return Expiration::After(self.horizon);
        };
        let remaining = validity_end.signed_duration_since(now);
        let grace = chrono::Duration::from_std(self.grace).unwrap_or(chrono::Duration::MAX);
        match remaining.checked_add(&grace).map(|ttl| ttl.to_std()) {
            Some(Ok(ttl)) if !ttl.is_zero() => Expiration::After(ttl),
            Some(_) => Expiration::Expired,
            None => Expiration::After(self.horizon),
        }
    }

    pub fn expires_at(&self, expiration: Expiration, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match expiration {
            Expiration::Expired => None,
            Expiration::After(ttl) => chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl)),
        }
    }
}
