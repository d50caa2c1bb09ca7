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

//! Stop monitoring visit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One expected or recorded call of a vehicle journey at a monitored stop.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitoredStopVisit {
    pub recorded_at_time: Option<DateTime<Utc>>,
    pub valid_until_time: Option<DateTime<Utc>>,
    pub item_identifier: Option<String>,
    pub monitoring_ref: Option<String>,
    pub line_ref: Option<String>,
    pub direction_ref: Option<String>,
    pub dated_vehicle_journey_ref: Option<String>,
    pub vehicle_ref: Option<String>,
    pub operator_ref: Option<String>,
    pub destination_name: Option<String>,
    pub stop_point_ref: Option<String>,
    pub aimed_arrival_time: Option<DateTime<Utc>>,
    pub expected_arrival_time: Option<DateTime<Utc>>,
    pub aimed_departure_time: Option<DateTime<Utc>>,
    pub expected_departure_time: Option<DateTime<Utc>>,
    pub arrival_status: Option<String>,
    pub departure_status: Option<String>,
    pub cancellation: Option<bool>,
}

impl MonitoredStopVisit {
    /// Latest of the aimed and expected arrival/departure times.
    pub fn latest_call_time(&self) -> Option<DateTime<Utc>> {
        [
            self.aimed_arrival_time,
            self.expected_arrival_time,
            self.aimed_departure_time,
            self.expected_departure_time,
        ]
        .into_iter()
        .flatten()
        .max()
    }
}
