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

//! Vehicle monitoring activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Last known position and progress of one monitored vehicle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleActivity {
    pub recorded_at_time: Option<DateTime<Utc>>,
    /// Rolling freshness stamp; refreshed by producers on every poll.
    pub valid_until_time: Option<DateTime<Utc>>,
    pub vehicle_ref: Option<String>,
    pub line_ref: Option<String>,
    pub direction_ref: Option<String>,
    pub dated_vehicle_journey_ref: Option<String>,
    pub operator_ref: Option<String>,
    pub data_source: Option<String>,
    pub origin_ref: Option<String>,
    pub destination_ref: Option<String>,
    pub location: Option<Location>,
    pub bearing: Option<f64>,
    pub delay_seconds: Option<i64>,
    pub monitored: Option<bool>,
    pub occupancy: Option<String>,
    pub monitored_call_stop_ref: Option<String>,
}
