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

//! Estimated timetable journey.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JourneyCall {
    pub stop_point_ref: Option<String>,
    pub order: Option<u32>,
    pub aimed_arrival_time: Option<DateTime<Utc>>,
    pub expected_arrival_time: Option<DateTime<Utc>>,
    pub aimed_departure_time: Option<DateTime<Utc>>,
    pub expected_departure_time: Option<DateTime<Utc>>,
    pub cancellation: Option<bool>,
}

impl JourneyCall {
    fn latest_time(&self) -> Option<DateTime<Utc>> {
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

/// Real-time revision of one vehicle journey's timetable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EstimatedVehicleJourney {
    pub recorded_at_time: Option<DateTime<Utc>>,
    pub line_ref: Option<String>,
    pub direction_ref: Option<String>,
    pub dated_vehicle_journey_ref: Option<String>,
    pub data_frame_ref: Option<String>,
    pub vehicle_ref: Option<String>,
    pub operator_ref: Option<String>,
    pub data_source: Option<String>,
    pub cancellation: Option<bool>,
    pub extra_journey: Option<bool>,
    pub is_complete_stop_sequence: Option<bool>,
    pub recorded_calls: Vec<JourneyCall>,
    pub estimated_calls: Vec<JourneyCall>,
}

impl EstimatedVehicleJourney {
    /// Journey identity, qualified by its data frame when the journey is framed.
    pub fn journey_ref(&self) -> Option<String> {
        let journey = self.dated_vehicle_journey_ref.as_deref()?;
        Some(match self.data_frame_ref.as_deref() {
            Some(frame) => format!("{frame}:{journey}"),
            None => journey.to_string(),
        })
    }

    pub fn latest_call_time(&self) -> Option<DateTime<Utc>> {
        self.recorded_calls
            .iter()
            .chain(self.estimated_calls.iter())
            .filter_map(JourneyCall::latest_time)
            .max()
    }

    pub fn stop_point_refs(&self) -> impl Iterator<Item = &str> {
        self.recorded_calls
            .iter()
            .chain(self.estimated_calls.iter())
            .filter_map(|call| call.stop_point_ref.as_deref())
    }
}
