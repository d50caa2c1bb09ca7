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

use chrono::{Duration, Utc};
use siri_hub::{
    EstimatedVehicleJourney, InfoMessage, JourneyCall, Location, MonitoredStopVisit,
    PtSituationElement, ValidityPeriod, VehicleActivity,
};

pub const RUT: &str = "RUT";
pub const ATB: &str = "ATB";

/// A monitored vehicle recorded now and valid for five minutes.
pub fn vehicle_activity(vehicle_ref: &str, line_ref: &str) -> VehicleActivity {
    let now = Utc::now();
    VehicleActivity {
        recorded_at_time: Some(now),
        valid_until_time: Some(now + Duration::minutes(5)),
        vehicle_ref: Some(vehicle_ref.to_string()),
        line_ref: Some(line_ref.to_string()),
        dated_vehicle_journey_ref: Some(format!("{line_ref}:journey:{vehicle_ref}")),
        location: Some(Location {
            latitude: 59.91,
            longitude: 10.75,
        }),
        monitored: Some(true),
        ..Default::default()
    }
}

/// A stop visit departing ten minutes from now.
pub fn stop_visit(monitoring_ref: &str, item_identifier: &str) -> MonitoredStopVisit {
    let now = Utc::now();
    MonitoredStopVisit {
        recorded_at_time: Some(now),
        item_identifier: Some(item_identifier.to_string()),
        monitoring_ref: Some(monitoring_ref.to_string()),
        stop_point_ref: Some(monitoring_ref.to_string()),
        line_ref: Some("RUT:Line:1".to_string()),
        aimed_departure_time: Some(now + Duration::minutes(10)),
        expected_departure_time: Some(now + Duration::minutes(11)),
        ..Default::default()
    }
}

pub fn estimated_journey(line_ref: &str, journey_ref: &str) -> EstimatedVehicleJourney {
    let now = Utc::now();
    EstimatedVehicleJourney {
        recorded_at_time: Some(now),
        line_ref: Some(line_ref.to_string()),
        dated_vehicle_journey_ref: Some(journey_ref.to_string()),
        estimated_calls: vec![
            JourneyCall {
                stop_point_ref: Some("NSR:Quay:1".to_string()),
                order: Some(1),
                aimed_departure_time: Some(now + Duration::minutes(5)),
                ..Default::default()
            },
            JourneyCall {
                stop_point_ref: Some("NSR:Quay:2".to_string()),
                order: Some(2),
                aimed_arrival_time: Some(now + Duration::minutes(20)),
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

/// A situation valid for the next hour.
pub fn situation(situation_number: &str, participant_ref: &str) -> PtSituationElement {
    let now = Utc::now();
    PtSituationElement {
        creation_time: Some(now),
        version_recorded_at: Some(now),
        situation_number: Some(situation_number.to_string()),
        participant_ref: Some(participant_ref.to_string()),
        version: Some(1),
        summary: Some("Buses diverted".to_string()),
        validity_periods: vec![ValidityPeriod {
            start_time: Some(now - Duration::minutes(1)),
            end_time: Some(now + Duration::hours(1)),
        }],
        affected_lines: vec!["RUT:Line:1".to_string()],
        ..Default::default()
    }
}

pub fn info_message(identifier: &str, channel: &str) -> InfoMessage {
    let now = Utc::now();
    InfoMessage {
        recorded_at_time: Some(now),
        valid_until_time: Some(now + Duration::hours(2)),
        info_message_identifier: Some(identifier.to_string()),
        info_channel_ref: Some(channel.to_string()),
        content: Some("Lift out of order".to_string()),
        ..Default::default()
    }
}
