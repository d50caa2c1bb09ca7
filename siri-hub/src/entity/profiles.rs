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

//! The per-kind table: keys, stable projections, recency and validity for each SIRI kind.
//!
//! Volatile fields left out of the fingerprints:
//!
//! | kind | excluded |
//! |---|---|
//! | vehicle monitoring | `valid_until_time` |
//! | stop monitoring | `recorded_at_time`, `valid_until_time` |
//! | estimated timetable | `recorded_at_time` |
//! | situation exchange | none |
//! | general message | `recorded_at_time` |
//! | facility monitoring | none |

use crate::entity::checksum::{fingerprint, ChecksumError};
use crate::entity::expiration::ExpirationPolicy;
use crate::entity::profile::EntityProfile;
use crate::model::{
    EstimatedVehicleJourney, FacilityCondition, FilterDimension, InfoMessage, JourneyCall,
    Location, MonitoredStopVisit, PtSituationElement, RecordKey, SiriDataKind, ValidityPeriod,
    VehicleActivity,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

macro_rules! define_profile {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug)]
        pub struct $name {
            policy: ExpirationPolicy,
        }

        impl $name {
            pub fn new(policy: ExpirationPolicy) -> Self {
                Self { policy }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(ExpirationPolicy::default_for($kind))
            }
        }
    };
}

fn single(value: &Option<String>) -> Vec<&str> {
    value.as_deref().into_iter().collect()
}

fn many(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

define_profile!(
    /// Vehicle positions, keyed by vehicle.
    VehicleActivityProfile,
    SiriDataKind::VehicleMonitoring
);

#[derive(Serialize)]
struct VehicleActivityFingerprint<'a> {
    recorded_at_time: &'a Option<DateTime<Utc>>,
    vehicle_ref: &'a Option<String>,
    line_ref: &'a Option<String>,
    direction_ref: &'a Option<String>,
    dated_vehicle_journey_ref: &'a Option<String>,
    operator_ref: &'a Option<String>,
    data_source: &'a Option<String>,
    origin_ref: &'a Option<String>,
    destination_ref: &'a Option<String>,
    location: &'a Option<Location>,
    bearing: &'a Option<f64>,
    delay_seconds: &'a Option<i64>,
    monitored: &'a Option<bool>,
    occupancy: &'a Option<String>,
    monitored_call_stop_ref: &'a Option<String>,
}

impl EntityProfile for VehicleActivityProfile {
    type Entity = VehicleActivity;

    fn kind(&self) -> SiriDataKind {
        SiriDataKind::VehicleMonitoring
    }

    fn expiration_policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    fn record_key(&self, dataset_id: &str, entity: &VehicleActivity) -> Option<RecordKey> {
        let vehicle_ref = entity.vehicle_ref.as_deref()?;
        Some(RecordKey::new(dataset_id, vehicle_ref))
    }

    fn checksum(&self, entity: &VehicleActivity) -> Result<u64, ChecksumError> {
        fingerprint(&VehicleActivityFingerprint {
            recorded_at_time: &entity.recorded_at_time,
            vehicle_ref: &entity.vehicle_ref,
            line_ref: &entity.line_ref,
            direction_ref: &entity.direction_ref,
            dated_vehicle_journey_ref: &entity.dated_vehicle_journey_ref,
            operator_ref: &entity.operator_ref,
            data_source: &entity.data_source,
            origin_ref: &entity.origin_ref,
            destination_ref: &entity.destination_ref,
            location: &entity.location,
            bearing: &entity.bearing,
            delay_seconds: &entity.delay_seconds,
            monitored: &entity.monitored,
            occupancy: &entity.occupancy,
            monitored_call_stop_ref: &entity.monitored_call_stop_ref,
        })
    }

    fn recorded_at(&self, entity: &VehicleActivity) -> Option<DateTime<Utc>> {
        entity.recorded_at_time
    }

    fn validity_end(&self, entity: &VehicleActivity) -> Option<DateTime<Utc>> {
        entity.valid_until_time
    }

    fn filter_values<'a>(
        &self,
        entity: &'a VehicleActivity,
        dimension: FilterDimension,
    ) -> Vec<&'a str> {
        match dimension {
            FilterDimension::LineRef => single(&entity.line_ref),
            FilterDimension::VehicleRef => single(&entity.vehicle_ref),
            FilterDimension::StopRef => single(&entity.monitored_call_stop_ref),
            _ => Vec::new(),
        }
    }
}

define_profile!(
    /// Stop visits, keyed by visit (or journey) at a monitoring point.
    StopVisitProfile,
    SiriDataKind::StopMonitoring
);

#[derive(Serialize)]
struct StopVisitFingerprint<'a> {
    item_identifier: &'a Option<String>,
    monitoring_ref: &'a Option<String>,
    line_ref: &'a Option<String>,
    direction_ref: &'a Option<String>,
    dated_vehicle_journey_ref: &'a Option<String>,
    vehicle_ref: &'a Option<String>,
    operator_ref: &'a Option<String>,
    destination_name: &'a Option<String>,
    stop_point_ref: &'a Option<String>,
    aimed_arrival_time: &'a Option<DateTime<Utc>>,
    expected_arrival_time: &'a Option<DateTime<Utc>>,
    aimed_departure_time: &'a Option<DateTime<Utc>>,
    expected_departure_time: &'a Option<DateTime<Utc>>,
    arrival_status: &'a Option<String>,
    departure_status: &'a Option<String>,
    cancellation: &'a Option<bool>,
}

impl EntityProfile for StopVisitProfile {
    type Entity = MonitoredStopVisit;

    fn kind(&self) -> SiriDataKind {
        SiriDataKind::StopMonitoring
    }

    fn expiration_policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    fn record_key(&self, dataset_id: &str, entity: &MonitoredStopVisit) -> Option<RecordKey> {
        let monitoring_ref = entity.monitoring_ref.as_deref()?;
        let primary = entity
            .item_identifier
            .as_deref()
            .or(entity.dated_vehicle_journey_ref.as_deref())?;
        Some(
            RecordKey::new(dataset_id, primary)
                .with_stop_ref(Some(monitoring_ref))
                .with_line_ref(entity.line_ref.as_deref())
                .with_vehicle_journey_ref(entity.dated_vehicle_journey_ref.as_deref()),
        )
    }

    fn checksum(&self, entity: &MonitoredStopVisit) -> Result<u64, ChecksumError> {
        fingerprint(&StopVisitFingerprint {
            item_identifier: &entity.item_identifier,
            monitoring_ref: &entity.monitoring_ref,
            line_ref: &entity.line_ref,
            direction_ref: &entity.direction_ref,
            dated_vehicle_journey_ref: &entity.dated_vehicle_journey_ref,
            vehicle_ref: &entity.vehicle_ref,
            operator_ref: &entity.operator_ref,
            destination_name: &entity.destination_name,
            stop_point_ref: &entity.stop_point_ref,
            aimed_arrival_time: &entity.aimed_arrival_time,
            expected_arrival_time: &entity.expected_arrival_time,
            aimed_departure_time: &entity.aimed_departure_time,
            expected_departure_time: &entity.expected_departure_time,
            arrival_status: &entity.arrival_status,
            departure_status: &entity.departure_status,
            cancellation: &entity.cancellation,
        })
    }

    fn recorded_at(&self, entity: &MonitoredStopVisit) -> Option<DateTime<Utc>> {
        entity.recorded_at_time
    }

    fn validity_end(&self, entity: &MonitoredStopVisit) -> Option<DateTime<Utc>> {
        entity.latest_call_time().or(entity.valid_until_time)
    }

    fn filter_values<'a>(
        &self,
        entity: &'a MonitoredStopVisit,
        dimension: FilterDimension,
    ) -> Vec<&'a str> {
        match dimension {
            FilterDimension::LineRef => single(&entity.line_ref),
            FilterDimension::VehicleRef => single(&entity.vehicle_ref),
            FilterDimension::StopRef => entity
                .monitoring_ref
                .as_deref()
                .into_iter()
                .chain(entity.stop_point_ref.as_deref())
                .collect(),
            _ => Vec::new(),
        }
    }
}

define_profile!(
    /// Timetable revisions, keyed by (framed) journey and line.
    EstimatedJourneyProfile,
    SiriDataKind::EstimatedTimetable
);

#[derive(Serialize)]
struct EstimatedJourneyFingerprint<'a> {
    line_ref: &'a Option<String>,
    direction_ref: &'a Option<String>,
    dated_vehicle_journey_ref: &'a Option<String>,
    data_frame_ref: &'a Option<String>,
    vehicle_ref: &'a Option<String>,
    operator_ref: &'a Option<String>,
    data_source: &'a Option<String>,
    cancellation: &'a Option<bool>,
    extra_journey: &'a Option<bool>,
    is_complete_stop_sequence: &'a Option<bool>,
    recorded_calls: &'a [JourneyCall],
    estimated_calls: &'a [JourneyCall],
}

impl EntityProfile for EstimatedJourneyProfile {
    type Entity = EstimatedVehicleJourney;

    fn kind(&self) -> SiriDataKind {
        SiriDataKind::EstimatedTimetable
    }

    fn expiration_policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    fn record_key(&self, dataset_id: &str, entity: &EstimatedVehicleJourney) -> Option<RecordKey> {
        let line_ref = entity.line_ref.as_deref()?;
        let journey_ref = entity.journey_ref()?;
        Some(RecordKey::new(dataset_id, journey_ref).with_line_ref(Some(line_ref)))
    }

    fn checksum(&self, entity: &EstimatedVehicleJourney) -> Result<u64, ChecksumError> {
        fingerprint(&EstimatedJourneyFingerprint {
            line_ref: &entity.line_ref,
            direction_ref: &entity.direction_ref,
            dated_vehicle_journey_ref: &entity.dated_vehicle_journey_ref,
            data_frame_ref: &entity.data_frame_ref,
            vehicle_ref: &entity.vehicle_ref,
            operator_ref: &entity.operator_ref,
            data_source: &entity.data_source,
            cancellation: &entity.cancellation,
            extra_journey: &entity.extra_journey,
            is_complete_stop_sequence: &entity.is_complete_stop_sequence,
            recorded_calls: &entity.recorded_calls,
            estimated_calls: &entity.estimated_calls,
        })
    }

    fn recorded_at(&self, entity: &EstimatedVehicleJourney) -> Option<DateTime<Utc>> {
        entity.recorded_at_time
    }

    fn validity_end(&self, entity: &EstimatedVehicleJourney) -> Option<DateTime<Utc>> {
        entity.latest_call_time()
    }

    fn filter_values<'a>(
        &self,
        entity: &'a EstimatedVehicleJourney,
        dimension: FilterDimension,
    ) -> Vec<&'a str> {
        match dimension {
            FilterDimension::LineRef => single(&entity.line_ref),
            FilterDimension::VehicleRef => single(&entity.vehicle_ref),
            FilterDimension::StopRef => entity.stop_point_refs().collect(),
            _ => Vec::new(),
        }
    }
}

define_profile!(
    /// Disruptions, keyed by situation number and participant.
    SituationProfile,
    SiriDataKind::SituationExchange
);

#[derive(Serialize)]
struct SituationFingerprint<'a> {
    creation_time: &'a Option<DateTime<Utc>>,
    version_recorded_at: &'a Option<DateTime<Utc>>,
    situation_number: &'a Option<String>,
    participant_ref: &'a Option<String>,
    version: &'a Option<u32>,
    progress: &'a Option<String>,
    severity: &'a Option<String>,
    report_type: &'a Option<String>,
    summary: &'a Option<String>,
    description: &'a Option<String>,
    validity_periods: &'a [ValidityPeriod],
    affected_lines: &'a [String],
    affected_stop_points: &'a [String],
    affected_vehicle_journeys: &'a [String],
}

impl EntityProfile for SituationProfile {
    type Entity = PtSituationElement;

    fn kind(&self) -> SiriDataKind {
        SiriDataKind::SituationExchange
    }

    fn expiration_policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    fn record_key(&self, dataset_id: &str, entity: &PtSituationElement) -> Option<RecordKey> {
        let situation_number = entity.situation_number.as_deref()?;
        Some(
            RecordKey::new(dataset_id, situation_number)
                .with_discriminator(entity.participant_ref.as_deref()),
        )
    }

    fn checksum(&self, entity: &PtSituationElement) -> Result<u64, ChecksumError> {
        fingerprint(&SituationFingerprint {
            creation_time: &entity.creation_time,
            version_recorded_at: &entity.version_recorded_at,
            situation_number: &entity.situation_number,
            participant_ref: &entity.participant_ref,
            version: &entity.version,
            progress: &entity.progress,
            severity: &entity.severity,
            report_type: &entity.report_type,
            summary: &entity.summary,
            description: &entity.description,
            validity_periods: &entity.validity_periods,
            affected_lines: &entity.affected_lines,
            affected_stop_points: &entity.affected_stop_points,
            affected_vehicle_journeys: &entity.affected_vehicle_journeys,
        })
    }

    fn recorded_at(&self, entity: &PtSituationElement) -> Option<DateTime<Utc>> {
        entity.version_recorded_at
    }

    fn validity_end(&self, entity: &PtSituationElement) -> Option<DateTime<Utc>> {
        entity.validity_end()
    }

    fn filter_values<'a>(
        &self,
        entity: &'a PtSituationElement,
        dimension: FilterDimension,
    ) -> Vec<&'a str> {
        match dimension {
            FilterDimension::LineRef => many(&entity.affected_lines),
            FilterDimension::StopRef => many(&entity.affected_stop_points),
            FilterDimension::VehicleRef => many(&entity.affected_vehicle_journeys),
            _ => Vec::new(),
        }
    }
}

define_profile!(
    /// General messages, keyed by message identifier within an info channel.
    InfoMessageProfile,
    SiriDataKind::GeneralMessage
);

#[derive(Serialize)]
struct InfoMessageFingerprint<'a> {
    valid_until_time: &'a Option<DateTime<Utc>>,
    info_message_identifier: &'a Option<String>,
    info_message_version: &'a Option<u32>,
    info_channel_ref: &'a Option<String>,
    format_ref: &'a Option<String>,
    content: &'a Option<String>,
    affected_lines: &'a [String],
    affected_stop_points: &'a [String],
}

impl EntityProfile for InfoMessageProfile {
    type Entity = InfoMessage;

    fn kind(&self) -> SiriDataKind {
        SiriDataKind::GeneralMessage
    }

    fn expiration_policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    fn record_key(&self, dataset_id: &str, entity: &InfoMessage) -> Option<RecordKey> {
        let identifier = entity.info_message_identifier.as_deref()?;
        Some(
            RecordKey::new(dataset_id, identifier)
                .with_discriminator(entity.info_channel_ref.as_deref()),
        )
    }

    fn checksum(&self, entity: &InfoMessage) -> Result<u64, ChecksumError> {
        fingerprint(&InfoMessageFingerprint {
            valid_until_time: &entity.valid_until_time,
            info_message_identifier: &entity.info_message_identifier,
            info_message_version: &entity.info_message_version,
            info_channel_ref: &entity.info_channel_ref,
            format_ref: &entity.format_ref,
            content: &entity.content,
            affected_lines: &entity.affected_lines,
            affected_stop_points: &entity.affected_stop_points,
        })
    }

    fn recorded_at(&self, entity: &InfoMessage) -> Option<DateTime<Utc>> {
        entity.recorded_at_time
    }

    fn validity_end(&self, entity: &InfoMessage) -> Option<DateTime<Utc>> {
        entity.valid_until_time
    }

    fn filter_values<'a>(&self, entity: &'a InfoMessage, dimension: FilterDimension) -> Vec<&'a str> {
        match dimension {
            FilterDimension::Channel => single(&entity.info_channel_ref),
            FilterDimension::LineRef => many(&entity.affected_lines),
            FilterDimension::StopRef => many(&entity.affected_stop_points),
            _ => Vec::new(),
        }
    }
}

define_profile!(
    /// Facility conditions, keyed by facility.
    FacilityConditionProfile,
    SiriDataKind::FacilityMonitoring
);

#[derive(Serialize)]
struct FacilityConditionFingerprint<'a> {
    facility_ref: &'a Option<String>,
    facility_status: &'a Option<String>,
    status_description: &'a Option<String>,
    stop_point_ref: &'a Option<String>,
    line_ref: &'a Option<String>,
    validity_start: &'a Option<DateTime<Utc>>,
    validity_end: &'a Option<DateTime<Utc>>,
}

impl EntityProfile for FacilityConditionProfile {
    type Entity = FacilityCondition;

    fn kind(&self) -> SiriDataKind {
        SiriDataKind::FacilityMonitoring
    }

    fn expiration_policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    fn record_key(&self, dataset_id: &str, entity: &FacilityCondition) -> Option<RecordKey> {
        let facility_ref = entity.facility_ref.as_deref()?;
        Some(RecordKey::new(dataset_id, facility_ref).with_stop_ref(entity.stop_point_ref.as_deref()))
    }

    fn checksum(&self, entity: &FacilityCondition) -> Result<u64, ChecksumError> {
        fingerprint(&FacilityConditionFingerprint {
            facility_ref: &entity.facility_ref,
            facility_status: &entity.facility_status,
            status_description: &entity.status_description,
            stop_point_ref: &entity.stop_point_ref,
            line_ref: &entity.line_ref,
            validity_start: &entity.validity_start,
            validity_end: &entity.validity_end,
        })
    }

    fn recorded_at(&self, _entity: &FacilityCondition) -> Option<DateTime<Utc>> {
        None
    }

    fn validity_end(&self, entity: &FacilityCondition) -> Option<DateTime<Utc>> {
        entity.validity_end
    }

    fn filter_values<'a>(
        &self,
        entity: &'a FacilityCondition,
        dimension: FilterDimension,
    ) -> Vec<&'a str> {
        match dimension {
            FilterDimension::StopRef => single(&entity.stop_point_ref),
            FilterDimension::LineRef => single(&entity.line_ref),
            _ => Vec::new(),
        }
    }
}
