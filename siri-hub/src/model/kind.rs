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

//! Stable enumerations shared by ingestion, pull reads and push subscriptions.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The SIRI data categories handled by the hub. Each maps to one entity store.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiriDataKind {
    SituationExchange,
    VehicleMonitoring,
    EstimatedTimetable,
    StopMonitoring,
    GeneralMessage,
    FacilityMonitoring,
}

impl SiriDataKind {
    pub const ALL: [SiriDataKind; 6] = [
        SiriDataKind::SituationExchange,
        SiriDataKind::VehicleMonitoring,
        SiriDataKind::EstimatedTimetable,
        SiriDataKind::StopMonitoring,
        SiriDataKind::GeneralMessage,
        SiriDataKind::FacilityMonitoring,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SiriDataKind::SituationExchange => "SITUATION_EXCHANGE",
            SiriDataKind::VehicleMonitoring => "VEHICLE_MONITORING",
            SiriDataKind::EstimatedTimetable => "ESTIMATED_TIMETABLE",
            SiriDataKind::StopMonitoring => "STOP_MONITORING",
            SiriDataKind::GeneralMessage => "GENERAL_MESSAGE",
            SiriDataKind::FacilityMonitoring => "FACILITY_MONITORING",
        }
    }

    /// Subscribers of these kinds get the current dataset state pushed right after subscribing.
    pub fn requires_initial_snapshot(&self) -> bool {
        matches!(self, SiriDataKind::SituationExchange)
    }
}

impl Display for SiriDataKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dimensions usable in pull queries and in push subscription filters.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterDimension {
    LineRef,
    VehicleRef,
    StopRef,
    DatasetId,
    ExcludedDatasetIds,
    Channel,
}

impl FilterDimension {
    /// Dimensions answered from the record key rather than from the stored value.
    pub fn is_key_level(&self) -> bool {
        matches!(
            self,
            FilterDimension::DatasetId | FilterDimension::ExcludedDatasetIds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterDimension, SiriDataKind};

    #[test]
    fn kinds_serialize_with_their_wire_names() {
        for kind in SiriDataKind::ALL {
            let json = serde_json::to_string(&kind).expect("kind should serialize");
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn only_situation_exchange_requires_initial_snapshot() {
        let requiring: Vec<_> = SiriDataKind::ALL
            .into_iter()
            .filter(SiriDataKind::requires_initial_snapshot)
            .collect();

        assert_eq!(requiring, vec![SiriDataKind::SituationExchange]);
    }

    #[test]
    fn dataset_dimensions_are_key_level() {
        assert!(FilterDimension::DatasetId.is_key_level());
        assert!(FilterDimension::ExcludedDatasetIds.is_key_level());
        assert!(!FilterDimension::LineRef.is_key_level());
        assert!(!FilterDimension::Channel.is_key_level());
    }
}
