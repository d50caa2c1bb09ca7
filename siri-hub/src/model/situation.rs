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

//! Situation exchange disruption.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidityPeriod {
    pub start_time: Option<DateTime<Utc>>,
    /// `None` means the situation stays valid until further notice.
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PtSituationElement {
    pub creation_time: Option<DateTime<Utc>>,
    pub version_recorded_at: Option<DateTime<Utc>>,
    pub situation_number: Option<String>,
    pub participant_ref: Option<String>,
    pub version: Option<u32>,
    pub progress: Option<String>,
    pub severity: Option<String>,
    pub report_type: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub validity_periods: Vec<ValidityPeriod>,
    pub affected_lines: Vec<String>,
    pub affected_stop_points: Vec<String>,
    pub affected_vehicle_journeys: Vec<String>,
}

impl PtSituationElement {
    /// End of the last validity period.
    ///
    /// `None` when no period is given or when any period is open ended.
    pub fn validity_end(&self) -> Option<DateTime<Utc>> {
        if self.validity_periods.is_empty() {
            return None;
        }
        let mut latest: Option<DateTime<Utc>> = None;
        for period in &self.validity_periods {
            let end = period.end_time?;
            latest = Some(latest.map_or(end, |current| current.max(end)));
        }
        latest
    }
}
