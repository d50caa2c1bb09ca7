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

//! Facility monitoring condition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of one facility (lift, escalator, ticket machine...) at a stop.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacilityCondition {
    pub facility_ref: Option<String>,
    pub facility_status: Option<String>,
    pub status_description: Option<String>,
    pub stop_point_ref: Option<String>,
    pub line_ref: Option<String>,
    pub validity_start: Option<DateTime<Utc>>,
    pub validity_end: Option<DateTime<Utc>>,
}
