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

//! General message (info message).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InfoMessage {
    pub recorded_at_time: Option<DateTime<Utc>>,
    pub valid_until_time: Option<DateTime<Utc>>,
    pub info_message_identifier: Option<String>,
    pub info_message_version: Option<u32>,
    pub info_channel_ref: Option<String>,
    pub format_ref: Option<String>,
    pub content: Option<String>,
    pub affected_lines: Vec<String>,
    pub affected_stop_points: Vec<String>,
}
