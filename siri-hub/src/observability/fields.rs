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

//! Shared field values and value-format helpers.

use std::time::Duration;

pub const ALL_DATASETS: &str = "*";
pub const REASON_QUEUE_CLOSED: &str = "queue_closed";
pub const REASON_SHUTDOWN: &str = "shutdown";

/// Milliseconds as a plain integer field, saturating on overflow.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub fn dataset_or_all(dataset_id: Option<&str>) -> &str {
    dataset_id.unwrap_or(ALL_DATASETS)
}
