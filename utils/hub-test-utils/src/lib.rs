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

mod fixtures;
pub use fixtures::{
    estimated_journey, info_message, situation, stop_visit, vehicle_activity, ATB, RUT,
};
mod recording_transport;
pub use recording_transport::{RecordedPost, RecordingPushTransport};

/// Installs a test-friendly `tracing` subscriber once per test binary.
///
/// Honours `RUST_LOG`; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
