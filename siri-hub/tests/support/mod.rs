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

use hub_test_utils::{init_logging, RecordingPushTransport};
use siri_hub::{HubConfig, SiriHub};
use std::sync::Arc;
use tokio::runtime::Handle;

pub(crate) fn make_hub(config: HubConfig) -> (SiriHub, Arc<RecordingPushTransport>) {
    init_logging();
    let transport = Arc::new(RecordingPushTransport::new());
    let hub = SiriHub::builder(transport.clone())
        .with_config(config)
        .build(&Handle::current());
    (hub, transport)
}

#[allow(dead_code)]
pub(crate) fn default_hub() -> (SiriHub, Arc<RecordingPushTransport>) {
    make_hub(HubConfig::default())
}
