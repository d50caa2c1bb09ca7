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

mod config;
mod http_transport;

use crate::config::{Config, ReplayFile};
use crate::http_transport::HttpPushTransport;
use clap::Parser;
use siri_hub::SiriHub;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command()]
struct HubArgs {
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    info!("Started configurable-hub");

    let args = HubArgs::parse();
    let config: Config = config::load(&args.config)?;

    let transport = HttpPushTransport::new(
        config.hub.push_connect_timeout(),
        config.hub.push_socket_timeout(),
    )?;
    let hub = SiriHub::builder(Arc::new(transport))
        .with_config(config.hub.clone())
        .build(&Handle::current());
    hub.start();

    for request in config.subscriptions {
        let response = hub.subscribe(request);
        match response.error {
            None => info!(
                subscription_id = response.subscription_id.as_str(),
                "registered static subscription"
            ),
            Some(rejection) => warn!(
                subscription_id = response.subscription_id.as_str(),
                reason = rejection.reason_code(),
                "static subscription rejected: {rejection}"
            ),
        }
    }

    for path in &config.replay_files {
        let replay: ReplayFile = match config::load(path) {
            Ok(replay) => replay,
            Err(err) => {
                warn!("skipping replay file: {err}");
                continue;
            }
        };
        for batch in replay.into_batches() {
            let summary = hub.ingest_json(batch.kind, &batch.dataset_id, batch.items);
            info!(
                file = %path.display(),
                kind = batch.kind.as_str(),
                dataset_id = batch.dataset_id.as_str(),
                total = summary.total,
                updated = summary.added_or_updated,
                ignored = summary.ignored,
                "replayed batch"
            );
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down configurable-hub");
    hub.shutdown().await;

    Ok(())
}
