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

//! Hub tuning knobs, loadable from json5.

use crate::delivery::DispatcherSettings;
use crate::entity::ExpirationPolicy;
use crate::model::SiriDataKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(json5::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "unable to read config file {}: {source}", path.display())
            }
            ConfigError::Parse(err) => write!(f, "unable to parse config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(err) => Some(err),
        }
    }
}

/// Replaces the built-in grace or horizon of one kind. Absent fields keep the default.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExpirationOverride {
    #[serde(default)]
    pub grace_secs: Option<u64>,
    #[serde(default)]
    pub horizon_secs: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct HubConfig {
    /// How long a polling consumer is remembered after its last read.
    pub tracking_period_secs: u64,
    pub commit_interval_ms: u64,
    pub default_max_elements_per_delivery: usize,
    pub push_workers: usize,
    pub push_queue_size: usize,
    pub push_connect_timeout_ms: u64,
    pub push_socket_timeout_ms: u64,
    pub heartbeat_scan_interval_ms: u64,
    pub store_purge_interval_ms: u64,
    pub subscription_refresh_interval_ms: u64,
    /// Producer reference stamped on outgoing deliveries.
    pub producer_ref: String,
    pub expiration: HashMap<SiriDataKind, ExpirationOverride>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            tracking_period_secs: 600,
            commit_interval_ms: 2000,
            default_max_elements_per_delivery: 1000,
            push_workers: 16,
            push_queue_size: 4096,
            push_connect_timeout_ms: 5000,
            push_socket_timeout_ms: 15000,
            heartbeat_scan_interval_ms: 1000,
            store_purge_interval_ms: 10000,
            subscription_refresh_interval_ms: 5000,
            producer_ref: "siri-hub".to_string(),
            expiration: HashMap::new(),
        }
    }
}

impl HubConfig {
    pub fn from_json5_str(contents: &str) -> Result<Self, ConfigError> {
        json5::from_str(contents).map_err(ConfigError::Parse)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json5_str(&contents)
    }

    pub fn expiration_policy(&self, kind: SiriDataKind) -> ExpirationPolicy {
        let mut policy = ExpirationPolicy::default_for(kind);
        if let Some(overrides) = self.expiration.get(&kind) {
            if let Some(grace) = overrides.grace_secs {
                policy.grace = Duration::from_secs(grace);
            }
            if let Some(horizon) = overrides.horizon_secs {
                policy.horizon = Duration::from_secs(horizon);
            }
        }
        policy
    }

    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            default_max_elements_per_delivery: self.default_max_elements_per_delivery,
            workers: self.push_workers,
            queue_size: self.push_queue_size,
        }
    }

    pub fn tracking_period(&self) -> Duration {
        Duration::from_secs(self.tracking_period_secs)
    }

    pub fn commit_interval(&self) -> Duration {
        Duration::from_millis(self.commit_interval_ms)
    }

    pub fn push_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.push_connect_timeout_ms)
    }

    pub fn push_socket_timeout(&self) -> Duration {
        Duration::from_millis(self.push_socket_timeout_ms)
    }

    pub fn heartbeat_scan_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_scan_interval_ms)
    }

    pub fn store_purge_interval(&self) -> Duration {
        Duration::from_millis(self.store_purge_interval_ms)
    }

    pub fn subscription_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.subscription_refresh_interval_ms)
    }
}
