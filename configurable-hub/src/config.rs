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

use serde::{Deserialize, Serialize};
use serde_json::Value;
use siri_hub::{HubConfig, SiriDataKind, SubscriptionRequest};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: json5::Error },
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io { path, source } => {
                write!(f, "unable to read {}: {source}", path.display())
            }
            LoadError::Parse { path, source } => {
                write!(f, "unable to parse {}: {source}", path.display())
            }
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub(crate) hub: HubConfig,
    /// Push subscriptions registered at startup.
    #[serde(default)]
    pub(crate) subscriptions: Vec<SubscriptionRequest>,
    /// Recorded batches ingested in order once the hub is running.
    #[serde(default)]
    pub(crate) replay_files: Vec<PathBuf>,
}

/// One recorded provider batch.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ReplayBatch {
    pub(crate) kind: SiriDataKind,
    pub(crate) dataset_id: String,
    pub(crate) items: Vec<Value>,
}

/// A replay file holds either one batch or a list of them.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ReplayFile {
    Many(Vec<ReplayBatch>),
    One(ReplayBatch),
}

impl ReplayFile {
    pub(crate) fn into_batches(self) -> Vec<ReplayBatch> {
        match self {
            ReplayFile::Many(batches) => batches,
            ReplayFile::One(batch) => vec![batch],
        }
    }
}

pub(crate) fn load<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    json5::from_str(&contents).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
