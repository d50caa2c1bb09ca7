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

//! Strategy describing how one SIRI kind is keyed, fingerprinted and expired.

use crate::entity::checksum::ChecksumError;
use crate::entity::expiration::ExpirationPolicy;
use crate::model::{FilterDimension, RecordKey, SiriDataKind};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Kind-specific knowledge injected into the generic engine.
///
/// One implementation exists per [`SiriDataKind`]; everything else in the store,
/// tracker and dispatcher is shared.
pub trait EntityProfile: Send + Sync + 'static {
    type Entity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static;

    fn kind(&self) -> SiriDataKind;

    fn expiration_policy(&self) -> &ExpirationPolicy;

    /// Derives the key, or `None` when required identifying fields are missing.
    fn record_key(&self, dataset_id: &str, entity: &Self::Entity) -> Option<RecordKey>;

    /// Fingerprint of the stable fields; volatile freshness fields are left out.
    fn checksum(&self, entity: &Self::Entity) -> Result<u64, ChecksumError>;

    /// Timestamp used to arbitrate between out-of-order updates of the same key.
    fn recorded_at(&self, entity: &Self::Entity) -> Option<DateTime<Utc>>;

    /// End of the entity's domain validity, `None` when unbounded or unknown.
    fn validity_end(&self, entity: &Self::Entity) -> Option<DateTime<Utc>>;

    /// Values the entity carries for one value-level filter dimension.
    fn filter_values<'a>(&self, entity: &'a Self::Entity, dimension: FilterDimension)
        -> Vec<&'a str>;
}
