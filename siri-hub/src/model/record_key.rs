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

//! Composite identity of one stored entity.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identity of one logical entity inside a dataset.
///
/// Equality and hashing cover every populated field, so two keys only collide when
/// the same discriminators were derived for them. Within one dataset a key must be
/// derived identically every time the same logical entity is ingested.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct RecordKey {
    dataset_id: String,
    line_ref: Option<String>,
    primary_key: String,
    stop_ref: Option<String>,
    vehicle_journey_ref: Option<String>,
    discriminator: Option<String>,
}

impl RecordKey {
    pub fn new(dataset_id: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            line_ref: None,
            primary_key: primary_key.into(),
            stop_ref: None,
            vehicle_journey_ref: None,
            discriminator: None,
        }
    }

    pub fn with_line_ref(mut self, line_ref: Option<impl Into<String>>) -> Self {
        self.line_ref = line_ref.map(Into::into);
        self
    }

    pub fn with_stop_ref(mut self, stop_ref: Option<impl Into<String>>) -> Self {
        self.stop_ref = stop_ref.map(Into::into);
        self
    }

    pub fn with_vehicle_journey_ref(mut self, vehicle_journey_ref: Option<impl Into<String>>) -> Self {
        self.vehicle_journey_ref = vehicle_journey_ref.map(Into::into);
        self
    }

    pub fn with_discriminator(mut self, discriminator: Option<impl Into<String>>) -> Self {
        self.discriminator = discriminator.map(Into::into);
        self
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn line_ref(&self) -> Option<&str> {
        self.line_ref.as_deref()
    }

    pub fn stop_ref(&self) -> Option<&str> {
        self.stop_ref.as_deref()
    }

    pub fn vehicle_journey_ref(&self) -> Option<&str> {
        self.vehicle_journey_ref.as_deref()
    }

    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    pub fn belongs_to(&self, dataset_id: &str) -> bool {
        self.dataset_id == dataset_id
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.dataset_id, self.primary_key)?;
        for part in [
            self.line_ref.as_deref(),
            self.stop_ref.as_deref(),
            self.vehicle_journey_ref.as_deref(),
            self.discriminator.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            write!(f, ":{part}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::RecordKey;
    use std::collections::HashSet;

    #[test]
    fn keys_differ_when_any_populated_field_differs() {
        let base = RecordKey::new("RUT", "123");
        let with_line = RecordKey::new("RUT", "123").with_line_ref(Some("RUT:Line:1"));
        let other_dataset = RecordKey::new("ATB", "123");

        let mut seen = HashSet::new();
        seen.insert(base.clone());
        seen.insert(with_line);
        seen.insert(other_dataset);
        seen.insert(base);

        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn display_skips_absent_discriminators() {
        let key = RecordKey::new("RUT", "123")
            .with_stop_ref(Some("NSR:Quay:1"))
            .with_discriminator(None::<String>);

        assert_eq!(key.to_string(), "RUT:123:NSR:Quay:1");
        assert!(key.belongs_to("RUT"));
        assert!(!key.belongs_to("ATB"));
    }
}
