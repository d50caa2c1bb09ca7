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

//! Multi-dimension inclusion filter shared by pull queries and push subscriptions.

use crate::model::kind::FilterDimension;
use crate::model::record_key::RecordKey;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Conjunction of optional inclusion sets.
///
/// A dimension that is absent or holds an empty set matches everything. For every
/// other dimension an entity matches when at least one of its values is in the set,
/// except [`FilterDimension::ExcludedDatasetIds`] which rejects listed datasets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityFilter {
    dimensions: HashMap<FilterDimension, HashSet<String>>,
}

impl EntityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_dataset(dataset_id: impl Into<String>) -> Self {
        Self::new().with(FilterDimension::DatasetId, [dataset_id.into()])
    }

    pub fn with<I, S>(mut self, dimension: FilterDimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions
            .entry(dimension)
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Returns the inclusion set for one dimension, `None` when it matches everything.
    pub fn values(&self, dimension: FilterDimension) -> Option<&HashSet<String>> {
        self.dimensions
            .get(&dimension)
            .filter(|values| !values.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.values().all(HashSet::is_empty)
    }

    pub fn has_value_dimensions(&self) -> bool {
        self.dimensions
            .iter()
            .any(|(dimension, values)| !dimension.is_key_level() && !values.is_empty())
    }

    pub fn matches_dataset(&self, dataset_id: &str) -> bool {
        if let Some(included) = self.values(FilterDimension::DatasetId) {
            if !included.contains(dataset_id) {
                return false;
            }
        }
        match self.values(FilterDimension::ExcludedDatasetIds) {
            Some(excluded) => !excluded.contains(dataset_id),
            None => true,
        }
    }

    pub fn matches_key(&self, key: &RecordKey) -> bool {
        self.matches_dataset(key.dataset_id())
    }

    /// Checks the value-level dimensions, asking `lookup` for the entity's values per dimension.
    pub fn matches_values<'a, F>(&self, lookup: F) -> bool
    where
        F: Fn(FilterDimension) -> Vec<&'a str>,
    {
        self.dimensions
            .iter()
            .filter(|(dimension, values)| !dimension.is_key_level() && !values.is_empty())
            .all(|(dimension, wanted)| {
                lookup(*dimension)
                    .into_iter()
                    .any(|value| wanted.contains(value))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::EntityFilter;
    use crate::model::kind::FilterDimension;
    use crate::model::record_key::RecordKey;

    #[test]
    fn empty_filter_matches_everything() {
        let filter = EntityFilter::new().with(FilterDimension::LineRef, Vec::<String>::new());

        assert!(filter.is_empty());
        assert!(filter.matches_key(&RecordKey::new("RUT", "1")));
        assert!(filter.matches_values(|_| Vec::new()));
    }

    #[test]
    fn dataset_inclusion_and_exclusion_are_combined() {
        let filter = EntityFilter::new()
            .with(FilterDimension::DatasetId, ["RUT", "ATB"])
            .with(FilterDimension::ExcludedDatasetIds, ["ATB"]);

        assert!(filter.matches_dataset("RUT"));
        assert!(!filter.matches_dataset("ATB"));
        assert!(!filter.matches_dataset("SKY"));
    }

    #[test]
    fn value_dimensions_require_every_dimension_to_intersect() {
        let filter = EntityFilter::new()
            .with(FilterDimension::LineRef, ["RUT:Line:1"])
            .with(FilterDimension::StopRef, ["NSR:Quay:1", "NSR:Quay:2"]);

        assert!(filter.has_value_dimensions());
        assert!(filter.matches_values(|dimension| match dimension {
            FilterDimension::LineRef => vec!["RUT:Line:1"],
            FilterDimension::StopRef => vec!["NSR:Quay:2"],
            _ => Vec::new(),
        }));
        assert!(!filter.matches_values(|dimension| match dimension {
            FilterDimension::LineRef => vec!["RUT:Line:1"],
            _ => Vec::new(),
        }));
    }

    #[test]
    fn filter_deserializes_from_dimension_map() {
        let filter: EntityFilter =
            serde_json::from_str(r#"{"LINE_REF": ["RUT:Line:1"], "EXCLUDED_DATASET_IDS": ["ATB"]}"#)
                .expect("filter should parse");

        assert!(filter.values(FilterDimension::LineRef).is_some());
        assert!(!filter.matches_dataset("ATB"));
    }
}
