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

//! Ingestion counters.

use crate::model::SiriDataKind;
use crate::observability::events;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const COMPONENT: &str = "metrics";

/// Receives one report per ingested batch.
pub trait MetricsSink: Send + Sync {
    fn record_ingest(
        &self,
        kind: SiriDataKind,
        dataset_id: &str,
        total: usize,
        updated: usize,
        expired_or_discarded: usize,
        ignored: usize,
    );
}

/// Point-in-time copy of [`TracingMetricsSink`] counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IngestTotals {
    pub batches: u64,
    pub total: u64,
    pub updated: u64,
    pub expired_or_discarded: u64,
    pub ignored: u64,
}

/// Keeps process-wide totals and emits every report as a debug event.
#[derive(Default)]
pub struct TracingMetricsSink {
    batches: AtomicU64,
    total: AtomicU64,
    updated: AtomicU64,
    expired_or_discarded: AtomicU64,
    ignored: AtomicU64,
}

impl TracingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn totals(&self) -> IngestTotals {
        IngestTotals {
            batches: self.batches.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            expired_or_discarded: self.expired_or_discarded.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSink for TracingMetricsSink {
    fn record_ingest(
        &self,
        kind: SiriDataKind,
        dataset_id: &str,
        total: usize,
        updated: usize,
        expired_or_discarded: usize,
        ignored: usize,
    ) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(total as u64, Ordering::Relaxed);
        self.updated.fetch_add(updated as u64, Ordering::Relaxed);
        self.expired_or_discarded
            .fetch_add(expired_or_discarded as u64, Ordering::Relaxed);
        self.ignored.fetch_add(ignored as u64, Ordering::Relaxed);

        debug!(
            event = events::INGEST_METRICS,
            component = COMPONENT,
            kind = kind.as_str(),
            dataset_id,
            total,
            updated,
            expired_or_discarded,
            ignored,
            "ingest batch recorded"
        );
    }
}
