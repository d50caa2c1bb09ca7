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

//! In-process buffer of changed keys awaiting the next commit.

use crate::model::RecordKey;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct Pending {
    sequence: u64,
    keys: HashMap<RecordKey, u64>,
}

/// Append-only key set drained by swapping in an empty one.
///
/// Every `record` call gets the next sequence number and stamps its keys with it, so a
/// commit can tell which keys were recorded after a given point. The lock is held only
/// for the append or the swap, never across a commit.
#[derive(Default)]
pub struct DirtyBuffer {
    pending: Mutex<Pending>,
}

impl DirtyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence number the keys were stamped with.
    pub fn record<I>(&self, keys: I) -> u64
    where
        I: IntoIterator<Item = RecordKey>,
    {
        let mut pending = self.pending.lock();
        pending.sequence += 1;
        let sequence = pending.sequence;
        pending
            .keys
            .extend(keys.into_iter().map(|key| (key, sequence)));
        sequence
    }

    /// Last sequence number handed out. Keys recorded later carry a greater one.
    pub fn sequence(&self) -> u64 {
        self.pending.lock().sequence
    }

    /// Takes everything recorded so far with the latest sequence of each key; later
    /// appends land in the next drain.
    pub fn drain(&self) -> HashMap<RecordKey, u64> {
        std::mem::take(&mut self.pending.lock().keys)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::DirtyBuffer;
    use crate::model::RecordKey;

    #[test]
    fn drain_swaps_out_the_recorded_keys() {
        let buffer = DirtyBuffer::new();
        buffer.record([RecordKey::new("RUT", "1"), RecordKey::new("RUT", "2")]);
        buffer.record([RecordKey::new("RUT", "1")]);

        let drained = buffer.drain();
        buffer.record([RecordKey::new("RUT", "3")]);

        assert_eq!(drained.len(), 2);
        assert_eq!(buffer.len(), 1);
        assert_eq!(
            buffer.drain().into_keys().next(),
            Some(RecordKey::new("RUT", "3"))
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn keys_carry_the_sequence_of_their_latest_record() {
        let buffer = DirtyBuffer::new();
        let first = buffer.record([RecordKey::new("RUT", "1"), RecordKey::new("RUT", "2")]);
        let second = buffer.record([RecordKey::new("RUT", "1")]);
        assert!(second > first);
        assert_eq!(buffer.sequence(), second);

        let drained = buffer.drain();
        assert_eq!(drained[&RecordKey::new("RUT", "1")], second);
        assert_eq!(drained[&RecordKey::new("RUT", "2")], first);
        assert_eq!(buffer.sequence(), second);
    }
}
