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

//! Change-detection fingerprints over explicit stable-field projections.

use fxhash::FxHasher;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::hash::Hasher;
use std::io;

#[derive(Debug)]
pub struct ChecksumError {
    source: serde_json::Error,
}

impl Display for ChecksumError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unable to fingerprint entity: {}", self.source)
    }
}

impl Error for ChecksumError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Feeds serialized bytes straight into the hasher, no intermediate buffer.
struct HashingWriter {
    hasher: FxHasher,
}

impl io::Write for HashingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hasher.write(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hashes a stable-field projection.
///
/// The projection must list only fields whose change is a meaningful state change;
/// the hash is deterministic across processes so checksums can be shared in a cluster.
pub fn fingerprint<P: Serialize + ?Sized>(projection: &P) -> Result<u64, ChecksumError> {
    let mut writer = HashingWriter {
        hasher: FxHasher::default(),
    };
    serde_json::to_writer(&mut writer, projection).map_err(|source| ChecksumError { source })?;
    Ok(writer.hasher.finish())
}
