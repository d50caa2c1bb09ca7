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

//! Outbound push collaborator.

use crate::delivery::payload::PushPayload;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PushError {
    /// The consumer could not be reached at all.
    Unreachable(String),
    /// The consumer answered with a non-2xx status.
    Rejected { status: u16 },
    Timeout,
    Other(String),
}

impl Display for PushError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PushError::Unreachable(reason) => write!(f, "consumer unreachable: {reason}"),
            PushError::Rejected { status } => write!(f, "consumer rejected push with status {status}"),
            PushError::Timeout => write!(f, "push timed out"),
            PushError::Other(reason) => write!(f, "push failed: {reason}"),
        }
    }
}

impl Error for PushError {}

/// Delivers one payload to a consumer address.
///
/// Implementations bound connect and socket time themselves and never retry; a failed
/// payload is superseded by the next change batch.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn post(&self, address: &str, payload: &PushPayload) -> Result<(), PushError>;
}

#[cfg(test)]
mod tests {
    use super::PushError;

    #[test]
    fn push_errors_render_their_cause() {
        assert_eq!(
            PushError::Rejected { status: 503 }.to_string(),
            "consumer rejected push with status 503"
        );
        assert_eq!(
            PushError::Unreachable("connection refused".to_string()).to_string(),
            "consumer unreachable: connection refused"
        );
    }
}
