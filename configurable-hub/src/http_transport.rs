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

//! [`PushTransport`] over HTTP POST.

use async_trait::async_trait;
use siri_hub::{PushError, PushPayload, PushTransport};
use std::time::Duration;

pub struct HttpPushTransport {
    client: reqwest::Client,
}

impl HttpPushTransport {
    pub fn new(connect_timeout: Duration, socket_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(socket_timeout)
            .build()?;
        Ok(Self { client })
    }
}

fn classify(err: reqwest::Error) -> PushError {
    if err.is_timeout() {
        PushError::Timeout
    } else if err.is_connect() || err.is_builder() {
        PushError::Unreachable(err.to_string())
    } else {
        PushError::Other(err.to_string())
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn post(&self, address: &str, payload: &PushPayload) -> Result<(), PushError> {
        let mut request = self
            .client
            .post(address)
            .header(reqwest::header::CONTENT_TYPE, payload.content_type)
            .body(payload.body.clone());
        for (name, value) in &payload.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PushError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HttpPushTransport;
    use siri_hub::{
        PushError, PushPayload, PushTransport, JSON_CONTENT_TYPE, SUBSCRIPTION_ID_HEADER,
    };
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn payload() -> PushPayload {
        PushPayload {
            body: br#"{"heartbeatNotification":{}}"#.to_vec(),
            content_type: JSON_CONTENT_TYPE,
            headers: vec![(SUBSCRIPTION_ID_HEADER.to_string(), "hb".to_string())],
        }
    }

    async fn respond_once(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = format!("http://{}/push", listener.local_addr().expect("local addr"));
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buffer = vec![0_u8; 4096];
            let _ = socket.read(&mut buffer).await;
            let response = format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            let _ = socket.write_all(response.as_bytes()).await;
        });
        address
    }

    fn transport() -> HttpPushTransport {
        HttpPushTransport::new(Duration::from_secs(1), Duration::from_secs(2))
            .expect("client should build")
    }

    #[tokio::test]
    async fn successful_status_is_ok() {
        let address = respond_once("HTTP/1.1 200 OK").await;
        assert_eq!(transport().post(&address, &payload()).await, Ok(()));
    }

    #[tokio::test]
    async fn error_status_is_rejected() {
        let address = respond_once("HTTP/1.1 503 Service Unavailable").await;
        assert_eq!(
            transport().post(&address, &payload()).await,
            Err(PushError::Rejected { status: 503 })
        );
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = format!("http://{}/push", listener.local_addr().expect("local addr"));
        drop(listener);

        let result = transport().post(&address, &payload()).await;
        assert!(matches!(result, Err(PushError::Unreachable(_))));
    }
}
