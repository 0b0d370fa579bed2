// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, error};

use crate::backend::build_client;
use crate::error::Error;

const MAX_UPLOAD_ATTEMPTS: u32 = 3;
const UPLOAD_BACKOFF_BASE_MS: u64 = 100;

/// Object-storage sink for collected logs.
#[async_trait]
pub trait LogUploader {
    async fn upload(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), Error>;
}

/// Uploads through the storage gateway.
///
/// Unlike the collection engine's retry loop, failed uploads back off
/// exponentially between attempts; a 4xx answer is terminal immediately.
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploader {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = build_client(timeout)
            .map_err(|e| Error::InvalidConfig(format!("storage client: {e}")))?;
        Ok(HttpUploader {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl LogUploader for HttpUploader {
    async fn upload(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), Error> {
        let url = format!("{}/{bucket}/{key}", self.endpoint);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let time = Instant::now();
            let response = self.client.put(&url).body(body.clone()).send().await;
            let elapsed = time.elapsed();

            match response {
                Ok(r) => {
                    let status = r.status();
                    if status.is_success() {
                        debug!(
                            "Uploaded {} bytes to {bucket}/{key} in {} ms",
                            body.len(),
                            elapsed.as_millis()
                        );
                        return Ok(());
                    }
                    let text = r.text().await.unwrap_or_default();
                    if status.is_client_error() {
                        error!("Upload to {bucket}/{key} was rejected: {status}: {text}");
                        return Err(Error::Upload(format!("{status}: {text}")));
                    }
                    error!("Upload to {bucket}/{key} failed with status {status} (attempt {attempts})");
                    if attempts >= MAX_UPLOAD_ATTEMPTS {
                        return Err(Error::Upload(format!("{status}: {text}")));
                    }
                }
                Err(e) => {
                    error!("Network error uploading to {bucket}/{key} (attempt {attempts}): {e:?}");
                    if attempts >= MAX_UPLOAD_ATTEMPTS {
                        return Err(Error::Upload(e.to_string()));
                    }
                }
            }
            let backoff_ms = UPLOAD_BACKOFF_BASE_MS * (2_u64.pow(attempts - 1));
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
    }
}
