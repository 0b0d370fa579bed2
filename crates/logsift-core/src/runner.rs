// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Top-level wiring: the stream collector, the optional batch-query
//! companion, and the storage upload, behind one `run` call.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::LogBackend;
use crate::batch_query::BatchQueryCollector;
use crate::collector::{CollectionResult, LogCollector};
use crate::config::Config;
use crate::error::Error;
use crate::timestamp::{QueryWindow, ResolvedWindow};
use crate::upload::LogUploader;

/// What one collection run produced and where it was stored.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    #[serde(flatten)]
    pub collection: CollectionResult,
    /// Storage key the flattened result was uploaded under.
    pub object_key: String,
    /// Set when the batch-query companion failed; the primary collection is
    /// kept either way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_query_error: Option<String>,
}

/// Collects logs for a group and uploads the flattened result.
pub struct CollectionRunner {
    collector: LogCollector,
    batch_query: Option<BatchQueryCollector>,
    uploader: Arc<dyn LogUploader + Send + Sync>,
    logs_bucket: String,
}

impl CollectionRunner {
    /// Validates the configuration before anything touches the network: an
    /// enabled companion with no output destination is rejected here.
    pub fn new(
        config: &Config,
        backend: Arc<dyn LogBackend + Send + Sync>,
        uploader: Arc<dyn LogUploader + Send + Sync>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let collector = LogCollector::new(
            backend,
            config.max_concurrent_requests,
            config.retry_policy(),
        );
        let batch_query = if config.collect_batch_query_logs {
            Some(BatchQueryCollector::new(
                config.query_url.clone(),
                config.batch_query_bucket.clone().unwrap_or_default(),
                config.batch_query_prefix.clone().unwrap_or_default(),
                config.retry_policy(),
                collector.permit_pool(),
                config.attempt_timeout,
            )?)
        } else {
            None
        };
        Ok(CollectionRunner {
            collector,
            batch_query,
            uploader,
            logs_bucket: config.logs_bucket.clone(),
        })
    }

    pub fn collector(&self) -> &LogCollector {
        &self.collector
    }

    /// Collects primary and companion logs concurrently, then uploads the
    /// flattened result. A companion failure is recorded on the outcome, not
    /// raised; a primary failure is.
    pub async fn run(&self, group: &str, window: &QueryWindow) -> Result<RunOutcome, Error> {
        let bounds = window.resolve()?;

        let (primary, companion) = tokio::join!(
            self.collector.collect(group, window),
            self.collect_companion(group, bounds),
        );
        let mut collection = primary?;

        let batch_query_error = match companion {
            Ok(events) => {
                collection.events.extend(events);
                None
            }
            Err(error) => {
                warn!("Batch-query collection for {group} failed: {error}");
                Some(error.to_string())
            }
        };

        let payload = serde_json::to_vec(&collection)
            .map_err(|e| Error::Upload(format!("serializing collected logs: {e}")))?;
        let object_key = object_key(group, bounds);
        self.uploader
            .upload(&self.logs_bucket, &object_key, Bytes::from(payload))
            .await?;
        info!(
            "Collected {} events from {} streams in {group}, uploaded as {object_key}",
            collection.events.len(),
            collection.streams_total
        );

        Ok(RunOutcome {
            collection,
            object_key,
            batch_query_error,
        })
    }

    async fn collect_companion(
        &self,
        group: &str,
        bounds: ResolvedWindow,
    ) -> Result<Vec<crate::backend::LogEvent>, Error> {
        match &self.batch_query {
            Some(collector) => collector.collect_logs(group, bounds).await,
            None => Ok(Vec::new()),
        }
    }
}

fn object_key(group: &str, bounds: ResolvedWindow) -> String {
    let group = group.trim_start_matches('/').replace('/', "-");
    let start = bounds
        .start_ms
        .map_or_else(|| "earliest".to_string(), |ms| ms.to_string());
    let end = bounds
        .end_ms
        .map_or_else(|| "latest".to_string(), |ms| ms.to_string());
    format!("{group}/{start}-{end}.json")
}
