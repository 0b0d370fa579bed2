// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Concurrent log collection across the streams of one log group.
//!
//! # Architecture
//!
//! ```text
//!   collect(group, window)
//!       │
//!       v
//!   ┌──────────────────┐
//!   │ Enumerate streams │ (paginated, permit-gated, retry-wrapped)
//!   └─────────┬────────┘
//!             │ one task per stream
//!             v
//!   ┌──────────────────┐
//!   │  Fetch streams    │ (bounded by the shared permit pool)
//!   └─────────┬────────┘
//!             │ per-stream outcomes, enumeration order
//!             v
//!   ┌──────────────────┐
//!   │     Flatten       │ (partial failures recorded, never raised)
//!   └──────────────────┘
//! ```
//!
//! One stream's permanent failure must not abort the others: every fetch
//! resolves to a [`StreamFetch`] carrying whatever was collected, and the
//! orchestrator folds failures into [`CollectionResult::failed_streams`].

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::backend::{LogBackend, LogEvent};
use crate::error::Error;
use crate::pagination::{paginate, Paginated};
use crate::retry::RetryPolicy;
use crate::timestamp::{QueryWindow, ResolvedWindow};

/// Outcome of fetching one stream. `error` is set when the page sequence
/// ended early; the events accumulated up to that point are kept.
#[derive(Debug)]
pub struct StreamFetch {
    pub log_stream_name: String,
    pub events: Vec<LogEvent>,
    pub error: Option<Error>,
}

/// A stream whose contribution to the collection is missing or truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFailure {
    pub log_stream_name: String,
    pub reason: String,
}

/// The flattened result of one collection run.
///
/// Events keep per-stream arrival order with streams concatenated in
/// enumeration order; sorting across streams is the consumer's concern.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResult {
    pub events: Vec<LogEvent>,
    pub streams_total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_streams: Vec<StreamFailure>,
}

impl CollectionResult {
    pub fn is_complete(&self) -> bool {
        self.failed_streams.is_empty()
    }
}

/// Orchestrates enumeration and per-stream fetches against one backend.
///
/// All in-flight requests, enumeration included, share a single permit pool
/// sized by `max_concurrent_requests`.
#[derive(Clone)]
pub struct LogCollector {
    backend: Arc<dyn LogBackend + Send + Sync>,
    permits: Arc<Semaphore>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl LogCollector {
    pub fn new(
        backend: Arc<dyn LogBackend + Send + Sync>,
        max_concurrent_requests: usize,
        retry: RetryPolicy,
    ) -> Self {
        LogCollector {
            backend,
            permits: Arc::new(Semaphore::new(max_concurrent_requests)),
            retry,
            cancel: CancellationToken::new(),
        }
    }

    /// Token cancelling in-flight permit waits and page fetches. Cancelled
    /// stream fetches surface as partial results.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The pool bounding simultaneous requests, shared with any collaborator
    /// that issues requests of its own.
    pub fn permit_pool(&self) -> Arc<Semaphore> {
        Arc::clone(&self.permits)
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit, Error> {
        tokio::select! {
            // Checked first so a cancelled collector never wins the race
            // against an already-free permit.
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            permit = Arc::clone(&self.permits).acquire_owned() => {
                Ok(permit.expect("permit pool closed"))
            }
        }
    }

    /// All stream names for `group`, most recently active first.
    ///
    /// Holds one permit across the whole enumeration. Failure here is
    /// catastrophic: with no stream list there is nothing to fan out.
    pub async fn stream_names(&self, group: &str) -> Result<Vec<String>, Error> {
        let _permit = self.acquire_permit().await?;
        let streams = paginate(|token| {
            let backend = Arc::clone(&self.backend);
            async move {
                self.retry
                    .execute("describe log streams", || {
                        backend.describe_streams(group, token.clone())
                    })
                    .await
            }
        })
        .await
        .into_result()?;
        Ok(streams
            .into_iter()
            .map(|stream| stream.log_stream_name)
            .collect())
    }

    /// Every event for one stream within the pre-resolved window.
    ///
    /// Never fails: a fatal timeout, an exhausted retry budget, and a
    /// cancellation all yield the same shape, a partial result with the
    /// error recorded next to it.
    pub async fn fetch_stream(
        &self,
        group: &str,
        stream_name: &str,
        bounds: ResolvedWindow,
    ) -> StreamFetch {
        let _permit = match self.acquire_permit().await {
            Ok(permit) => permit,
            Err(error) => {
                return StreamFetch {
                    log_stream_name: stream_name.to_string(),
                    events: Vec::new(),
                    error: Some(error),
                }
            }
        };
        let label = format!("fetch log events from {stream_name}");
        let Paginated { items, error } = paginate(|token| {
            let backend = Arc::clone(&self.backend);
            let label = label.clone();
            async move {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => Err(Error::Cancelled),
                    page = self.retry.execute(&label, || {
                        backend.get_events(
                            group,
                            stream_name,
                            bounds.start_ms,
                            bounds.end_ms,
                            token.clone(),
                        )
                    }) => page,
                }
            }
        })
        .await;
        if let Some(error) = &error {
            warn!("Stream {stream_name} returned a partial result: {error}");
        }
        StreamFetch {
            log_stream_name: stream_name.to_string(),
            events: items,
            error,
        }
    }

    /// Collects every event in `group` within `window`.
    ///
    /// The window is validated before any request goes out. Stream
    /// enumeration failures propagate; per-stream failures, including a
    /// panicked fetch task, are folded into the result instead.
    pub async fn collect(
        &self,
        group: &str,
        window: &QueryWindow,
    ) -> Result<CollectionResult, Error> {
        let bounds = window.resolve()?;
        let stream_names = self.stream_names(group).await?;
        debug!(
            "Collecting {} streams from log group {group}",
            stream_names.len()
        );

        let mut tasks = Vec::with_capacity(stream_names.len());
        for name in &stream_names {
            let collector = self.clone();
            let group = group.to_string();
            let name = name.clone();
            tasks.push(tokio::spawn(async move {
                collector.fetch_stream(&group, &name, bounds).await
            }));
        }

        let mut result = CollectionResult {
            streams_total: stream_names.len(),
            ..CollectionResult::default()
        };
        // Tasks already run concurrently; awaiting the handles in order keeps
        // the output in enumeration order.
        for (name, task) in stream_names.iter().zip(tasks) {
            match task.await {
                Ok(fetch) => {
                    if let Some(error) = fetch.error {
                        result.failed_streams.push(StreamFailure {
                            log_stream_name: fetch.log_stream_name,
                            reason: error.to_string(),
                        });
                    }
                    result.events.extend(fetch.events);
                }
                Err(join_error) => {
                    error!("Fetch task for stream {name} aborted: {join_error}");
                    result.failed_streams.push(StreamFailure {
                        log_stream_name: name.clone(),
                        reason: Error::TaskAborted(join_error.to_string()).to_string(),
                    });
                }
            }
        }
        Ok(result)
    }
}
