// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Companion collector for batch query results.
//!
//! One query per collection run: submit, poll until the gateway reports a
//! terminal state, then drain the result pages. The gateway also
//! materializes the results under the configured output bucket/prefix.

use core::time::Duration;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::backend::{build_client, send_json, LogEvent};
use crate::error::Error;
use crate::pagination::{paginate, Page};
use crate::retry::RetryPolicy;
use crate::timestamp::ResolvedWindow;

const QUERY_POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Poll budget before a query is declared stuck.
const MAX_QUERY_POLLS: usize = 240;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuerySubmitted {
    query_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryStatus {
    state: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResultsPage {
    #[serde(default)]
    events: Vec<LogEvent>,
    next_token: Option<String>,
}

/// Collects the events a batch query produces for a group/window.
pub struct BatchQueryCollector {
    client: reqwest::Client,
    endpoint: String,
    output_bucket: String,
    output_prefix: String,
    retry: RetryPolicy,
    permits: Arc<Semaphore>,
}

impl BatchQueryCollector {
    /// Fails fast when the output destination is incomplete.
    pub fn new(
        endpoint: impl Into<String>,
        output_bucket: impl Into<String>,
        output_prefix: impl Into<String>,
        retry: RetryPolicy,
        permits: Arc<Semaphore>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let output_bucket = output_bucket.into();
        let output_prefix = output_prefix.into();
        if output_bucket.is_empty() || output_prefix.is_empty() {
            return Err(Error::InvalidConfig(
                "batch-query collection requires an output bucket and prefix".to_string(),
            ));
        }
        let client = build_client(timeout)
            .map_err(|e| Error::InvalidConfig(format!("batch-query client: {e}")))?;
        Ok(BatchQueryCollector {
            client,
            endpoint: endpoint.into(),
            output_bucket,
            output_prefix,
            retry,
            permits,
        })
    }

    /// Runs one query and returns its events. Holds one permit from the
    /// shared pool for the whole run.
    pub async fn collect_logs(
        &self,
        group: &str,
        bounds: ResolvedWindow,
    ) -> Result<Vec<LogEvent>, Error> {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("permit pool closed");

        let query_id = self.submit(group, bounds).await?;
        debug!("Batch query {query_id} submitted for log group {group}");
        self.wait_until_done(&query_id).await?;
        let query_id = query_id.as_str();
        paginate(|token| async move {
            self.retry
                .execute("fetch batch query results", || {
                    self.results_page(query_id, token.clone())
                })
                .await
        })
        .await
        .into_result()
    }

    async fn submit(&self, group: &str, bounds: ResolvedWindow) -> Result<String, Error> {
        let mut body = json!({
            "logGroupName": group,
            "outputLocation": format!("s3://{}/{}", self.output_bucket, self.output_prefix),
        });
        if let Some(start) = bounds.start_ms {
            body["startTime"] = json!(start);
        }
        if let Some(end) = bounds.end_ms {
            body["endTime"] = json!(end);
        }
        let url = format!("{}/batch-queries", self.endpoint);
        let submitted: QuerySubmitted = self
            .retry
            .execute("submit batch query", || {
                send_json(self.client.post(&url).json(&body))
            })
            .await?;
        Ok(submitted.query_id)
    }

    async fn wait_until_done(&self, query_id: &str) -> Result<(), Error> {
        let url = format!("{}/batch-queries/{query_id}", self.endpoint);
        for _ in 0..MAX_QUERY_POLLS {
            let status: QueryStatus = self
                .retry
                .execute("poll batch query", || send_json(self.client.get(&url)))
                .await?;
            match status.state.as_str() {
                "SUCCEEDED" => return Ok(()),
                "FAILED" | "CANCELLED" => {
                    return Err(Error::BatchQuery(format!(
                        "query {query_id} ended in state {}: {}",
                        status.state,
                        status.reason.unwrap_or_default()
                    )));
                }
                _ => tokio::time::sleep(QUERY_POLL_INTERVAL).await,
            }
        }
        Err(Error::BatchQuery(format!(
            "query {query_id} did not complete after {MAX_QUERY_POLLS} polls"
        )))
    }

    async fn results_page(
        &self,
        query_id: &str,
        token: Option<String>,
    ) -> Result<Page<LogEvent>, crate::error::BackendError> {
        let url = format!("{}/batch-queries/{query_id}/results", self.endpoint);
        let request = match token {
            Some(token) => self.client.get(&url).query(&[("nextToken", token)]),
            None => self.client.get(&url),
        };
        let page: QueryResultsPage = send_json(request).await?;
        Ok(Page::new(page.events, page.next_token))
    }
}
