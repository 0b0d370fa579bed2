// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The log-query gateway boundary: wire types, the backend trait, and the
//! HTTP implementation used in production.

use core::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{BackendError, Error};
use crate::pagination::Page;
use crate::timestamp::format_timestamp;

/// Header carrying the optional credential-profile selector. When absent the
/// gateway resolves ambient instance credentials.
const PROFILE_HEADER: &str = "x-credential-profile";

/// One log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub message: String,
    /// Opaque identifier usable for dedup downstream. Not every backend
    /// sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl LogEvent {
    /// The timestamp must render as ISO-8601 with millisecond precision;
    /// negative or out-of-range values cannot.
    pub fn validate(&self) -> Result<(), Error> {
        format_timestamp(self.timestamp).map(|_| ())
    }
}

/// A named sub-partition of a log group, produced by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStream {
    pub log_stream_name: String,
    /// Epoch milliseconds. Absent for streams that never received an event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_time: Option<i64>,
}

impl LogStream {
    pub fn validate(&self) -> Result<(), Error> {
        match self.last_event_time {
            Some(millis) => format_timestamp(millis).map(|_| ()),
            None => Ok(()),
        }
    }
}

/// The remote paginated log-query API.
///
/// Implementations surface failures through `Err`, never through sentinel
/// values in the payload.
#[async_trait]
pub trait LogBackend {
    /// One page of streams for `group`, ordered by last event time with the
    /// most recently active stream first.
    async fn describe_streams(
        &self,
        group: &str,
        next_token: Option<String>,
    ) -> Result<Page<LogStream>, BackendError>;

    /// One page of events for `stream`, bounded by the optional epoch-ms
    /// window, in the backend's forward order.
    async fn get_events(
        &self,
        group: &str,
        stream: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
        next_token: Option<String>,
    ) -> Result<Page<LogEvent>, BackendError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeStreamsResponse {
    #[serde(default)]
    log_streams: Vec<LogStream>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetEventsResponse {
    #[serde(default)]
    events: Vec<LogEvent>,
    next_forward_token: Option<String>,
}

/// Builds a reqwest client with the given request timeout. Uses rustls TLS.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Sends a request and deserializes the JSON answer, folding transport and
/// non-2xx outcomes into [`BackendError`].
pub(crate) async fn send_json<R: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<R, BackendError> {
    let response = request
        .send()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Service(format!("{status}: {body}")));
    }
    response
        .json::<R>()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))
}

/// Log backend speaking JSON to the query gateway.
///
/// The client handle is scoped to this struct; every logical operation builds
/// its own short-lived request from it.
#[derive(Debug, Clone)]
pub struct HttpLogBackend {
    client: reqwest::Client,
    endpoint: String,
    profile: Option<String>,
}

impl HttpLogBackend {
    pub fn new(
        endpoint: impl Into<String>,
        profile: Option<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = build_client(timeout)
            .map_err(|e| Error::InvalidConfig(format!("query client: {e}")))?;
        Ok(HttpLogBackend {
            client,
            endpoint: endpoint.into(),
            profile,
        })
    }

    fn request(&self, path: &str, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(format!("{}/{path}", self.endpoint))
            .json(body);
        if let Some(profile) = &self.profile {
            request = request.header(PROFILE_HEADER, profile);
        }
        request
    }
}

#[async_trait]
impl LogBackend for HttpLogBackend {
    async fn describe_streams(
        &self,
        group: &str,
        next_token: Option<String>,
    ) -> Result<Page<LogStream>, BackendError> {
        let mut body = json!({
            "logGroupName": group,
            "orderBy": "LastEventTime",
            "descending": true,
        });
        if let Some(token) = next_token {
            body["nextToken"] = json!(token);
        }
        let response: DescribeStreamsResponse =
            send_json(self.request("describe-streams", &body)).await?;
        Ok(Page::new(response.log_streams, response.next_token))
    }

    async fn get_events(
        &self,
        group: &str,
        stream: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
        next_token: Option<String>,
    ) -> Result<Page<LogEvent>, BackendError> {
        let mut body = json!({
            "logGroupName": group,
            "logStreamName": stream,
        });
        if let Some(start) = start_ms {
            body["startTime"] = json!(start);
        }
        if let Some(end) = end_ms {
            body["endTime"] = json!(end);
        }
        if let Some(token) = next_token {
            body["nextToken"] = json!(token);
        }
        let response: GetEventsResponse = send_json(self.request("get-events", &body)).await?;
        Ok(Page::new(response.events, response.next_forward_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_serde_shape() {
        let event = LogEvent {
            timestamp: 1_704_067_200_000,
            message: "hello".to_string(),
            event_id: Some("evt-1".to_string()),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"timestamp": 1_704_067_200_000_i64, "message": "hello", "eventId": "evt-1"})
        );
    }

    #[test]
    fn test_log_event_id_may_be_absent() {
        let event: LogEvent =
            serde_json::from_value(json!({"timestamp": 5, "message": "m"})).unwrap();
        assert_eq!(event.event_id, None);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"timestamp": 5, "message": "m"}));
    }

    #[test]
    fn test_log_stream_serde_shape() {
        let stream: LogStream = serde_json::from_value(json!({
            "logStreamName": "app/instance-1",
            "lastEventTime": 1_704_067_200_000_i64,
        }))
        .unwrap();
        assert_eq!(stream.log_stream_name, "app/instance-1");
        assert_eq!(stream.last_event_time, Some(1_704_067_200_000));
    }

    #[test]
    fn test_validation_rejects_negative_timestamps() {
        let event = LogEvent {
            timestamp: -1,
            message: String::new(),
            event_id: None,
        };
        assert!(event.validate().is_err());

        let stream = LogStream {
            log_stream_name: "s".to_string(),
            last_event_time: Some(-1),
        };
        assert!(stream.validate().is_err());
        let idle = LogStream {
            log_stream_name: "s".to_string(),
            last_event_time: None,
        };
        assert!(idle.validate().is_ok());
    }
}
