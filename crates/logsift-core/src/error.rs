// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Failures raised by the query gateway.
///
/// `Transport` covers everything that kept the request from completing
/// (connection refused, DNS, a torn response body); `Service` is an error
/// answer from the gateway itself. Both are retryable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("service error: {0}")]
    Service(String),
}

/// Errors that can occur while collecting logs
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// A single attempt exceeded its deadline. Never retried.
    #[error("{label}: attempt timed out after {timeout:?}")]
    AttemptTimeout { label: String, timeout: Duration },

    /// The retry budget ran out; wraps the last failure seen.
    #[error("{label}: retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        label: String,
        attempts: usize,
        #[source]
        source: BackendError,
    },

    #[error("Operation cancelled")]
    Cancelled,

    /// A fetch task died outside its own error handling (panic or abort).
    #[error("Fetch task aborted: {0}")]
    TaskAborted(String),

    #[error("Batch query failed: {0}")]
    BatchQuery(String),

    #[error("Upload failed: {0}")]
    Upload(String),
}

impl Error {
    /// Caller-input problems, surfaced as a 400 at the invocation boundary.
    /// Everything else maps to a 500.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_) | Error::InvalidTimestamp { .. }
        )
    }
}
