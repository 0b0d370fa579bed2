// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded-attempt retry with a hard per-attempt deadline.
//!
//! The policy is deliberately asymmetric: an errored attempt is retried
//! immediately until the budget runs out, while a timed-out attempt is fatal
//! on the spot. Retrying after a deadline miss would stack another full
//! timeout on top of a backend that is already not answering.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{BackendError, Error};

pub const DEFAULT_MAX_ATTEMPTS: usize = 100;
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry policy applied around every gateway request.
///
/// Attached at the call site rather than baked into any client, so the same
/// policy wraps stream enumeration, event fetches, and batch queries alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, attempt_timeout: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            attempt_timeout,
        }
    }

    /// Runs `operation` until it succeeds, times out, or the attempt budget
    /// is exhausted. The success value is returned unchanged; `label` names
    /// the operation in errors and logs.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut attempts = 0;
        loop {
            match tokio::time::timeout(self.attempt_timeout, operation()).await {
                Err(_elapsed) => {
                    return Err(Error::AttemptTimeout {
                        label: label.to_string(),
                        timeout: self.attempt_timeout,
                    });
                }
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(source)) => {
                    attempts += 1;
                    if attempts >= self.max_attempts {
                        return Err(Error::RetriesExhausted {
                            label: label.to_string(),
                            attempts,
                            source,
                        });
                    }
                    debug!(
                        "{label}: attempt {attempts}/{} failed, retrying: {source}",
                        self.max_attempts
                    );
                }
            }
        }
    }
}
