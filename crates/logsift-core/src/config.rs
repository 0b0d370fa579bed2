// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;
use crate::retry::{RetryPolicy, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS};

pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;

const ENV_QUERY_URL: &str = "LOGSIFT_QUERY_URL";
const ENV_STORAGE_URL: &str = "LOGSIFT_STORAGE_URL";
const ENV_LOGS_BUCKET: &str = "LOGSIFT_LOGS_BUCKET";
const ENV_MAX_CONCURRENT_REQUESTS: &str = "LOGSIFT_MAX_CONCURRENT_REQUESTS";
const ENV_MAX_ATTEMPTS: &str = "LOGSIFT_MAX_ATTEMPTS";
const ENV_ATTEMPT_TIMEOUT_SECS: &str = "LOGSIFT_ATTEMPT_TIMEOUT_SECS";
const ENV_COLLECT_BATCH_QUERY_LOGS: &str = "LOGSIFT_COLLECT_BATCH_QUERY_LOGS";
const ENV_BATCH_QUERY_BUCKET: &str = "LOGSIFT_BATCH_QUERY_BUCKET";
const ENV_BATCH_QUERY_PREFIX: &str = "LOGSIFT_BATCH_QUERY_PREFIX";
const ENV_PROFILE: &str = "LOGSIFT_PROFILE";

/// Collector configuration, normally read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the log-query gateway.
    pub query_url: String,
    /// Base URL of the storage gateway collected logs are uploaded through.
    pub storage_url: String,
    /// Destination bucket for collected logs.
    pub logs_bucket: String,
    /// Cap on simultaneous in-flight requests, shared across stream
    /// enumeration and all per-stream fetches.
    pub max_concurrent_requests: usize,
    pub max_attempts: usize,
    pub attempt_timeout: Duration,
    /// Whether the batch-query companion runs alongside stream collection.
    pub collect_batch_query_logs: bool,
    pub batch_query_bucket: Option<String>,
    pub batch_query_prefix: Option<String>,
    /// Credential-profile selector forwarded to the gateways. Absent means
    /// ambient instance credentials.
    pub profile: Option<String>,
}

impl Config {
    /// Reads and validates the configuration from `LOGSIFT_*` environment
    /// variables. Validation failures surface before any network activity.
    pub fn from_env() -> Result<Config, Error> {
        let config = Config {
            query_url: require_env(ENV_QUERY_URL)?,
            storage_url: require_env(ENV_STORAGE_URL)?,
            logs_bucket: require_env(ENV_LOGS_BUCKET)?,
            max_concurrent_requests: parse_env(
                ENV_MAX_CONCURRENT_REQUESTS,
                DEFAULT_MAX_CONCURRENT_REQUESTS,
            )?,
            max_attempts: parse_env(ENV_MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS)?,
            attempt_timeout: Duration::from_secs(parse_env(
                ENV_ATTEMPT_TIMEOUT_SECS,
                DEFAULT_ATTEMPT_TIMEOUT.as_secs(),
            )?),
            collect_batch_query_logs: env::var(ENV_COLLECT_BATCH_QUERY_LOGS)
                .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            batch_query_bucket: optional_env(ENV_BATCH_QUERY_BUCKET),
            batch_query_prefix: optional_env(ENV_BATCH_QUERY_PREFIX),
            profile: optional_env(ENV_PROFILE),
        };
        config.validate()?;
        Ok(config)
    }

    /// The batch-query companion needs its output destination up front, so a
    /// misconfiguration fails here rather than mid-collection.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_concurrent_requests == 0 {
            return Err(Error::InvalidConfig(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.collect_batch_query_logs {
            let missing: Vec<&str> = [
                ("batch_query_bucket", &self.batch_query_bucket),
                ("batch_query_prefix", &self.batch_query_prefix),
            ]
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
            .map(|(name, _)| *name)
            .collect();
            if !missing.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "the following parameters are required when batch-query collection is enabled: {}",
                    missing.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.attempt_timeout)
    }
}

fn require_env(name: &str) -> Result<String, Error> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::InvalidConfig(format!("{name} environment variable is not set")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T, Error> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::InvalidConfig(format!("{name} is not a valid value: {raw}"))),
    }
}
