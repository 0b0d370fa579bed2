// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Conversion between the textual timestamps accepted at the invocation
//! boundary and the epoch-millisecond values the query gateway speaks.
//!
//! Both directions are pure: inputs are always interpreted as UTC,
//! independent of the host timezone.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Accepted wire format for window bounds, e.g. `2024-01-01T00:00:00.000000Z`.
/// The fraction may carry 1-9 digits; precision beyond milliseconds is
/// truncated on conversion.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Render format for epoch-millisecond values, always 3 fraction digits.
const ISO_MILLIS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Parses a UTC timestamp into epoch milliseconds.
pub fn parse_timestamp(text: &str) -> Result<i64, Error> {
    // `%.f` treats a missing fraction as zero; the wire format requires one.
    if !text.contains('.') {
        return Err(Error::InvalidTimestamp {
            value: text.to_string(),
            reason: "missing fractional seconds".to_string(),
        });
    }
    let parsed = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map_err(|e| {
        Error::InvalidTimestamp {
            value: text.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(parsed.and_utc().timestamp_millis())
}

/// Renders epoch milliseconds as an ISO-8601 UTC timestamp with millisecond
/// precision. Negative or out-of-range values cannot be rendered.
pub fn format_timestamp(millis: i64) -> Result<String, Error> {
    if millis < 0 {
        return Err(Error::InvalidTimestamp {
            value: millis.to_string(),
            reason: "negative epoch milliseconds".to_string(),
        });
    }
    let timestamp =
        DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| Error::InvalidTimestamp {
            value: millis.to_string(),
            reason: "out of range for a calendar date".to_string(),
        })?;
    Ok(timestamp.format(ISO_MILLIS_FORMAT).to_string())
}

/// The time window of one collection run. Either bound may be absent, which
/// leaves that side unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// A validated window, converted to the gateway's epoch-millisecond bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}

impl QueryWindow {
    pub fn new(start_time: Option<String>, end_time: Option<String>) -> Self {
        QueryWindow {
            start_time,
            end_time,
        }
    }

    /// Validates and converts both bounds. Called once per collection run,
    /// before any network activity.
    pub fn resolve(&self) -> Result<ResolvedWindow, Error> {
        let start_ms = self
            .start_time
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;
        let end_ms = self.end_time.as_deref().map(parse_timestamp).transpose()?;
        Ok(ResolvedWindow { start_ms, end_ms })
    }
}
