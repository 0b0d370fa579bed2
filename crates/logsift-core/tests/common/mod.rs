// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for the collection engine: a scripted in-memory backend with
//! concurrency accounting and a recording uploader.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use logsift_core::{
    BackendError, Config, Error, LogBackend, LogEvent, LogStream, LogUploader, Page,
};

/// Scripted in-memory log backend.
///
/// Streams are served in insertion order; pagination tokens are plain
/// offsets. Call counts and the in-flight high-water mark are tracked so
/// tests can assert on pagination behavior and the concurrency cap.
#[derive(Default)]
pub struct FakeBackend {
    streams: Vec<LogStream>,
    events: HashMap<String, Vec<LogEvent>>,
    streams_page_size: Option<usize>,
    events_page_size: Option<usize>,
    failing_streams: HashSet<String>,
    /// stream -> number of calls that fail before the stream recovers
    flaky_streams: HashMap<String, usize>,
    /// stream -> number of pages served before every further call fails
    truncated_streams: HashMap<String, usize>,
    fail_enumeration: bool,
    per_call_delay: Duration,
    calls_per_stream: Mutex<HashMap<String, usize>>,
    describe_calls: AtomicUsize,
    event_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    observed_bounds: Mutex<Option<(Option<i64>, Option<i64>)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        FakeBackend::default()
    }

    pub fn with_stream(mut self, name: &str, events: Vec<LogEvent>) -> Self {
        self.streams.push(LogStream {
            log_stream_name: name.to_string(),
            last_event_time: events.iter().map(|e| e.timestamp).max(),
        });
        self.events.insert(name.to_string(), events);
        self
    }

    /// A stream whose every fetch fails.
    pub fn with_failing_stream(mut self, name: &str) -> Self {
        self.streams.push(LogStream {
            log_stream_name: name.to_string(),
            last_event_time: None,
        });
        self.failing_streams.insert(name.to_string());
        self
    }

    /// A stream that fails `failures` times, then serves its events.
    pub fn with_flaky_stream(mut self, name: &str, failures: usize, events: Vec<LogEvent>) -> Self {
        self = self.with_stream(name, events);
        self.flaky_streams.insert(name.to_string(), failures);
        self
    }

    /// A stream that serves `ok_pages` pages and fails on every call after.
    pub fn with_truncated_stream(
        mut self,
        name: &str,
        ok_pages: usize,
        events: Vec<LogEvent>,
    ) -> Self {
        self = self.with_stream(name, events);
        self.truncated_streams.insert(name.to_string(), ok_pages);
        self
    }

    pub fn with_page_sizes(mut self, streams: usize, events: usize) -> Self {
        self.streams_page_size = Some(streams);
        self.events_page_size = Some(events);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.per_call_delay = delay;
        self
    }

    pub fn with_failing_enumeration(mut self) -> Self {
        self.fail_enumeration = true;
        self
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn event_calls(&self) -> usize {
        self.event_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.describe_calls() + self.event_calls()
    }

    /// Highest number of simultaneously in-flight backend calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// The start/end bounds seen on the most recent event fetch.
    pub fn observed_bounds(&self) -> Option<(Option<i64>, Option<i64>)> {
        *self.observed_bounds.lock().unwrap()
    }

    fn track(&self) -> InFlightGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            counter: &self.in_flight,
        }
    }

    fn page_of<T: Clone>(items: &[T], token: Option<&str>, page_size: Option<usize>) -> Page<T> {
        let offset: usize = token.map_or(0, |t| t.parse().unwrap_or(0));
        let page_size = page_size.unwrap_or(usize::MAX);
        let page: Vec<T> = items.iter().skip(offset).take(page_size).cloned().collect();
        let next = offset + page.len();
        let next_token = (next < items.len()).then(|| next.to_string());
        Page::new(page, next_token)
    }
}

struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LogBackend for FakeBackend {
    async fn describe_streams(
        &self,
        _group: &str,
        next_token: Option<String>,
    ) -> Result<Page<LogStream>, BackendError> {
        let _guard = self.track();
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if self.per_call_delay > Duration::ZERO {
            tokio::time::sleep(self.per_call_delay).await;
        }
        if self.fail_enumeration {
            return Err(BackendError::Service("enumeration unavailable".to_string()));
        }
        Ok(Self::page_of(
            &self.streams,
            next_token.as_deref(),
            self.streams_page_size,
        ))
    }

    async fn get_events(
        &self,
        _group: &str,
        stream: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
        next_token: Option<String>,
    ) -> Result<Page<LogEvent>, BackendError> {
        let _guard = self.track();
        self.event_calls.fetch_add(1, Ordering::SeqCst);
        *self.observed_bounds.lock().unwrap() = Some((start_ms, end_ms));
        if self.per_call_delay > Duration::ZERO {
            tokio::time::sleep(self.per_call_delay).await;
        }

        if self.failing_streams.contains(stream) {
            return Err(BackendError::Service(format!("stream {stream} unavailable")));
        }

        let call_index = {
            let mut calls = self.calls_per_stream.lock().unwrap();
            let entry = calls.entry(stream.to_string()).or_insert(0);
            let index = *entry;
            *entry += 1;
            index
        };
        if let Some(&failures) = self.flaky_streams.get(stream) {
            if call_index < failures {
                return Err(BackendError::Transport(format!(
                    "stream {stream} connection reset"
                )));
            }
        }
        if let Some(&ok_pages) = self.truncated_streams.get(stream) {
            if call_index >= ok_pages {
                return Err(BackendError::Service(format!("stream {stream} went away")));
            }
        }

        let events = self.events.get(stream).cloned().unwrap_or_default();
        let in_window: Vec<LogEvent> = events
            .into_iter()
            .filter(|e| {
                start_ms.map_or(true, |start| e.timestamp >= start)
                    && end_ms.map_or(true, |end| e.timestamp <= end)
            })
            .collect();
        Ok(Self::page_of(
            &in_window,
            next_token.as_deref(),
            self.events_page_size,
        ))
    }
}

/// Uploader that records every call and always succeeds.
#[derive(Default)]
pub struct RecordingUploader {
    pub uploads: Mutex<Vec<(String, String, Bytes)>>,
}

#[async_trait]
impl LogUploader for RecordingUploader {
    async fn upload(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), Error> {
        self.uploads
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string(), body));
        Ok(())
    }
}

pub fn event(timestamp: i64, message: &str) -> LogEvent {
    LogEvent {
        timestamp,
        message: message.to_string(),
        event_id: None,
    }
}

/// Config pointing at unroutable endpoints: anything that actually dials the
/// network in a test fails loudly.
pub fn test_config() -> Config {
    Config {
        query_url: "http://127.0.0.1:9".to_string(),
        storage_url: "http://127.0.0.1:9".to_string(),
        logs_bucket: "collected-logs".to_string(),
        max_concurrent_requests: 10,
        max_attempts: 3,
        attempt_timeout: Duration::from_secs(5),
        collect_batch_query_logs: false,
        batch_query_bucket: None,
        batch_query_prefix: None,
        profile: None,
    }
}
