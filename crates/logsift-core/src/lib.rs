// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Logsift Core
//!
//! Concurrent, rate-limited, fault-tolerant collection of log events from a
//! paginated log-query gateway, assembled into one ordered result set for
//! upload to object storage.
//!
//! ## Architecture
//!
//! The library is organized leaf-first:
//! - [`timestamp`]: textual timestamps ⇄ epoch milliseconds, query windows
//! - [`retry`]: bounded-attempt retry with a fatal per-attempt deadline
//! - [`pagination`]: token-paged draining with stuck-cursor detection
//! - [`backend`]: the log-query gateway trait, wire types, HTTP client
//! - [`collector`]: per-stream fetching and the fan-out orchestrator
//! - [`batch_query`]: the companion batch-query collector
//! - [`upload`]: the object-storage sink
//! - [`runner`] / [`handler`]: wiring and the Lambda-style boundary
//!
//! ## Failure containment
//!
//! Per-stream failures never cross a task boundary as errors: each fetch
//! resolves to a typed outcome, and streams that came back incomplete are
//! reported on [`collector::CollectionResult::failed_streams`].

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

/// Log-query gateway boundary: wire types, trait, HTTP implementation
pub mod backend;

/// Companion batch-query collector
pub mod batch_query;

/// Stream fetching and the collection orchestrator
pub mod collector;

/// Environment-driven configuration
pub mod config;

/// Error taxonomy
pub mod error;

/// Lambda-style invocation boundary
pub mod handler;

/// Token-paged resource draining
pub mod pagination;

/// Bounded-attempt retry with per-attempt deadlines
pub mod retry;

/// Top-level wiring of collector, companion, and upload
pub mod runner;

/// Timestamp codec and query windows
pub mod timestamp;

/// Object-storage upload
pub mod upload;

pub use backend::{HttpLogBackend, LogBackend, LogEvent, LogStream};
pub use batch_query::BatchQueryCollector;
pub use collector::{CollectionResult, LogCollector, StreamFailure, StreamFetch};
pub use config::Config;
pub use error::{BackendError, Error};
pub use handler::{handle, CollectRequest, CollectResponse};
pub use pagination::{paginate, Page, Paginated};
pub use retry::RetryPolicy;
pub use runner::{CollectionRunner, RunOutcome};
pub use timestamp::{format_timestamp, parse_timestamp, QueryWindow, ResolvedWindow};
pub use upload::{HttpUploader, LogUploader};
