// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lambda-style invocation boundary.
//!
//! Maps one request to one collection run and folds the outcome into a
//! `{statusCode, body}` answer: 400 for input problems, 500 for collection
//! failures, 200 with the flattened events otherwise.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::runner::CollectionRunner;
use crate::timestamp::QueryWindow;

/// One collection request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectRequest {
    pub log_group_name: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

/// The invocation answer. `body` is a JSON document: the serialized
/// [`crate::runner::RunOutcome`] on success, `{"message": ...}` otherwise.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectResponse {
    pub status_code: u16,
    pub body: String,
}

impl CollectResponse {
    fn message(status_code: u16, message: &str) -> Self {
        CollectResponse {
            status_code,
            body: json!({ "message": message }).to_string(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::message(400, message)
    }
}

/// Runs one collection for `request` and renders the outcome.
pub async fn handle(runner: &CollectionRunner, request: CollectRequest) -> CollectResponse {
    if request.log_group_name.trim().is_empty() {
        return CollectResponse::bad_request("log_group_name is required");
    }
    let window = QueryWindow::new(request.start_time, request.end_time);
    match runner.run(&request.log_group_name, &window).await {
        Ok(outcome) => match serde_json::to_string(&outcome) {
            Ok(body) => CollectResponse {
                status_code: 200,
                body,
            },
            Err(e) => {
                error!("Failed to serialize collection outcome: {e}");
                CollectResponse::message(500, "Failed to render collected logs")
            }
        },
        Err(error) if error.is_validation() => CollectResponse::bad_request(&error.to_string()),
        Err(error) => {
            error!(
                "Collection for {} failed: {error}",
                request.log_group_name
            );
            CollectResponse::message(500, "Failed to collect logs")
        }
    }
}
