// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One-shot collection agent: reads a JSON [`CollectRequest`] from stdin,
//! runs the collection, and writes the JSON response to stdout. Intended to
//! be driven by a Lambda-style custom runtime shim.

use std::io::Read;
use std::sync::Arc;

use logsift_core::{
    handle, CollectRequest, CollectResponse, CollectionRunner, Config, HttpLogBackend,
    HttpUploader,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let backend =
        match HttpLogBackend::new(&config.query_url, config.profile.clone(), config.attempt_timeout)
        {
            Ok(backend) => backend,
            Err(e) => {
                error!("Failed to build query client: {e}");
                std::process::exit(1);
            }
        };
    let uploader = match HttpUploader::new(&config.storage_url, config.attempt_timeout) {
        Ok(uploader) => uploader,
        Err(e) => {
            error!("Failed to build storage client: {e}");
            std::process::exit(1);
        }
    };
    let runner = match CollectionRunner::new(&config, Arc::new(backend), Arc::new(uploader)) {
        Ok(runner) => runner,
        Err(e) => {
            error!("Failed to start collection runner: {e}");
            std::process::exit(1);
        }
    };

    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        error!("Failed to read request from stdin: {e}");
        std::process::exit(1);
    }
    let response = match serde_json::from_str::<CollectRequest>(&input) {
        Ok(request) => handle(&runner, request).await,
        Err(e) => CollectResponse::bad_request(&format!("malformed request: {e}")),
    };

    println!("{}", serde_json::to_string(&response).unwrap_or_default());
}
