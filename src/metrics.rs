// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for catalog-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding process is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `catalog_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: get_description, set_description, status, encode, decode
//! - `status`: ok, throttled, error, rejected
//! - `source`: record, memory, reconciled

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a remote request outcome as seen by the channel worker.
pub fn record_remote_request(operation: &str, status: &str) {
    counter!(
        "catalog_sync_remote_requests_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record the delay the channel inserted before a request to honor spacing.
pub fn record_spacing_delay(delay: Duration) {
    histogram!("catalog_sync_request_spacing_delay_seconds").record(delay.as_secs_f64());
}

/// Set current request queue depth.
pub fn set_queue_depth(depth: usize) {
    gauge!("catalog_sync_queue_depth").set(depth as f64);
}

/// Record one throttle-and-requeue cycle.
pub fn record_throttle_retry() {
    counter!("catalog_sync_throttle_retries_total").increment(1);
}

/// Record a status resolution and where the answer came from.
pub fn record_status_resolution(source: &str) {
    counter!(
        "catalog_sync_status_resolutions_total",
        "source" => source.to_string()
    )
    .increment(1);
}

/// Record a detected and resolved recognized+draft contradiction.
pub fn record_contradiction_resolved() {
    counter!("catalog_sync_contradictions_resolved_total").increment(1);
}

/// Record status resolution latency.
pub fn record_status_latency(duration: Duration) {
    histogram!("catalog_sync_status_seconds").record(duration.as_secs_f64());
}

/// Record a codec operation.
pub fn record_codec(operation: &str, sections: usize) {
    counter!(
        "catalog_sync_codec_operations_total",
        "operation" => operation.to_string()
    )
    .increment(1);
    histogram!(
        "catalog_sync_codec_sections",
        "operation" => operation.to_string()
    )
    .record(sections as f64);
}

/// Record a degraded reconciliation pass (remote unavailable, local-only answer).
pub fn record_degraded_pass(reason: &str) {
    counter!(
        "catalog_sync_degraded_passes_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}
