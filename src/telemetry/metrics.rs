//! Metric instrument factories for nivaran-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"nivaran-rs"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for nivaran-rs instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("nivaran-rs")
}

/// Counter: assignment attempts.
/// Labels: `path` ("submit" | "sweep"),
/// `result` ("assigned" | "queued" | "no_capacity" | "stale").
pub fn assignments() -> Counter<u64> {
    meter()
        .u64_counter("nivaran.assign.attempts")
        .with_description("Number of assignment attempts")
        .build()
}

/// Counter: complaint status transitions.
/// Labels: `from`, `to`.
pub fn status_transitions() -> Counter<u64> {
    meter()
        .u64_counter("nivaran.complaint.status_transitions")
        .with_description("Number of complaint status transitions")
        .build()
}

/// Counter: backlog operations (enqueue, mark_assigned, mark_error).
/// Labels: `operation`.
pub fn backlog_operations() -> Counter<u64> {
    meter()
        .u64_counter("nivaran.backlog.operations")
        .with_description("Number of backlog operations")
        .build()
}

/// Counter: sweep ticks completed.
pub fn sweep_ticks() -> Counter<u64> {
    meter()
        .u64_counter("nivaran.sweep.ticks")
        .with_description("Number of completed sweep ticks")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("nivaran.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
