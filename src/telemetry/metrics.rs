//! Metric instrument factories for tracefetch.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`;
//! without one the instruments are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("tracefetch")
}

/// Counter: work items handed to a worker.
pub fn items_dispatched() -> Counter<u64> {
    meter()
        .u64_counter("tracefetch.prefetch.dispatched")
        .with_description("Number of work items dispatched to a worker")
        .build()
}

/// Counter: finished workers.
/// Labels: `result` ("ok" | "error").
pub fn items_loaded() -> Counter<u64> {
    meter()
        .u64_counter("tracefetch.prefetch.loaded")
        .with_description("Number of work items whose load finished")
        .build()
}

/// Counter: times the dispatcher had to wait.
/// Labels: `reason` ("parallelism" | "look_ahead").
pub fn dispatch_throttled() -> Counter<u64> {
    meter()
        .u64_counter("tracefetch.prefetch.throttled")
        .with_description("Number of dispatcher waits on a throttle")
        .build()
}

/// Histogram: time to load all accepted artifacts of one work item.
/// Labels: `result`.
pub fn load_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("tracefetch.prefetch.load_duration_ms")
        .with_description("Work item load duration in milliseconds")
        .with_unit("ms")
        .build()
}
