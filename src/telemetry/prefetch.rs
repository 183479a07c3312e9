//! Span helpers for prefetch workers.

use tracing::Span;

/// Start a span covering the load of one work item.
///
/// `prefetch.outcome` is declared empty and filled in by
/// [`record_outcome`].
pub fn start_load_span(index: usize, artifacts: usize) -> Span {
    tracing::debug_span!(
        "prefetch.load",
        "prefetch.index" = index,
        "prefetch.artifacts" = artifacts,
        "prefetch.outcome" = tracing::field::Empty,
    )
}

/// Record how a load ended ("ok" or "error") on its span.
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("prefetch.outcome", outcome);
}
