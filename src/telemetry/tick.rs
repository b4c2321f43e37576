//! Span helpers for scheduler steps and checker batches.

use tracing::Span;

/// Start a span for one scheduler step.
///
/// `tick.decision` and `tick.current` are declared empty and filled via
/// [`record_decision`].
pub fn start_step_span(nonstop: bool) -> Span {
    tracing::info_span!(
        "tick.step",
        "tick.nonstop" = nonstop,
        "tick.decision" = tracing::field::Empty,
        "tick.current" = tracing::field::Empty,
    )
}

/// Record the outcome of a step on its span.
pub fn record_decision(span: &Span, decision: &str, current_tick: Option<i64>) {
    span.record("tick.decision", decision);
    if let Some(tick) = current_tick {
        span.record("tick.current", tick);
    }
}

/// Start a span for one checker batch of a service.
pub fn start_batch_span(service: &str) -> Span {
    tracing::info_span!(
        "checker.batch",
        "checker.service" = service,
        "checker.claimed" = tracing::field::Empty,
    )
}

/// Record how many tasks a batch claimed.
pub fn record_claimed(span: &Span, claimed: usize) {
    span.record("checker.claimed", claimed as u64);
}
