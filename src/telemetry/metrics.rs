//! Metric instrument factories for tickwork.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"tickwork"` meter.

use opentelemetry::metrics::{Counter, Gauge, Meter};

/// Returns the shared meter for tickwork instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("tickwork")
}

/// Gauge: the competition's current tick after each scheduler step.
pub fn current_tick() -> Gauge<i64> {
    meter()
        .i64_gauge("tickwork.tick.current")
        .with_description("Current competition tick")
        .build()
}

/// Counter: ticks advanced by the scheduler.
pub fn ticks_advanced() -> Counter<u64> {
    meter()
        .u64_counter("tickwork.tick.advanced")
        .with_description("Number of ticks advanced")
        .build()
}

/// Counter: tasks minted on tick advance.
pub fn tasks_created() -> Counter<u64> {
    meter()
        .u64_counter("tickwork.tasks.created")
        .with_description("Number of tasks created")
        .build()
}

/// Counter: tasks handed out to checkers.
/// Labels: `service_id`.
pub fn tasks_claimed() -> Counter<u64> {
    meter()
        .u64_counter("tickwork.tasks.claimed")
        .with_description("Number of tasks claimed by checkers")
        .build()
}

/// Counter: check results recorded.
/// Labels: `status`.
pub fn results_committed() -> Counter<u64> {
    meter()
        .u64_counter("tickwork.results.committed")
        .with_description("Number of check results committed")
        .build()
}

/// Counter: check results dropped because the team did not resolve.
pub fn results_dropped() -> Counter<u64> {
    meter()
        .u64_counter("tickwork.results.dropped")
        .with_description("Check results dropped for unknown net numbers")
        .build()
}

/// Counter: checker state loads and stores.
/// Labels: `operation` ("load" | "store"), `hit` on loads.
pub fn state_operations() -> Counter<u64> {
    meter()
        .u64_counter("tickwork.state.operations")
        .with_description("Number of checker state operations")
        .build()
}

/// Counter: team reachability samples stored.
pub fn vpn_results() -> Counter<u64> {
    meter()
        .u64_counter("tickwork.vpn.results")
        .with_description("Number of team reachability samples stored")
        .build()
}
