//! Tick scheduler: one decision per call, advancing at most one tick.
//!
//! The caller samples the wall clock once and passes it in; the same
//! instant drives both the target tick and the idle time. Catch-up after
//! downtime happens one tick per step, each returning a zero wait.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{Instrument, debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{Access, Control};
use crate::store::ControlStore;
use crate::telemetry::metrics;
use crate::telemetry::tick::{record_decision, start_step_span};

/// Idle time while unconfigured, before start, and after the end.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// What a step decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No control record, or no start time.
    NotConfigured,
    /// The competition has not started.
    BeforeStart,
    /// `tick` was minted with `tasks` tasks.
    Advanced { tick: i64, tasks: u64 },
    /// Caught up; waiting for the next tick boundary.
    Waiting { current_tick: i64 },
    /// Past the nominal end and not running nonstop.
    Ended { current_tick: i64 },
}

impl Decision {
    pub fn name(&self) -> &'static str {
        match self {
            Decision::NotConfigured => "not_configured",
            Decision::BeforeStart => "before_start",
            Decision::Advanced { .. } => "advanced",
            Decision::Waiting { .. } => "waiting",
            Decision::Ended { .. } => "ended",
        }
    }
}

/// Result of one scheduler step: the decision and the waits the driver
/// must perform, in order, before the next step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub decision: Decision,
    pub waits: Vec<Duration>,
}

impl Step {
    fn new(decision: Decision, waits: Vec<Duration>) -> Self {
        Self { decision, waits }
    }

    /// Sum of all waits.
    pub fn total_wait(&self) -> Duration {
        self.waits.iter().sum()
    }
}

/// What the control record implies at `now`, before touching storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    BeforeStart,
    /// Advance from `from` to `from + 1`.
    Advance { from: i64 },
    /// Caught up; idle until the next tick boundary.
    Wait(Duration),
    /// Window closed and not nonstop.
    Ended,
}

/// Decide what to do at `now`.
///
/// Advancing is permitted while `now` lies before the nominal end, or
/// always in nonstop mode. At most one tick is advanced regardless of how
/// far behind the wall clock the stored tick is.
pub fn plan(control: &Control, now: DateTime<Utc>, nonstop: bool) -> Result<Plan> {
    if control.tick_duration <= TimeDelta::zero() {
        return Err(Error::Misconfigured(format!(
            "tick duration must be positive, got {}s",
            control.tick_duration.num_seconds()
        )));
    }

    let Some(target) = control.target_tick(now) else {
        return Ok(Plan::BeforeStart);
    };

    let permitted = nonstop || now < control.end();
    if !permitted {
        return Ok(Plan::Ended);
    }

    if control.current_tick < target {
        return Ok(Plan::Advance {
            from: control.current_tick,
        });
    }

    let elapsed = now - control.start;
    let remaining = control.ticks(control.current_tick + 1) - elapsed;
    Ok(Plan::Wait(remaining.to_std().unwrap_or(Duration::ZERO)))
}

/// Single-writer tick scheduler over a [`ControlStore`].
pub struct TickScheduler<S> {
    store: Arc<S>,
    access: Access,
}

impl<S: ControlStore> TickScheduler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            access: Access::ReadWrite,
        }
    }

    /// Run steps under the given access mode. Under `ReadOnly`, a step that
    /// would advance fails with `PermissionDenied`.
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// Perform one scheduling decision at `now`.
    pub async fn step(&self, now: DateTime<Utc>, nonstop: bool) -> Result<Step> {
        let span = start_step_span(nonstop);
        async {
            let Some(control) = self.store.control(self.access).await? else {
                warn!("competition start and tick duration must be configured in the database");
                record_decision(&span, "not_configured", None);
                return Ok(Step::new(Decision::NotConfigured, vec![POLL_INTERVAL]));
            };

            let step = match plan(&control, now, nonstop)? {
                Plan::BeforeStart => {
                    debug!(start = %control.start, "competition has not started");
                    Step::new(Decision::BeforeStart, vec![POLL_INTERVAL])
                }
                Plan::Advance { from } => {
                    let tick = from + 1;
                    let tasks = self.store.advance_tick(from, self.access).await?;
                    info!(tick, tasks, "advanced tick");
                    metrics::ticks_advanced().add(1, &[]);
                    metrics::tasks_created().add(tasks, &[]);
                    metrics::current_tick().record(tick, &[]);
                    Step::new(Decision::Advanced { tick, tasks }, vec![Duration::ZERO])
                }
                Plan::Wait(remaining) => {
                    debug!(
                        current_tick = control.current_tick,
                        remaining_ms = remaining.as_millis() as u64,
                        "waiting for next tick"
                    );
                    metrics::current_tick().record(control.current_tick, &[]);
                    Step::new(
                        Decision::Waiting {
                            current_tick: control.current_tick,
                        },
                        vec![remaining],
                    )
                }
                Plan::Ended => {
                    debug!(end = %control.end(), "competition is over");
                    Step::new(
                        Decision::Ended {
                            current_tick: control.current_tick,
                        },
                        vec![Duration::ZERO, POLL_INTERVAL],
                    )
                }
            };

            let current = match step.decision {
                Decision::Advanced { tick, .. } => Some(tick),
                _ => Some(control.current_tick),
            };
            record_decision(&span, step.decision.name(), current);
            Ok(step)
        }
        .instrument(span.clone())
        .await
    }
}
