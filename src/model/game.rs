//! Competition reference data: control record, services, teams.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Access
// ---------------------------------------------------------------------------

/// Permission mode for a storage transaction.
///
/// Under `ReadOnly`, every mutation fails with
/// [`Error::PermissionDenied`](crate::error::Error::PermissionDenied)
/// instead of taking effect or being skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    ReadWrite,
    ReadOnly,
}

impl Access {
    pub fn is_read_only(self) -> bool {
        self == Access::ReadOnly
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Access::ReadWrite => "read_write",
            Access::ReadOnly => "read_only",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub i32);

/// Stable numeric team handle used by checkers instead of the internal id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetNumber(pub i32);

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for NetNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Control
// ---------------------------------------------------------------------------

/// The competition control record. Single row, mutated only by the
/// tick scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub start: DateTime<Utc>,
    pub tick_duration: TimeDelta,
    /// Number of ticks in the nominal competition window.
    pub valid_ticks: i64,
    /// Last tick minted. -1 before the first tick.
    pub current_tick: i64,
}

impl Control {
    /// Duration of `n` ticks.
    pub fn ticks(&self, n: i64) -> TimeDelta {
        TimeDelta::try_milliseconds(self.tick_duration.num_milliseconds().saturating_mul(n))
            .unwrap_or(TimeDelta::MAX)
    }

    /// Wall-clock start of tick `tick`.
    pub fn tick_start(&self, tick: i64) -> DateTime<Utc> {
        self.offset(self.ticks(tick))
    }

    /// Wall-clock end of tick `tick` (start of the next one).
    pub fn tick_end(&self, tick: i64) -> DateTime<Utc> {
        self.tick_start(tick.saturating_add(1))
    }

    /// End of the nominal competition window.
    pub fn end(&self) -> DateTime<Utc> {
        self.offset(self.ticks(self.valid_ticks))
    }

    /// Whether `now` lies inside the nominal window.
    pub fn is_running(&self, now: DateTime<Utc>) -> bool {
        now >= self.start && now < self.end()
    }

    /// Tick index implied by the wall clock, or `None` before start.
    ///
    /// Returns `None` as well when the tick duration is not positive.
    pub fn target_tick(&self, now: DateTime<Utc>) -> Option<i64> {
        let duration_ms = self.tick_duration.num_milliseconds();
        if now < self.start || duration_ms <= 0 {
            return None;
        }
        let elapsed_ms = (now - self.start).num_milliseconds();
        Some(elapsed_ms / duration_ms)
    }

    fn offset(&self, delta: TimeDelta) -> DateTime<Utc> {
        self.start
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

// ---------------------------------------------------------------------------
// Service / Team
// ---------------------------------------------------------------------------

/// A monitored target. Looked up by slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub net_number: NetNumber,
    /// Inactive teams still get tasks but are skipped by network checks.
    pub active: bool,
}
