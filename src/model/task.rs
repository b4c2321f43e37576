//! Tasks, check outcomes, and checker state keys.
//!
//! A task is "check this team's instance of this service during this
//! tick". It moves open → claimed → closed and is never reopened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::game::{NetNumber, ServiceId, TeamId};
use crate::error::Error;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub i64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of checker work for one (service, team, tick).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub service_id: ServiceId,
    pub team_id: TeamId,
    pub tick: i64,
    /// Set once when a checker claims the task.
    pub claimed_at: Option<DateTime<Utc>>,
    /// Set once when a result is committed for the task.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_open(&self) -> bool {
        self.claimed_at.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }
}

/// What a checker receives for each claimed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimedTask {
    pub task_id: TaskId,
    pub team_id: TeamId,
    pub net_number: NetNumber,
    pub tick: i64,
}

// ---------------------------------------------------------------------------
// Check status
// ---------------------------------------------------------------------------

/// Result of one check. Stored as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ok,
    Down,
    Faulty,
    FlagNotFound,
    Recovering,
}

impl CheckStatus {
    pub fn code(self) -> i16 {
        match self {
            CheckStatus::Ok => 0,
            CheckStatus::Down => 1,
            CheckStatus::Faulty => 2,
            CheckStatus::FlagNotFound => 3,
            CheckStatus::Recovering => 4,
        }
    }
}

impl TryFrom<i16> for CheckStatus {
    type Error = Error;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(CheckStatus::Ok),
            1 => Ok(CheckStatus::Down),
            2 => Ok(CheckStatus::Faulty),
            3 => Ok(CheckStatus::FlagNotFound),
            4 => Ok(CheckStatus::Recovering),
            other => Err(Error::Other(format!("unknown check status code: {other}"))),
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckStatus::Ok => "ok",
            CheckStatus::Down => "down",
            CheckStatus::Faulty => "faulty",
            CheckStatus::FlagNotFound => "flag_not_found",
            CheckStatus::Recovering => "recovering",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CheckStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(CheckStatus::Ok),
            "down" => Ok(CheckStatus::Down),
            "faulty" => Ok(CheckStatus::Faulty),
            "flag_not_found" => Ok(CheckStatus::FlagNotFound),
            "recovering" => Ok(CheckStatus::Recovering),
            _ => Err(Error::Other(format!("unknown check status: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A checker's report for one (service, team, tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub service_id: ServiceId,
    pub net_number: NetNumber,
    pub tick: i64,
    pub status: CheckStatus,
    /// Team to record against when `net_number` does not resolve.
    pub fallback_team: Option<TeamId>,
}

impl CheckResult {
    pub fn new(service_id: ServiceId, net_number: NetNumber, tick: i64, status: CheckStatus) -> Self {
        Self {
            service_id,
            net_number,
            tick,
            status,
            fallback_team: None,
        }
    }

    pub fn fallback_team(mut self, team_id: TeamId) -> Self {
        self.fallback_team = Some(team_id);
        self
    }
}

/// What happened when a result was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Outcome appended; `closed` tasks were closed.
    Recorded { team_id: TeamId, closed: u64 },
    /// Net number did not resolve and no fallback was given. Nothing written.
    Dropped,
}

/// An appended outcome row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub service_id: ServiceId,
    pub team_id: TeamId,
    pub tick: i64,
    pub status: CheckStatus,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Checker state
// ---------------------------------------------------------------------------

/// Key of one checker state blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub service_id: ServiceId,
    pub net_number: NetNumber,
    pub identifier: String,
}

impl StateKey {
    pub fn new(service_id: ServiceId, net_number: NetNumber, identifier: impl Into<String>) -> Self {
        Self {
            service_id,
            net_number,
            identifier: identifier.into(),
        }
    }
}
