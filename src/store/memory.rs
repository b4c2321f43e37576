//! In-process store with the same semantics as the Postgres backend.
//!
//! One mutex guards all tables, and every operation holds it for its whole
//! duration. That makes each claim, commit and tick advance a single atomic
//! unit across tasks and threads.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use opentelemetry::KeyValue;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;
use tracing::error;

use super::{ControlStore, StateStore, TaskStore, VpnStatusStore};
use crate::error::{Error, Result};
use crate::model::*;
use crate::telemetry::metrics;

/// Mutex-guarded in-memory game and state tables.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    control: Option<Control>,
    services: Vec<Service>,
    teams: Vec<Team>,
    tasks: Vec<Task>,
    outcomes: Vec<OutcomeRecord>,
    state: HashMap<StateKey, Vec<u8>>,
    vpn_status: Vec<VpnStatusRecord>,
}

fn ensure_writable(access: Access, operation: &str) -> Result<()> {
    if access.is_read_only() {
        return Err(Error::PermissionDenied(format!(
            "{operation} is not allowed under read-only access"
        )));
    }
    Ok(())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure (or reconfigure) the competition. Resets the current tick to -1.
    pub async fn configure(&self, start: DateTime<Utc>, tick_duration: TimeDelta, valid_ticks: i64) {
        self.inner.lock().await.control = Some(Control {
            start,
            tick_duration,
            valid_ticks,
            current_tick: -1,
        });
    }

    /// Overwrite the current tick, e.g. to resume from a known position.
    pub async fn set_current_tick(&self, tick: i64) -> Result<()> {
        let mut tables = self.inner.lock().await;
        let control = tables
            .control
            .as_mut()
            .ok_or_else(|| Error::NotConfigured("game control".to_string()))?;
        control.current_tick = tick;
        Ok(())
    }

    pub async fn add_service(&self, name: &str, slug: &str) -> Service {
        let mut tables = self.inner.lock().await;
        let service = Service {
            id: ServiceId(tables.services.len() as i32 + 1),
            name: name.to_string(),
            slug: slug.to_string(),
        };
        tables.services.push(service.clone());
        service
    }

    pub async fn add_team(&self, net_number: i32) -> Team {
        let mut tables = self.inner.lock().await;
        let team = Team {
            id: TeamId(tables.teams.len() as i32 + 1),
            net_number: NetNumber(net_number),
            active: true,
        };
        tables.teams.push(team);
        team
    }

    pub async fn set_team_active(&self, team_id: TeamId, active: bool) -> Result<()> {
        let mut tables = self.inner.lock().await;
        let team = tables
            .teams
            .iter_mut()
            .find(|t| t.id == team_id)
            .ok_or_else(|| Error::NotConfigured(format!("team {team_id}")))?;
        team.active = active;
        Ok(())
    }

    /// Snapshot of all tasks ever minted.
    pub async fn tasks(&self) -> Vec<Task> {
        self.inner.lock().await.tasks.clone()
    }

    /// Snapshot of the outcome log.
    pub async fn outcomes(&self) -> Vec<OutcomeRecord> {
        self.inner.lock().await.outcomes.clone()
    }

    /// Snapshot of the stored reachability samples.
    pub async fn vpn_results(&self) -> Vec<VpnStatusRecord> {
        self.inner.lock().await.vpn_status.clone()
    }
}

impl Tables {
    fn current_tick(&self) -> Option<i64> {
        self.control.as_ref().map(|c| c.current_tick)
    }

    fn service(&self, id: ServiceId) -> Result<&Service> {
        self.services
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotConfigured(format!("service {id}")))
    }

    fn team(&self, id: TeamId) -> Result<&Team> {
        self.teams
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotConfigured(format!("team {id}")))
    }

    fn advance(&mut self, from: i64) -> Result<u64> {
        let found = self.current_tick();
        if found != Some(from) {
            return Err(Error::TickConflict {
                expected: from,
                found,
            });
        }
        let tick = from + 1;
        let mut next_id = self.tasks.len() as i64 + 1;
        let mut created = 0;
        for service in &self.services {
            for team in &self.teams {
                self.tasks.push(Task {
                    id: TaskId(next_id),
                    service_id: service.id,
                    team_id: team.id,
                    tick,
                    claimed_at: None,
                    closed_at: None,
                });
                next_id += 1;
                created += 1;
            }
        }
        if let Some(control) = self.control.as_mut() {
            control.current_tick = tick;
        }
        Ok(created)
    }

    fn open_at_current_tick(&self, service_id: ServiceId) -> Vec<usize> {
        let Some(tick) = self.current_tick() else {
            return Vec::new();
        };
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.service_id == service_id && t.tick == tick && t.is_open())
            .map(|(i, _)| i)
            .collect()
    }

    fn claim(&mut self, service_id: ServiceId, count: i64) -> Vec<ClaimedTask> {
        let open = self.open_at_current_tick(service_id);
        let amount = usize::try_from(count.max(0)).unwrap_or(usize::MAX);
        let chosen: Vec<usize> = open
            .choose_multiple(&mut rand::thread_rng(), amount)
            .copied()
            .collect();

        let now = Utc::now();
        let mut claimed = Vec::with_capacity(chosen.len());
        for idx in chosen {
            let team_id = self.tasks[idx].team_id;
            let Some(team) = self.teams.iter().find(|t| t.id == team_id).copied() else {
                continue;
            };
            let task = &mut self.tasks[idx];
            task.claimed_at = Some(now);
            claimed.push(ClaimedTask {
                task_id: task.id,
                team_id,
                net_number: team.net_number,
                tick: task.tick,
            });
        }
        claimed
    }

    fn commit(&mut self, result: CheckResult, access: Access) -> Result<CommitOutcome> {
        self.service(result.service_id)?;

        let resolved = self
            .teams
            .iter()
            .find(|t| t.net_number == result.net_number)
            .map(|t| t.id);
        let team_id = match (resolved, result.fallback_team) {
            (Some(id), _) => id,
            (None, Some(fallback)) => {
                self.team(fallback)?;
                fallback
            }
            (None, None) => {
                error!(
                    net_number = %result.net_number,
                    "no team found with net number, cannot commit result"
                );
                metrics::results_dropped().add(1, &[]);
                return Ok(CommitOutcome::Dropped);
            }
        };

        ensure_writable(access, "commit result")?;

        let now = Utc::now();
        self.outcomes.push(OutcomeRecord {
            service_id: result.service_id,
            team_id,
            tick: result.tick,
            status: result.status,
            timestamp: now,
        });

        let mut closed = 0;
        for task in self.tasks.iter_mut().filter(|t| {
            t.service_id == result.service_id
                && t.team_id == team_id
                && t.tick == result.tick
                && !t.is_closed()
        }) {
            task.closed_at = Some(now);
            closed += 1;
        }

        metrics::results_committed()
            .add(1, &[KeyValue::new("status", result.status.to_string())]);
        Ok(CommitOutcome::Recorded { team_id, closed })
    }
}

#[async_trait]
impl ControlStore for MemoryStore {
    async fn control(&self, _access: Access) -> Result<Option<Control>> {
        Ok(self.inner.lock().await.control.clone())
    }

    async fn service_by_slug(&self, slug: &str, _access: Access) -> Result<Service> {
        self.inner
            .lock()
            .await
            .services
            .iter()
            .find(|s| s.slug == slug)
            .cloned()
            .ok_or_else(|| Error::NotConfigured(format!("service '{slug}'")))
    }

    async fn advance_tick(&self, from: i64, access: Access) -> Result<u64> {
        ensure_writable(access, "tick advance")?;
        self.inner.lock().await.advance(from)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn count_open(&self, service_id: ServiceId, _access: Access) -> Result<i64> {
        let tables = self.inner.lock().await;
        tables.service(service_id)?;
        Ok(tables.open_at_current_tick(service_id).len() as i64)
    }

    async fn claim_batch(
        &self,
        service_id: ServiceId,
        count: i64,
        access: Access,
    ) -> Result<Vec<ClaimedTask>> {
        let mut tables = self.inner.lock().await;
        tables.service(service_id)?;
        ensure_writable(access, "task claim")?;
        Ok(tables.claim(service_id, count))
    }

    async fn commit_result(&self, result: CheckResult, access: Access) -> Result<CommitOutcome> {
        self.inner.lock().await.commit(result, access)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load_state(&self, key: &StateKey, _access: Access) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.lock().await.state.get(key).cloned())
    }

    async fn store_state(&self, key: &StateKey, data: &[u8], access: Access) -> Result<()> {
        ensure_writable(access, "state store")?;
        self.inner
            .lock()
            .await
            .state
            .insert(key.clone(), data.to_vec());
        Ok(())
    }
}

#[async_trait]
impl VpnStatusStore for MemoryStore {
    async fn active_teams(&self, _access: Access) -> Result<Vec<Team>> {
        let tables = self.inner.lock().await;
        let mut teams: Vec<Team> = tables.teams.iter().filter(|t| t.active).copied().collect();
        teams.sort_by_key(|t| t.id);
        Ok(teams)
    }

    async fn add_vpn_results(&self, results: &[VpnStatus], access: Access) -> Result<u64> {
        let mut tables = self.inner.lock().await;
        for result in results {
            tables.team(result.team_id)?;
        }
        ensure_writable(access, "vpn status insert")?;

        let now = Utc::now();
        tables
            .vpn_status
            .extend(results.iter().map(|&status| VpnStatusRecord {
                status,
                timestamp: now,
            }));
        metrics::vpn_results().add(results.len() as u64, &[]);
        Ok(results.len() as u64)
    }
}
