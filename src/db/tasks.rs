//! Task claiming and result commits.
//!
//! Claims lock the selected rows with `FOR UPDATE ... SKIP LOCKED` so
//! concurrent checkers never receive the same task; the mark happens in
//! the same transaction.

use async_trait::async_trait;
use opentelemetry::KeyValue;
use tracing::{debug, error};

use super::{Db, begin};
use crate::error::{Error, Result};
use crate::model::*;
use crate::store::TaskStore;
use crate::telemetry::metrics;

async fn ensure_service(
    tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
    service_id: ServiceId,
) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM services WHERE id = $1)")
        .bind(service_id.0)
        .fetch_one(&mut **tx)
        .await?;
    if !exists {
        return Err(Error::NotConfigured(format!("service {service_id}")));
    }
    Ok(())
}

/// Reject a fallback team that does not exist before anything is written.
async fn ensure_team(
    tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
    team_id: TeamId,
) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM teams WHERE id = $1)")
        .bind(team_id.0)
        .fetch_one(&mut **tx)
        .await?;
    if !exists {
        return Err(Error::NotConfigured(format!("team {team_id}")));
    }
    Ok(())
}

#[async_trait]
impl TaskStore for Db {
    async fn count_open(&self, service_id: ServiceId, access: Access) -> Result<i64> {
        let mut tx = begin(&self.game, access).await?;
        ensure_service(&mut tx, service_id).await?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM tasks task JOIN game_control control ON task.tick = control.current_tick
             WHERE task.service_id = $1 AND task.claimed_at IS NULL",
        )
        .bind(service_id.0)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn claim_batch(
        &self,
        service_id: ServiceId,
        count: i64,
        access: Access,
    ) -> Result<Vec<ClaimedTask>> {
        let mut tx = begin(&self.game, access).await?;
        ensure_service(&mut tx, service_id).await?;

        let rows: Vec<ClaimRow> = sqlx::query_as(
            "SELECT task.id, task.team_id, task.tick, team.net_number
             FROM tasks task
             JOIN game_control control ON task.tick = control.current_tick
             JOIN teams team ON team.id = task.team_id
             WHERE task.claimed_at IS NULL AND task.service_id = $1
             ORDER BY random()
             LIMIT $2
             FOR UPDATE OF task SKIP LOCKED",
        )
        .bind(service_id.0)
        .bind(count.max(0))
        .fetch_all(&mut *tx)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        if !ids.is_empty() {
            sqlx::query("UPDATE tasks SET claimed_at = now() WHERE id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(service_id = %service_id, requested = count, claimed = ids.len(), "claimed tasks");
        metrics::tasks_claimed().add(
            ids.len() as u64,
            &[KeyValue::new("service_id", i64::from(service_id.0))],
        );

        Ok(rows.into_iter().map(ClaimedTask::from).collect())
    }

    async fn commit_result(&self, result: CheckResult, access: Access) -> Result<CommitOutcome> {
        let mut tx = begin(&self.game, access).await?;
        ensure_service(&mut tx, result.service_id).await?;

        let resolved: Option<i32> = sqlx::query_scalar("SELECT id FROM teams WHERE net_number = $1")
            .bind(result.net_number.0)
            .fetch_optional(&mut *tx)
            .await?;

        let team_id = match (resolved.map(TeamId), result.fallback_team) {
            (Some(id), _) => id,
            (None, Some(fallback)) => {
                ensure_team(&mut tx, fallback).await?;
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

        sqlx::query(
            "INSERT INTO outcomes (service_id, team_id, tick, status, timestamp)
             VALUES ($1, $2, $3, $4, now())",
        )
        .bind(result.service_id.0)
        .bind(team_id.0)
        .bind(result.tick)
        .bind(result.status.code())
        .execute(&mut *tx)
        .await?;

        let closed = sqlx::query(
            "UPDATE tasks SET closed_at = now()
             WHERE service_id = $1 AND team_id = $2 AND tick = $3 AND closed_at IS NULL",
        )
        .bind(result.service_id.0)
        .bind(team_id.0)
        .bind(result.tick)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        metrics::results_committed()
            .add(1, &[KeyValue::new("status", result.status.to_string())]);

        Ok(CommitOutcome::Recorded { team_id, closed })
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct ClaimRow {
    id: i64,
    team_id: i32,
    tick: i64,
    net_number: i32,
}

impl From<ClaimRow> for ClaimedTask {
    fn from(row: ClaimRow) -> Self {
        Self {
            task_id: TaskId(row.id),
            team_id: TeamId(row.team_id),
            net_number: NetNumber(row.net_number),
            tick: row.tick,
        }
    }
}
