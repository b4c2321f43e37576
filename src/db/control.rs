//! Control record, service lookup, and tick advance.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use super::{Db, begin};
use crate::error::{Error, Result};
use crate::model::*;
use crate::store::ControlStore;

#[async_trait]
impl ControlStore for Db {
    async fn control(&self, access: Access) -> Result<Option<Control>> {
        let mut tx = begin(&self.game, access).await?;
        let row: Option<ControlRow> = sqlx::query_as(
            "SELECT start, tick_duration_secs, valid_ticks, current_tick FROM game_control",
        )
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row.and_then(ControlRow::into_control))
    }

    async fn service_by_slug(&self, slug: &str, access: Access) -> Result<Service> {
        let mut tx = begin(&self.game, access).await?;
        let row: Option<(i32, String, String)> =
            sqlx::query_as("SELECT id, name, slug FROM services WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&mut *tx)
                .await?;
        tx.commit().await?;

        let (id, name, slug) =
            row.ok_or_else(|| Error::NotConfigured(format!("service '{slug}'")))?;
        Ok(Service {
            id: ServiceId(id),
            name,
            slug,
        })
    }

    async fn advance_tick(&self, from: i64, access: Access) -> Result<u64> {
        let tick = from + 1;
        let mut tx = begin(&self.game, access).await?;

        let updated = sqlx::query(
            "UPDATE game_control SET current_tick = $1 WHERE current_tick = $2",
        )
        .bind(tick)
        .bind(from)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            let found: Option<i64> = sqlx::query_scalar("SELECT current_tick FROM game_control")
                .fetch_optional(&mut *tx)
                .await?;
            return Err(Error::TickConflict {
                expected: from,
                found,
            });
        }

        let created = sqlx::query(
            "INSERT INTO tasks (service_id, team_id, tick)
             SELECT service.id, team.id, $1
             FROM services service CROSS JOIN teams team",
        )
        .bind(tick)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(created)
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct ControlRow {
    start: Option<DateTime<Utc>>,
    tick_duration_secs: i32,
    valid_ticks: i32,
    current_tick: i64,
}

impl ControlRow {
    /// A row without a start time counts as not configured.
    fn into_control(self) -> Option<Control> {
        Some(Control {
            start: self.start?,
            tick_duration: TimeDelta::seconds(i64::from(self.tick_duration_secs)),
            valid_ticks: i64::from(self.valid_ticks),
            current_tick: self.current_tick,
        })
    }
}
