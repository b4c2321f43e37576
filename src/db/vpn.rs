//! Active team listing and batched reachability results.

use async_trait::async_trait;

use super::{Db, begin};
use crate::error::{Error, Result};
use crate::model::*;
use crate::store::VpnStatusStore;
use crate::telemetry::metrics;

#[async_trait]
impl VpnStatusStore for Db {
    async fn active_teams(&self, access: Access) -> Result<Vec<Team>> {
        let mut tx = begin(&self.game, access).await?;
        let rows: Vec<(i32, i32)> =
            sqlx::query_as("SELECT id, net_number FROM teams WHERE active ORDER BY id")
                .fetch_all(&mut *tx)
                .await?;
        tx.commit().await?;

        Ok(rows
            .into_iter()
            .map(|(id, net_number)| Team {
                id: TeamId(id),
                net_number: NetNumber(net_number),
                active: true,
            })
            .collect())
    }

    async fn add_vpn_results(&self, results: &[VpnStatus], access: Access) -> Result<u64> {
        let team_ids: Vec<i32> = results.iter().map(|r| r.team_id.0).collect();
        let mut tx = begin(&self.game, access).await?;

        let missing: Option<i32> = sqlx::query_scalar(
            "SELECT id FROM UNNEST($1::int4[]) AS id
             WHERE id NOT IN (SELECT id FROM teams)
             LIMIT 1",
        )
        .bind(&team_ids)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(id) = missing {
            return Err(Error::NotConfigured(format!("team {id}")));
        }

        // Runs even for an empty batch so read-only access is always rejected.
        let inserted = sqlx::query(
            "INSERT INTO vpn_status (team_id, wireguard_handshake_time, gateway_ping_rtt_ms,
                 demo_ping_rtt_ms, demo_service_ok, vulnbox_ping_rtt_ms, vulnbox_service_ok,
                 timestamp)
             SELECT *, now() FROM UNNEST(
                 $1::int4[], $2::timestamptz[], $3::int4[], $4::int4[],
                 $5::bool[], $6::int4[], $7::bool[])",
        )
        .bind(&team_ids)
        .bind(
            results
                .iter()
                .map(|r| r.wireguard_handshake_time)
                .collect::<Vec<_>>(),
        )
        .bind(results.iter().map(|r| r.gateway_ping_rtt_ms).collect::<Vec<_>>())
        .bind(results.iter().map(|r| r.demo_ping_rtt_ms).collect::<Vec<_>>())
        .bind(results.iter().map(|r| r.demo_service_ok).collect::<Vec<_>>())
        .bind(results.iter().map(|r| r.vulnbox_ping_rtt_ms).collect::<Vec<_>>())
        .bind(results.iter().map(|r| r.vulnbox_service_ok).collect::<Vec<_>>())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        metrics::vpn_results().add(inserted, &[]);
        Ok(inserted)
    }
}
