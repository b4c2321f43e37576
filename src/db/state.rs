//! Checker state blobs in the state database.

use async_trait::async_trait;
use opentelemetry::KeyValue;

use super::{Db, begin};
use crate::error::Result;
use crate::model::{Access, StateKey};
use crate::store::StateStore;
use crate::telemetry::metrics;

#[async_trait]
impl StateStore for Db {
    async fn load_state(&self, key: &StateKey, access: Access) -> Result<Option<Vec<u8>>> {
        let mut tx = begin(&self.state, access).await?;
        let data: Option<Vec<u8>> = sqlx::query_scalar(
            "SELECT data FROM checker_state
             WHERE service_id = $1 AND team_net_number = $2 AND identifier = $3",
        )
        .bind(key.service_id.0)
        .bind(key.net_number.0)
        .bind(&key.identifier)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;

        metrics::state_operations().add(
            1,
            &[
                KeyValue::new("operation", "load"),
                KeyValue::new("hit", data.is_some()),
            ],
        );
        Ok(data)
    }

    async fn store_state(&self, key: &StateKey, data: &[u8], access: Access) -> Result<()> {
        let mut tx = begin(&self.state, access).await?;
        // Postgres checks write permission even when no conflict occurs.
        sqlx::query(
            "INSERT INTO checker_state (service_id, team_net_number, identifier, data)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (service_id, team_net_number, identifier)
             DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(key.service_id.0)
        .bind(key.net_number.0)
        .bind(&key.identifier)
        .bind(data)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        metrics::state_operations().add(1, &[KeyValue::new("operation", "store")]);
        Ok(())
    }
}
