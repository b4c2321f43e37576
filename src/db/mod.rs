//! Database connection pools, migrations, and health check.
//!
//! The game database holds control, services, teams, tasks, outcomes and
//! reachability samples.
//! Checker state may live in a separate state database; when none is
//! configured both roles share one pool.

pub mod control;
pub mod state;
pub mod tasks;
pub mod vpn;

use crate::error::Result;
use crate::model::Access;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool, Postgres, Transaction};
use tracing::info;

/// Database handle. Owns the game and state connection pools.
pub struct Db {
    game: PgPool,
    state: PgPool,
    separate_state: bool,
}

impl Db {
    /// Connect to one Postgres database used for both game and state data.
    pub async fn connect(url: &str) -> Result<Self> {
        let game = pool(url).await?;
        info!("established connection to game database");
        Ok(Self {
            state: game.clone(),
            game,
            separate_state: false,
        })
    }

    /// Connect to the game database and, if given, a separate state database.
    pub async fn connect_with_state(game_url: &str, state_url: Option<&str>) -> Result<Self> {
        let Some(state_url) = state_url else {
            return Self::connect(game_url).await;
        };
        let game = pool(game_url).await?;
        info!("established connection to game database");
        let state = pool(state_url).await?;
        info!("established connection to state database");
        Ok(Self {
            game,
            state,
            separate_state: true,
        })
    }

    /// Run pending migrations. A separate state database only gets the
    /// checker state table.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.game).await?;
        if self.separate_state {
            sqlx::migrate!("./state_migrations").run(&self.state).await?;
        }
        Ok(())
    }

    /// Run a SELECT 1 on each pool.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.game).await?;
        if self.separate_state {
            sqlx::query("SELECT 1").execute(&self.state).await?;
        }
        Ok(())
    }

    /// Pool of the game database.
    pub fn game_pool(&self) -> &PgPool {
        &self.game
    }

    /// Pool of the state database.
    pub fn state_pool(&self) -> &PgPool {
        &self.state
    }
}

/// Connections always use UTC so tick arithmetic is unambiguous.
async fn pool(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET TIME ZONE 'UTC'").await?;
                Ok(())
            })
        })
        .connect(url)
        .await?;
    Ok(pool)
}

/// Begin a transaction in the given access mode.
///
/// `ReadOnly` makes Postgres reject every write in the transaction with
/// SQLSTATE 25006, which surfaces as `Error::PermissionDenied`.
pub(crate) async fn begin(pool: &PgPool, access: Access) -> Result<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await?;
    if access.is_read_only() {
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
    }
    Ok(tx)
}
