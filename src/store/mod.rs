//! Storage traits shared by the Postgres and in-memory backends.
//!
//! Every operation takes an [`Access`] mode for its transaction. Every
//! multi-step mutation is all-or-nothing.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::*;

pub use memory::MemoryStore;

/// Competition control and reference data, as seen by the tick scheduler.
#[async_trait]
pub trait ControlStore: Send + Sync {
    /// Read the control record. `None` when it is absent or has no start.
    async fn control(&self, access: Access) -> Result<Option<Control>>;

    /// Resolve a service by slug. Missing services are `NotConfigured`.
    async fn service_by_slug(&self, slug: &str, access: Access) -> Result<Service>;

    /// Move the current tick from `from` to `from + 1` and mint one task per
    /// (service, team) pair for the new tick. Returns the number of tasks
    /// created.
    ///
    /// Fails with `TickConflict` if the stored tick is no longer `from`.
    async fn advance_tick(&self, from: i64, access: Access) -> Result<u64>;
}

/// Task distribution and result recording, as seen by checkers.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Number of open tasks of the service at the current tick.
    async fn count_open(&self, service_id: ServiceId, access: Access) -> Result<i64>;

    /// Atomically claim up to `count` random open tasks of the service at
    /// the current tick. Concurrent callers never receive the same task.
    async fn claim_batch(
        &self,
        service_id: ServiceId,
        count: i64,
        access: Access,
    ) -> Result<Vec<ClaimedTask>>;

    /// Append an outcome and close the matching task in one transaction.
    async fn commit_result(&self, result: CheckResult, access: Access) -> Result<CommitOutcome>;
}

/// Opaque per-(service, team) checker state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load a blob. `None` if the key was never stored.
    async fn load_state(&self, key: &StateKey, access: Access) -> Result<Option<Vec<u8>>>;

    /// Create or overwrite a blob.
    async fn store_state(&self, key: &StateKey, data: &[u8], access: Access) -> Result<()>;
}

/// Team network reachability, as seen by the VPN status checker.
#[async_trait]
pub trait VpnStatusStore: Send + Sync {
    /// Active teams ordered by id.
    async fn active_teams(&self, access: Access) -> Result<Vec<Team>>;

    /// Insert one sample per entry in a single transaction. Either every
    /// sample is stored or none is. Returns the number of rows written.
    async fn add_vpn_results(&self, results: &[VpnStatus], access: Access) -> Result<u64>;
}
