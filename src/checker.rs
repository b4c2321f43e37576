//! Checker-side session bound to one service and one access mode.
//!
//! A checker claims a batch sized to the open tasks of its service, keeps
//! continuity data in the state store, and commits one result per task.

use std::sync::Arc;

use tracing::Instrument;

use crate::error::Result;
use crate::model::*;
use crate::store::{ControlStore, StateStore, TaskStore};
use crate::telemetry::tick::{record_claimed, start_batch_span};

pub struct CheckerSession<S> {
    store: Arc<S>,
    service: Service,
    access: Access,
}

impl<S> CheckerSession<S>
where
    S: ControlStore + TaskStore + StateStore,
{
    /// Resolve `slug` and bind a session to it. Fails with `NotConfigured`
    /// if the service does not exist.
    pub async fn open(store: Arc<S>, slug: &str, access: Access) -> Result<Self> {
        let service = store.service_by_slug(slug, access).await?;
        Ok(Self {
            store,
            service,
            access,
        })
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// The competition control record, for tick timing.
    pub async fn control(&self) -> Result<Option<Control>> {
        self.store.control(self.access).await
    }

    /// Number of open tasks of this service at the current tick.
    pub async fn open_tasks(&self) -> Result<i64> {
        self.store.count_open(self.service.id, self.access).await
    }

    /// Claim up to `count` open tasks.
    pub async fn claim(&self, count: i64) -> Result<Vec<ClaimedTask>> {
        let span = start_batch_span(&self.service.slug);
        async {
            let claimed = self
                .store
                .claim_batch(self.service.id, count, self.access)
                .await?;
            record_claimed(&span, claimed.len());
            Ok(claimed)
        }
        .instrument(span.clone())
        .await
    }

    /// Claim every task currently open for this service.
    pub async fn next_batch(&self) -> Result<Vec<ClaimedTask>> {
        let open = self.open_tasks().await?;
        if open == 0 {
            return Ok(Vec::new());
        }
        self.claim(open).await
    }

    pub async fn load_state(&self, net_number: NetNumber, identifier: &str) -> Result<Option<Vec<u8>>> {
        let key = StateKey::new(self.service.id, net_number, identifier);
        self.store.load_state(&key, self.access).await
    }

    pub async fn store_state(&self, net_number: NetNumber, identifier: &str, data: &[u8]) -> Result<()> {
        let key = StateKey::new(self.service.id, net_number, identifier);
        self.store.store_state(&key, data, self.access).await
    }

    /// Commit the result of a claimed task.
    pub async fn commit(&self, task: &ClaimedTask, status: CheckStatus) -> Result<CommitOutcome> {
        let result = CheckResult::new(self.service.id, task.net_number, task.tick, status);
        self.store.commit_result(result, self.access).await
    }

    /// Commit a result by net number, recording against `fallback_team` if
    /// the net number does not resolve.
    pub async fn commit_for(
        &self,
        net_number: NetNumber,
        tick: i64,
        status: CheckStatus,
        fallback_team: Option<TeamId>,
    ) -> Result<CommitOutcome> {
        let mut result = CheckResult::new(self.service.id, net_number, tick, status);
        result.fallback_team = fallback_team;
        self.store.commit_result(result, self.access).await
    }
}
