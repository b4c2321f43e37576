//! Control plane: drives the tick scheduler until shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, info};

use super::scheduler::{POLL_INTERVAL, TickScheduler};
use crate::error::Result;
use crate::store::ControlStore;

/// Configuration for the control plane.
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Keep minting ticks past the nominal end.
    pub nonstop: bool,
    /// Wait after a failed step before trying again.
    pub error_backoff: Duration,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            nonstop: false,
            error_backoff: POLL_INTERVAL,
        }
    }
}

/// The controller loop: step, sleep the returned waits, repeat.
///
/// Exactly one control plane should run per competition.
pub struct ControlPlane<S> {
    scheduler: Arc<TickScheduler<S>>,
    config: ControlConfig,
    shutdown: Arc<Notify>,
}

impl<S> Clone for ControlPlane<S> {
    fn clone(&self) -> Self {
        Self {
            scheduler: Arc::clone(&self.scheduler),
            config: self.config.clone(),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

impl<S: ControlStore> ControlPlane<S> {
    pub fn new(scheduler: TickScheduler<S>, config: ControlConfig) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Signal the control plane to shut down.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run the controller loop until shutdown.
    pub async fn run(&self) -> Result<()> {
        info!(nonstop = self.config.nonstop, "control plane started");

        loop {
            // One clock sample per step.
            let now = chrono::Utc::now();
            let waits = match self.scheduler.step(now, self.config.nonstop).await {
                Ok(step) => step.waits,
                Err(e) => {
                    error!("scheduler step failed: {e}");
                    vec![self.config.error_backoff]
                }
            };

            for wait in waits {
                tokio::select! {
                    biased;
                    _ = self.shutdown.notified() => {
                        info!("control plane shutting down");
                        return Ok(());
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }
    }
}
