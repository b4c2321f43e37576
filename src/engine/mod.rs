//! Controller engine: the tick scheduler and the loop that drives it.

pub mod control;
pub mod scheduler;

pub use control::{ControlConfig, ControlPlane};
pub use scheduler::{Decision, POLL_INTERVAL, Plan, Step, TickScheduler};
