//! Core data model.
//!
//! The competition is a sequence of ticks. Each tick mints one task per
//! (service, team) pair; checkers claim tasks, keep state between ticks,
//! and report outcomes. Team network reachability is sampled separately.

pub mod game;
pub mod task;
pub mod vpn;

pub use game::*;
pub use task::*;
pub use vpn::*;
