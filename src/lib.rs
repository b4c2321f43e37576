//! # tickwork
//!
//! Tick scheduling and checker work distribution for attack-defense
//! competitions.
//!
//! Provides the tick scheduler and its controller loop, atomic task claims
//! for checkers, result recording, and per-team checker state, over
//! Postgres (sqlx) or an in-process store, with OpenTelemetry observability.

pub mod checker;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;
pub mod telemetry;
