//! # nivaran-rs
//!
//! Assignment and backlog core for a citizen complaint portal.
//!
//! Matches incoming complaints to officers serving the complaint's locality
//! (least-loaded first), keeps officer load counters transactionally
//! consistent, and parks complaints with no available officer in a
//! persistent priority backlog drained by a periodic sweeper.

pub mod assign;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod sweep;
pub mod telemetry;
