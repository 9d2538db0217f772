//! Error types for nivaran-rs.
//!
//! Absence of capacity is not an error: assignment paths return `Ok(None)`
//! when no officer is available, and a duplicate enqueue is an idempotent
//! no-op. Only genuine failures land here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// An optimistic guard matched zero rows: the record moved under us.
    #[error("assignment conflict: {0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
