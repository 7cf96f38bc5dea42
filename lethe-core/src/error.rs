//! Error types for the LETHE core library.
//!
//! Only programmer errors are raised through [`LetheError`]. Business-rule
//! outcomes of reactivation (not dormant, underpaid) are ordinary values on
//! [`ReactivationResult`](crate::types::ReactivationResult).

use thiserror::Error;

/// Top-level error type for all LETHE operations.
#[derive(Error, Debug)]
pub enum LetheError {
    /// No record is registered under the given ID.
    #[error("Memory not found: {0}")]
    NotFound(crate::MemoryId),

    /// Configuration was rejected (invalid values, bad TOML, zero interval).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot encoding or decoding failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The scheduler was started outside a tokio runtime.
    #[error("No tokio runtime available to drive the forgetting scheduler")]
    NoRuntime,

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, LetheError>;
