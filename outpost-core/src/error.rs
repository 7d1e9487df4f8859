//! Error types for the Outpost core library.

use thiserror::Error;

/// Top-level error type for Outpost operations.
///
/// Most gameplay-facing operations are total and never return this type;
/// it is produced by the storage layer and configuration loading, and the
/// owning components absorb it where a world must stay readable.
#[derive(Error, Debug)]
pub enum OutpostError {
    /// The host key/value store rejected a read or write.
    #[error("Store error: {0}")]
    Store(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for OutpostError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, OutpostError>;
