//! Database error types.

use thiserror::Error;

/// Database error type.
#[derive(Debug, Error)]
pub enum DbError {
    /// Path contains a forbidden segment.
    #[error("invalid database path: {0}")]
    InvalidPath(String),

    /// The database cannot be reached.
    #[error("database is offline")]
    Offline,

    /// A value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Database result type.
pub type DbResult<T> = Result<T, DbError>;
