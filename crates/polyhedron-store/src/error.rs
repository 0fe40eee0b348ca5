//! Store error types.

use polyhedron_types::{BlockId, PathError, ProjectId};
use thiserror::Error;

use crate::db::DbError;

/// Store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Block not in the collection.
    #[error("block not found: {0}")]
    BlockNotFound(BlockId),

    /// Project not in the collection.
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// Field path does not address a text attribute.
    #[error("invalid field path: {0}")]
    InvalidPath(#[from] PathError),

    /// Insertion or move index outside the list.
    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The remote database is unreachable or not configured.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// A value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Create a RemoteUnavailable error.
    pub fn remote_unavailable(reason: impl Into<String>) -> Self {
        Self::RemoteUnavailable(reason.into())
    }

    /// Create an IndexOutOfBounds error.
    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds { index, len }
    }

    /// Check if this is a not-found error (block or project).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BlockNotFound(_) | Self::ProjectNotFound(_))
    }
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Offline => Self::RemoteUnavailable("database is offline".into()),
            DbError::InvalidPath(p) => Self::RemoteUnavailable(format!("invalid database path: {p}")),
            DbError::Serialization(e) => Self::Serialization(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Store result type.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_maps_to_remote_unavailable() {
        let err: StoreError = DbError::Offline.into();
        assert!(matches!(err, StoreError::RemoteUnavailable(_)));
    }

    #[test]
    fn test_not_found_grouping() {
        assert!(StoreError::BlockNotFound(BlockId::new("b")).is_not_found());
        assert!(StoreError::ProjectNotFound(ProjectId::new("p")).is_not_found());
        assert!(!StoreError::out_of_bounds(3, 2).is_not_found());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            StoreError::out_of_bounds(5, 3).to_string(),
            "index 5 out of bounds for list of length 3"
        );
        assert_eq!(
            StoreError::ProjectNotFound(ProjectId::new("p1")).to_string(),
            "project not found: p1"
        );
    }
}
