//! Error types for repository operations.

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Error type for repository operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// A save carried a stale version token.
    #[error("Version conflict on {entity}: expected {expected}, found {actual}")]
    VersionConflict {
        entity: &'static str,
        expected: u64,
        actual: u64,
    },

    /// Backend failure (I/O, connection, serialization).
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Whether retrying after a fresh read may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
