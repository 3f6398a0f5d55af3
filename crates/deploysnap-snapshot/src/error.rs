//! Snapshot error types.

use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// No valid store was found at or above a path.
    #[error("No snapshot store found at {0}")]
    NotFound(String),

    /// The store has no open repository handle.
    #[error("Snapshot store is not initialized")]
    NotInitialized,

    /// Error reported by the git engine.
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The staged tree is identical to the last snapshot.
    #[error("Nothing to commit - working tree matches the last snapshot")]
    EmptyCommit,

    /// Operation failed.
    #[error("Snapshot operation failed: {0}")]
    OperationFailed(String),
}

impl SnapshotError {
    /// Create a not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SnapshotError::not_found("/srv/app").to_string(),
            "No snapshot store found at /srv/app"
        );
        assert_eq!(
            SnapshotError::NotInitialized.to_string(),
            "Snapshot store is not initialized"
        );
        assert!(SnapshotError::EmptyCommit
            .to_string()
            .starts_with("Nothing to commit"));
    }

    #[test]
    fn test_git_error_converts() {
        let err: SnapshotError = git2::Error::from_str("index locked").into();
        assert!(matches!(err, SnapshotError::Git(_)));
        assert_eq!(err.to_string(), "Git error: index locked");
    }
}
