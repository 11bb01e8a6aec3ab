//! Storage error types
//!
//! Defines all errors that can occur in the persistence layer.

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite returned an error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Requested row does not exist (or is not owned by the caller)
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness rule was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Credit balance is zero
    #[error("Insufficient credits")]
    InsufficientCredits,

    /// Input rejected before touching the database
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::NotFound("trade abc".to_string());
        assert_eq!(err.to_string(), "Not found: trade abc");

        let err = StorageError::InsufficientCredits;
        assert_eq!(err.to_string(), "Insufficient credits");
    }

    #[test]
    fn test_sqlite_error_conversion() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StorageError::Database(_)));
    }
}
