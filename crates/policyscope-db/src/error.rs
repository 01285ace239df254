//! Database error types.

use thiserror::Error;

/// Database-specific errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create database connection.
    #[error("failed to open database: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Requested record was not found.
    #[error("scan '{0}' not found")]
    NotFound(String),

    /// A terminal scan was asked to transition again.
    #[error("scan '{0}' is already terminal")]
    AlreadyTerminal(String),

    /// Failed to decode database value.
    #[error("decode error: {0}")]
    Decode(String),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error during database operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DatabaseError::AlreadyTerminal("abc".to_string());
        assert_eq!(err.to_string(), "scan 'abc' is already terminal");

        let err = DatabaseError::NotFound("abc".to_string());
        assert_eq!(err.to_string(), "scan 'abc' not found");
    }
}
