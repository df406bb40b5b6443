//! Error types for session persistence

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Schema setup error
    #[error("Migration error: {0}")]
    Migration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// A stored value could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, Error>;
