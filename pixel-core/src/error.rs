//! Error types for Pixel-Perfect

use thiserror::Error;

/// Result type alias for Pixel-Perfect operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Pixel-Perfect operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A model provider rejected or failed a request
    #[error("Provider error: {0}")]
    Provider(String),

    /// The remote knowledge tool failed
    #[error("Knowledge tool error: {0}")]
    Knowledge(String),

    /// Cloning or fetching a repository failed
    #[error("Git error: {0}")]
    Git(String),

    /// A migration plan could not be parsed or applied
    #[error("Plan error: {0}")]
    Plan(String),

    /// Session history could not be read or written
    #[error("Session error: {0}")]
    Session(String),

    /// Session database error
    #[cfg(feature = "database")]
    #[error(transparent)]
    Database(#[from] pixel_db::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
