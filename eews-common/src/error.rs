//! Common error types for the EEWS pipeline

use thiserror::Error;

use crate::storage::StorageError;

/// Common result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across pipeline stages
#[derive(Error, Debug)]
pub enum Error {
    /// Object storage operation error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credentials could not be obtained
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
