//! Error types for loglens-core

use thiserror::Error;

/// Main error type for the loglens-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Store error
    #[error("store error: {0}")]
    Store(String),

    /// Transport error
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type alias for loglens-core
pub type Result<T> = std::result::Result<T, Error>;
