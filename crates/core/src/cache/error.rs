use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Key {key} is not a list")]
    NotAList { key: String },
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
