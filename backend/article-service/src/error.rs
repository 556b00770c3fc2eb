/// Error types for article-service
use thiserror::Error;

/// Failures raised by an [`ArticleStore`](crate::store::ArticleStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Wrong value type at key {key}")]
    WrongType { key: String },

    #[error("Hash value is not an integer: {key} {field}")]
    NotAnInteger { key: String, field: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// The store could not complete a call. Nothing is rolled back; every
    /// operation is safe to retry from scratch.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Corrupt article record at {key}: {reason}")]
    CorruptRecord { key: String, reason: String },
}

impl ServiceError {
    /// True for errors caused by the caller rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidInput(_))
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
