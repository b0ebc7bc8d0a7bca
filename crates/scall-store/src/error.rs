//! Job store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur against the job store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to configure job store: {0}")]
    ConfigError(String),

    #[error("Job not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("Invalid job row: {0}")]
    InvalidRow(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_row(msg: impl Into<String>) -> Self {
        Self::InvalidRow(msg.into())
    }
}
