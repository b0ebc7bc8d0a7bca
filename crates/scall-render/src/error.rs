//! Render engine error types.

use thiserror::Error;

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while invoking the render engine.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render engine not found: {0}")]
    EngineNotFound(String),

    #[error("Render configuration error: {0}")]
    Config(String),

    #[error("Render engine failed: {message}")]
    EngineFailed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Render timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid render service response: {0}")]
    InvalidResponse(String),

    #[error("Render service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    pub fn engine_failed(message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::EngineFailed {
            message: message.into(),
            exit_code,
        }
    }
}
