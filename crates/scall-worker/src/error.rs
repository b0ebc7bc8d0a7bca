//! Worker error types.
//!
//! One variant per pipeline failure class; every step maps its underlying
//! error into the matching variant so the failure handler and the audit
//! log see a uniform message. A lost claim race is not an error and never
//! reaches this type.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Audio resolution failed: {0}")]
    AudioResolution(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Render engine failed: {0}")]
    RenderEngine(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Store update failed: {0}")]
    StoreUpdate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl WorkerError {
    pub fn audio_resolution(msg: impl Into<String>) -> Self {
        Self::AudioResolution(msg.into())
    }

    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    pub fn render_engine(msg: impl Into<String>) -> Self {
        Self::RenderEngine(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }
}

impl From<scall_store::StoreError> for WorkerError {
    fn from(e: scall_store::StoreError) -> Self {
        Self::StoreUpdate(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = WorkerError::render_engine("composition exploded at frame 12");
        assert_eq!(
            err.to_string(),
            "Render engine failed: composition exploded at frame 12"
        );
    }
}
