//! SantaCall video render worker.
//!
//! This crate provides:
//! - Claim-based polling loop over the shared job store
//! - The per-job render pipeline (fetch, estimate, render, outro, publish)
//! - Bounded retries with advisory backoff
//! - Gated completion notification
//! - Graceful shutdown with a drain window

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod notifier;
pub mod pipeline;

pub use config::{advisory_backoff_ms, WorkerConfig, BACKOFF_DELAYS_MS};
pub use error::{WorkerError, WorkerResult};
pub use executor::{JobExecutor, RetryDecision};
pub use logging::JobLogger;
pub use notifier::{Notifier, NotifierConfig};
pub use pipeline::{run_job, video_object_key, PipelineContext};
