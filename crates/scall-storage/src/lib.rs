//! S3-compatible storage access for the SantaCall render worker.
//!
//! One bucket holds both the private call recordings (read through
//! short-lived presigned URLs) and the rendered videos (published under
//! deterministic keys and served from a public base URL).

pub mod client;
pub mod error;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
