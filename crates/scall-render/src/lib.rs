//! Render engine client for the SantaCall worker.
//!
//! The composition itself (frame-by-frame layout of the Santa scene,
//! waveform visualizer, greeting overlay) belongs to the engine; this crate
//! only parameterizes it and moves bytes. Two backends exist: a local
//! subprocess for the bundled engine and a serverless HTTP function, both
//! behind the `Renderer` enum.

pub mod composition;
pub mod error;
pub mod local;
pub mod serverless;

pub use composition::{RenderComposition, OUTPUT_HEIGHT, OUTPUT_WIDTH};
pub use error::{RenderError, RenderResult};
pub use local::LocalRenderer;
pub use serverless::ServerlessRenderer;

use std::path::Path;

/// Default timeout for the local pipeline.
pub const DEFAULT_LOCAL_TIMEOUT_MS: u64 = 120_000;

/// Default timeout for the serverless variant (cold starts included).
pub const DEFAULT_SERVERLESS_TIMEOUT_MS: u64 = 240_000;

/// A configured render backend.
#[derive(Debug, Clone)]
pub enum Renderer {
    /// Bundled engine spawned as a subprocess
    Local(LocalRenderer),
    /// Hosted render function
    Serverless(ServerlessRenderer),
}

impl Renderer {
    /// Build a renderer from environment variables.
    ///
    /// `RENDER_MODE` selects the backend (`local`, default, or
    /// `serverless`); `RENDER_TIMEOUT_MS` overrides the per-mode default.
    pub fn from_env() -> RenderResult<Self> {
        let mode = std::env::var("RENDER_MODE").unwrap_or_else(|_| "local".to_string());

        match mode.as_str() {
            "serverless" => {
                let base_url = std::env::var("RENDER_SERVICE_URL").map_err(|_| {
                    RenderError::Config("RENDER_SERVICE_URL not set".to_string())
                })?;
                let timeout_ms = env_timeout_ms(DEFAULT_SERVERLESS_TIMEOUT_MS);
                Ok(Renderer::Serverless(ServerlessRenderer::new(
                    base_url, timeout_ms,
                )?))
            }
            _ => {
                let engine_bin = std::env::var("RENDER_ENGINE_BIN")
                    .unwrap_or_else(|_| "santacall-renderer".to_string());
                let concurrency = std::env::var("RENDER_CONCURRENCY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(4);
                let timeout_ms = env_timeout_ms(DEFAULT_LOCAL_TIMEOUT_MS);
                Ok(Renderer::Local(LocalRenderer::new(
                    engine_bin,
                    concurrency,
                    timeout_ms,
                )))
            }
        }
    }

    /// Render the composition into `output`, reporting progress fractions
    /// in [0, 1] to `on_progress` (consumed for logging only).
    pub async fn render<F>(
        &self,
        composition: &RenderComposition,
        output: &Path,
        on_progress: F,
    ) -> RenderResult<()>
    where
        F: Fn(f32) + Send + 'static,
    {
        match self {
            Renderer::Local(local) => local.render(composition, output, on_progress).await,
            Renderer::Serverless(remote) => remote.render(composition, output, on_progress).await,
        }
    }
}

fn env_timeout_ms(default: u64) -> u64 {
    std::env::var("RENDER_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
