//! Serverless render backend.
//!
//! Posts the composition to a hosted render function and writes the
//! returned encoded video to disk. No progress stream exists for this
//! variant; the callback fires once on completion.

use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::composition::RenderComposition;
use crate::error::{RenderError, RenderResult};

/// Client for the hosted render function.
#[derive(Debug, Clone)]
pub struct ServerlessRenderer {
    base_url: String,
    client: reqwest::Client,
    timeout_ms: u64,
}

impl ServerlessRenderer {
    /// Create a client for the render service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> RenderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            timeout_ms,
        })
    }

    /// Render the composition into `output`.
    pub async fn render<F>(
        &self,
        composition: &RenderComposition,
        output: &Path,
        on_progress: F,
    ) -> RenderResult<()>
    where
        F: Fn(f32) + Send + 'static,
    {
        let url = format!("{}/render", self.base_url.trim_end_matches('/'));
        debug!("Posting composition to {}", url);

        let response = self
            .client
            .post(&url)
            .json(composition)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RenderError::Timeout(self.timeout_ms / 1000)
                } else {
                    RenderError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RenderError::engine_failed(
                format!("render service returned HTTP {}: {}", status, body),
                None,
            ));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(RenderError::InvalidResponse(
                "render service returned an empty body".to_string(),
            ));
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, &bytes).await?;

        on_progress(1.0);
        info!("Received {} rendered bytes from service", bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scall_models::RenderInputs;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn composition() -> RenderComposition {
        let inputs = RenderInputs {
            duration_seconds: 5,
            total_frames: 420,
            amplitudes: vec![0.5; 500],
        };
        RenderComposition::new(&inputs, 60, "https://signed", "Mia")
    }

    #[tokio::test]
    async fn test_serverless_render_writes_video() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/render"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"encoded-video".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("main.mp4");
        let renderer = ServerlessRenderer::new(server.uri(), 5_000).unwrap();

        renderer.render(&composition(), &output, |_| {}).await.unwrap();

        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"encoded-video");
    }

    #[tokio::test]
    async fn test_serverless_render_propagates_engine_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/render"))
            .respond_with(ResponseTemplate::new(500).set_body_string("composition exploded"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("main.mp4");
        let renderer = ServerlessRenderer::new(server.uri(), 5_000).unwrap();

        let err = renderer
            .render(&composition(), &output, |_| {})
            .await
            .unwrap_err();

        match err {
            RenderError::EngineFailed { message, .. } => {
                assert!(message.contains("composition exploded"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }
}
