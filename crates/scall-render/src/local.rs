//! Local render engine backend.
//!
//! Spawns the bundled composition engine as a subprocess, feeding it the
//! composition props through a temp file and reading frame progress from
//! its stdout. The invocation carries a hard timeout; an engine that blows
//! past it is killed and reported as a normal render failure.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::composition::RenderComposition;
use crate::error::{RenderError, RenderResult};

/// Local subprocess renderer.
#[derive(Debug, Clone)]
pub struct LocalRenderer {
    /// Engine executable name or path
    pub engine_bin: String,
    /// Frame-render concurrency hint passed to the engine
    pub concurrency: usize,
    /// Hard timeout in milliseconds
    pub timeout_ms: u64,
}

impl LocalRenderer {
    /// Create a renderer for the given engine binary.
    pub fn new(engine_bin: impl Into<String>, concurrency: usize, timeout_ms: u64) -> Self {
        Self {
            engine_bin: engine_bin.into(),
            concurrency,
            timeout_ms,
        }
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
        which::which(&self.engine_bin)
            .map_err(|_| RenderError::EngineNotFound(self.engine_bin.clone()))?;

        let props_path = props_file_path(output);
        tokio::fs::write(&props_path, serde_json::to_vec(composition)?).await?;

        let args = build_engine_args(&props_path, output, self.concurrency);
        debug!("Running render engine: {} {}", self.engine_bin, args.join(" "));

        let result = self.run_engine(&args, on_progress).await;

        if let Err(e) = tokio::fs::remove_file(&props_path).await {
            warn!("Failed to remove props file {}: {}", props_path.display(), e);
        }

        result
    }

    async fn run_engine<F>(&self, args: &[String], on_progress: F) -> RenderResult<()>
    where
        F: Fn(f32) + Send + 'static,
    {
        let mut child = Command::new(&self.engine_bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take().expect("stdout not captured");
        let mut stderr = child.stderr.take().expect("stderr not captured");

        let progress_handle = tokio::spawn(async move {
            let mut reader = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if let Some(fraction) = parse_progress_fraction(&line) {
                    on_progress(fraction);
                }
            }
        });

        // The engine reports failures on stderr; keep it for the error path.
        let stderr_handle = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let timeout_secs = self.timeout_ms / 1000;
        let status = match tokio::time::timeout(
            std::time::Duration::from_millis(self.timeout_ms),
            child.wait(),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!("Render engine timed out after {}s, killing process", timeout_secs);
                let _ = child.kill().await;
                progress_handle.abort();
                stderr_handle.abort();
                return Err(RenderError::Timeout(timeout_secs));
            }
        };

        let _ = progress_handle.await;
        let engine_stderr = stderr_handle.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            let message = last_lines(&engine_stderr, 5);
            Err(RenderError::engine_failed(
                if message.is_empty() {
                    "render engine exited with non-zero status".to_string()
                } else {
                    message
                },
                status.code(),
            ))
        }
    }
}

/// Props file placed next to the output so cleanup removes both together.
fn props_file_path(output: &Path) -> PathBuf {
    output.with_extension("props.json")
}

/// Build the engine command line.
fn build_engine_args(props: &Path, output: &Path, concurrency: usize) -> Vec<String> {
    vec![
        "render".to_string(),
        "--props".to_string(),
        props.to_string_lossy().to_string(),
        "--output".to_string(),
        output.to_string_lossy().to_string(),
        "--concurrency".to_string(),
        concurrency.to_string(),
    ]
}

/// Parse a `progress=<0..1>` line from the engine's stdout.
fn parse_progress_fraction(line: &str) -> Option<f32> {
    let value = line.trim().strip_prefix("progress=")?;
    let fraction: f32 = value.parse().ok()?;
    (0.0..=1.0).contains(&fraction).then_some(fraction)
}

/// Last `n` non-empty lines of engine output, joined.
fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_args() {
        let args = build_engine_args(
            Path::new("/tmp/job/final.props.json"),
            Path::new("/tmp/job/main.mp4"),
            4,
        );
        assert_eq!(args[0], "render");
        assert!(args.windows(2).any(|w| w[0] == "--props"));
        assert!(args.windows(2).any(|w| w[0] == "--output" && w[1] == "/tmp/job/main.mp4"));
        assert!(args.windows(2).any(|w| w[0] == "--concurrency" && w[1] == "4"));
    }

    #[test]
    fn test_parse_progress_fraction() {
        assert_eq!(parse_progress_fraction("progress=0.5"), Some(0.5));
        assert_eq!(parse_progress_fraction("  progress=1.0 "), Some(1.0));
        assert_eq!(parse_progress_fraction("progress=1.5"), None);
        assert_eq!(parse_progress_fraction("rendered frame 12"), None);
    }

    #[test]
    fn test_last_lines() {
        let text = "one\ntwo\n\nthree\n";
        assert_eq!(last_lines(text, 2), "two\nthree");
        assert_eq!(last_lines("", 3), "");
    }

    #[test]
    fn test_props_file_next_to_output() {
        let props = props_file_path(Path::new("/work/j1/main.mp4"));
        assert_eq!(props, Path::new("/work/j1/main.props.json"));
    }
}
