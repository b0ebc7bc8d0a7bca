//! Outro concatenation.
//!
//! Every rendered video gets a fixed trailing clip appended. The outro is a
//! soft enhancement: if the asset is missing or the transcode fails for any
//! reason, the main video is delivered unmodified and the job continues.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::{probe_media, MediaInfo};

/// Default outro asset path in the production container.
pub const DEFAULT_OUTRO_PATH: &str = "/app/assets/outro.mp4";

/// Configuration for outro concatenation.
#[derive(Debug, Clone)]
pub struct OutroConfig {
    /// Path to the outro clip
    pub asset_path: PathBuf,
    /// Timeout for the transcode invocation
    pub timeout_secs: u64,
}

impl Default for OutroConfig {
    fn default() -> Self {
        Self {
            asset_path: PathBuf::from(DEFAULT_OUTRO_PATH),
            timeout_secs: 120,
        }
    }
}

impl OutroConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            asset_path: std::env::var("OUTRO_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTRO_PATH)),
            timeout_secs: std::env::var("OUTRO_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
        }
    }

    /// Check if the outro asset exists.
    pub fn is_available(&self) -> bool {
        self.asset_path.exists()
    }
}

/// Concatenate the outro clip onto `main`, writing the result to `output`.
///
/// The outro is rescaled and resampled to match the main video's
/// resolution, frame rate and audio sample rate before concatenation.
/// Never fails the caller: any problem falls back to copying the main
/// video to `output` unchanged.
pub async fn append_outro(
    main: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &OutroConfig,
) -> MediaResult<()> {
    let main = main.as_ref();
    let output = output.as_ref();

    if !config.is_available() {
        warn!(
            outro = %config.asset_path.display(),
            "Outro asset not found, delivering main video unmodified"
        );
        tokio::fs::copy(main, output).await?;
        return Ok(());
    }

    match concat_with_outro(main, output, config).await {
        Ok(()) => {
            info!("Appended outro to {}", output.display());
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Outro concatenation failed, delivering main video unmodified");
            tokio::fs::copy(main, output).await?;
            Ok(())
        }
    }
}

async fn concat_with_outro(main: &Path, output: &Path, config: &OutroConfig) -> MediaResult<()> {
    let info = probe_media(main).await?;

    let cmd = FfmpegCommand::new(output)
        .input(main)
        .input(&config.asset_path)
        .filter_complex(build_concat_filter(&info))
        .map("[v]")
        .map("[a]")
        .video_codec("libx264")
        .preset("veryfast")
        .pixel_format("yuv420p")
        .audio_codec("aac");

    FfmpegRunner::new()
        .with_timeout(config.timeout_secs)
        .run(&cmd)
        .await
}

/// Build the filter graph that conforms the outro to the main video.
fn build_concat_filter(info: &MediaInfo) -> String {
    format!(
        "[1:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={fps},format=yuv420p,setsar=1[ov];\
         [1:a]aresample={sr}[oa];\
         [0:v][0:a][ov][oa]concat=n=2:v=1:a=1[v][a]",
        w = info.width,
        h = info.height,
        fps = info.fps,
        sr = info.sample_rate,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_outro_falls_back_to_copy() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main.mp4");
        let output = dir.path().join("final.mp4");
        tokio::fs::write(&main, b"main-render-bytes").await.unwrap();

        let config = OutroConfig {
            asset_path: dir.path().join("missing-outro.mp4"),
            timeout_secs: 5,
        };

        append_outro(&main, &output, &config).await.unwrap();

        assert_eq!(
            tokio::fs::read(&output).await.unwrap(),
            tokio::fs::read(&main).await.unwrap(),
            "fallback output must be byte-equal to the main render"
        );
    }

    #[tokio::test]
    async fn test_broken_outro_falls_back_to_copy() {
        // Asset exists but is not a video: the transcode (or probe) fails
        // and the main video must still come through unmodified.
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main.mp4");
        let outro = dir.path().join("outro.mp4");
        let output = dir.path().join("final.mp4");
        tokio::fs::write(&main, b"main-render-bytes").await.unwrap();
        tokio::fs::write(&outro, b"not a real video").await.unwrap();

        let config = OutroConfig {
            asset_path: outro,
            timeout_secs: 5,
        };

        append_outro(&main, &output, &config).await.unwrap();

        assert_eq!(
            tokio::fs::read(&output).await.unwrap(),
            b"main-render-bytes"
        );
    }

    #[test]
    fn test_concat_filter_matches_main_parameters() {
        let info = MediaInfo {
            duration: 12.0,
            width: 1080,
            height: 1920,
            fps: 60.0,
            sample_rate: 48_000,
        };
        let filter = build_concat_filter(&info);
        assert!(filter.contains("scale=1080:1920"));
        assert!(filter.contains("fps=60"));
        assert!(filter.contains("aresample=48000"));
        assert!(filter.contains("concat=n=2:v=1:a=1"));
    }
}
