//! FFmpeg CLI wrapper and media utilities for the SantaCall render worker.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multi-input support
//! - Progress parsing from `-progress pipe:2`
//! - Hard timeouts with process kill
//! - Recording download over HTTP
//! - Duration/waveform estimation heuristics
//! - Outro concatenation with graceful fallback

pub mod analysis;
pub mod command;
pub mod download;
pub mod error;
pub mod outro;
pub mod probe;
pub mod progress;

pub use analysis::{estimate_duration_seconds, estimate_render_inputs, EstimatorConfig};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use download::download_audio;
pub use error::{MediaError, MediaResult};
pub use outro::{append_outro, OutroConfig, DEFAULT_OUTRO_PATH};
pub use probe::{probe_media, MediaInfo};
pub use progress::FfmpegProgress;
