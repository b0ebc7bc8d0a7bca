//! Duration and waveform estimation for call recordings.
//!
//! The worker has no audio decoder available, so both values are
//! heuristics: duration from payload size at an assumed constant bitrate,
//! and a smooth pseudo-waveform for the visualizer overlay. The waveform is
//! cosmetic; nothing downstream depends on it for correctness.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use scall_models::RenderInputs;

/// Assumed recording bitrate, ~160 kbps.
const BYTES_PER_SECOND: u64 = 20_000;

/// Floor that avoids degenerate near-zero-duration videos.
const MIN_DURATION_SECONDS: u32 = 5;

/// Amplitude samples generated per second of estimated duration.
const AMPLITUDE_TICKS_PER_SECOND: u32 = 100;

/// Timing parameters for the composition.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Output frame rate
    pub fps: u32,
    /// Fixed intro length in seconds
    pub intro_seconds: u32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            intro_seconds: 2,
        }
    }
}

/// Derive render inputs from the recording payload size.
///
/// `seed` keys the amplitude generator; the pipeline derives it from the
/// job id so a retried job renders from identical inputs.
pub fn estimate_render_inputs(
    payload_bytes: u64,
    seed: u64,
    config: &EstimatorConfig,
) -> RenderInputs {
    let duration_seconds = estimate_duration_seconds(payload_bytes);
    let total_frames = (config.intro_seconds + duration_seconds) * config.fps;

    RenderInputs {
        duration_seconds,
        total_frames,
        amplitudes: synthesize_amplitudes(duration_seconds, seed),
    }
}

/// Estimate duration from payload size: `max(5, round(bytes / 20000))`.
pub fn estimate_duration_seconds(payload_bytes: u64) -> u32 {
    let estimated = (payload_bytes as f64 / BYTES_PER_SECOND as f64).round() as u32;
    estimated.max(MIN_DURATION_SECONDS)
}

/// Generate the synthetic amplitude sequence.
///
/// Each tick is `0.3 + uniform * 0.4 + sin(i * 0.1) * 0.2`, clamped into
/// [0.1, 1.0]: random jitter around a mid level with a slow sine swell.
fn synthesize_amplitudes(duration_seconds: u32, seed: u64) -> Vec<f32> {
    let len = (duration_seconds * AMPLITUDE_TICKS_PER_SECOND) as usize;
    let mut rng = StdRng::seed_from_u64(seed);

    (0..len)
        .map(|i| {
            let value = 0.3 + rng.random::<f64>() * 0.4 + (i as f64 * 0.1).sin() * 0.2;
            value.clamp(0.1, 1.0) as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_floor() {
        assert_eq!(estimate_duration_seconds(0), 5);
        assert_eq!(estimate_duration_seconds(1), 5);
        assert_eq!(estimate_duration_seconds(60_000), 5);
    }

    #[test]
    fn test_duration_from_payload_size() {
        // 100 kB at 20 kB/s rounds to exactly the floor
        assert_eq!(estimate_duration_seconds(100_000), 5);
        assert_eq!(estimate_duration_seconds(400_000), 20);
        // round-half-up on the boundary
        assert_eq!(estimate_duration_seconds(410_000), 21);
    }

    #[test]
    fn test_total_frames_includes_intro() {
        let inputs = estimate_render_inputs(100_000, 42, &EstimatorConfig::default());
        // 2s intro at 60fps plus 5s at 60fps
        assert_eq!(inputs.total_frames, 120 + 300);
        assert!(inputs.is_plausible());
    }

    #[test]
    fn test_amplitudes_length_and_bounds() {
        let inputs = estimate_render_inputs(400_000, 7, &EstimatorConfig::default());
        assert_eq!(inputs.amplitudes.len(), 20 * 100);
        assert!(inputs
            .amplitudes
            .iter()
            .all(|a| (0.1..=1.0).contains(a)));
    }

    #[test]
    fn test_amplitudes_deterministic_per_seed() {
        let a = estimate_render_inputs(100_000, 99, &EstimatorConfig::default());
        let b = estimate_render_inputs(100_000, 99, &EstimatorConfig::default());
        let c = estimate_render_inputs(100_000, 100, &EstimatorConfig::default());

        assert_eq!(a.amplitudes, b.amplitudes);
        assert_ne!(a.amplitudes, c.amplitudes);
    }
}
