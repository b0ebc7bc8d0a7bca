//! Derived per-render inputs.

use serde::{Deserialize, Serialize};

/// Timing and visualization inputs for one render, derived from the
/// recording payload. Ephemeral: computed per attempt, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderInputs {
    /// Estimated video duration in seconds (floor of 5)
    pub duration_seconds: u32,

    /// Intro frames plus duration * fps
    pub total_frames: u32,

    /// Synthetic per-tick amplitudes in [0.1, 1.0], 100 per second.
    /// Purely cosmetic waveform data for the visualizer overlay.
    pub amplitudes: Vec<f32>,
}

impl RenderInputs {
    /// Sanity check used by callers before handing the inputs to the
    /// render engine.
    pub fn is_plausible(&self) -> bool {
        self.duration_seconds >= 5
            && self.total_frames > 0
            && self.amplitudes.len() == (self.duration_seconds as usize) * 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plausibility() {
        let inputs = RenderInputs {
            duration_seconds: 5,
            total_frames: 120 + 5 * 60,
            amplitudes: vec![0.5; 500],
        };
        assert!(inputs.is_plausible());

        let short = RenderInputs {
            duration_seconds: 5,
            total_frames: 420,
            amplitudes: vec![0.5; 499],
        };
        assert!(!short.is_plausible());
    }
}
