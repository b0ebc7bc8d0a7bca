//! Composition props handed to the render engine.

use serde::{Deserialize, Serialize};

use scall_models::RenderInputs;

/// Output width in pixels (portrait, share-friendly).
pub const OUTPUT_WIDTH: u32 = 1080;

/// Output height in pixels.
pub const OUTPUT_HEIGHT: u32 = 1920;

/// The parameterized template driving the engine: timing, the audio to lay
/// under the composition, the child's name for the greeting overlay, and
/// the waveform samples for the visualizer.
///
/// Serialized as camelCase: the engine is a JavaScript renderer and reads
/// these as component props.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderComposition {
    /// Total frames including the intro
    pub total_frames: u32,
    /// Output frame rate
    pub fps: u32,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Signed URL of the call recording
    pub audio_url: String,
    /// Child's name shown in the greeting
    pub display_name: String,
    /// Waveform samples for the visualizer, 100 per second
    pub amplitudes: Vec<f32>,
    /// Output codec
    pub codec: String,
    /// Output pixel format
    pub pixel_format: String,
}

impl RenderComposition {
    /// Build composition props from estimated inputs.
    pub fn new(
        inputs: &RenderInputs,
        fps: u32,
        audio_url: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            total_frames: inputs.total_frames,
            fps,
            width: OUTPUT_WIDTH,
            height: OUTPUT_HEIGHT,
            audio_url: audio_url.into(),
            display_name: display_name.into(),
            amplitudes: inputs.amplitudes.clone(),
            codec: "h264".to_string(),
            pixel_format: "yuv420p".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composition_props_are_camel_case() {
        let inputs = RenderInputs {
            duration_seconds: 5,
            total_frames: 420,
            amplitudes: vec![0.5; 500],
        };
        let comp = RenderComposition::new(&inputs, 60, "https://signed", "Noah");

        let json = serde_json::to_value(&comp).unwrap();
        assert_eq!(json["totalFrames"], 420);
        assert_eq!(json["displayName"], "Noah");
        assert_eq!(json["pixelFormat"], "yuv420p");
        assert_eq!(json["audioUrl"], "https://signed");
        assert_eq!(json["amplitudes"].as_array().unwrap().len(), 500);
    }
}
