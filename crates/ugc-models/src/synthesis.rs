//! Video synthesis planning.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default clip length in seconds.
pub const DEFAULT_DURATION_SECONDS: u32 = 12;
/// Default output frame rate.
pub const DEFAULT_FRAME_RATE: u32 = 30;
/// Cap on the output's long edge; sources are scaled down only.
pub const DEFAULT_MAX_DIMENSION: u32 = 1080;
/// 4:2:0 chroma subsampling for broad decoder compatibility.
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";

/// Fixed timing/encoding parameters for one still-to-video synthesis.
///
/// The still is held static for the full duration; there is no per-frame
/// pan/zoom in this version, only correct duration/rate/format guarantees.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoSynthesisParameters {
    /// Clip duration in seconds
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,

    /// Output frame rate
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Maximum output dimension on the long edge
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// Output pixel format (e.g. "yuv420p")
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Video codec (e.g. "libx264")
    #[serde(default = "default_codec")]
    pub codec: String,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_SECONDS
}
fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}
fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}
fn default_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}

impl Default for VideoSynthesisParameters {
    fn default() -> Self {
        Self {
            duration_seconds: DEFAULT_DURATION_SECONDS,
            frame_rate: DEFAULT_FRAME_RATE,
            max_dimension: DEFAULT_MAX_DIMENSION,
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            codec: DEFAULT_VIDEO_CODEC.to_string(),
        }
    }
}

impl VideoSynthesisParameters {
    /// Plan the synthesis for a still image.
    ///
    /// The policy is currently source-independent; the bound on the output
    /// resolution is applied by the scale filter at encode time.
    pub fn plan() -> Self {
        Self::default()
    }

    /// Scale filter expression: bound the width to `max_dimension` without
    /// upscaling, keep aspect ratio, force even height for 4:2:0.
    pub fn scale_filter(&self) -> String {
        format!("scale='min({},iw)':-2", self.max_dimension)
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-vf".to_string(),
            format!("{},format={}", self.scale_filter(), self.pixel_format),
            "-r".to_string(),
            self.frame_rate.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-c:v".to_string(),
            self.codec.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_constants() {
        let p = VideoSynthesisParameters::plan();
        assert_eq!(p.duration_seconds, 12);
        assert_eq!(p.frame_rate, 30);
        assert_eq!(p.max_dimension, 1080);
        assert_eq!(p.pixel_format, "yuv420p");
        assert_eq!(p.codec, "libx264");
    }

    #[test]
    fn test_scale_filter_downscales_only() {
        let p = VideoSynthesisParameters::default();
        assert_eq!(p.scale_filter(), "scale='min(1080,iw)':-2");
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = VideoSynthesisParameters::default().to_ffmpeg_args();
        assert!(args.windows(2).any(|w| w == ["-r", "30"]));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "yuv420p"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
    }
}
