//! Enhancement parameter policy.
//!
//! Derives the deterministic filter/resize parameters for one enhancement
//! request. The filter constants are fixed product tuning, not user input:
//! a gentle median denoise, a mild brightness/saturation lift, a subtle
//! linear contrast bump, and Lanczos resampling to the scaled dimensions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scale::ScaleFactor;

/// Median denoise radius (pixels). Kept minimal so garment texture survives.
pub const DENOISE_RADIUS: u32 = 1;
/// Global brightness multiplier.
pub const BRIGHTNESS: f32 = 1.05;
/// Global saturation multiplier.
pub const SATURATION: f32 = 1.03;
/// Linear contrast slope (`out = in * slope + intercept`).
pub const CONTRAST_SLOPE: f32 = 1.02;
/// Linear contrast intercept, in 8-bit channel units.
pub const CONTRAST_INTERCEPT: f32 = -2.0;

/// The source image's dimensions could not be determined, so no sensible
/// target size exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("source image dimensions unavailable")]
pub struct UnreadableImage;

/// Immutable parameter record for one enhancement pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnhancementParameters {
    /// Output width in pixels (>= 1)
    pub target_width: u32,
    /// Output height in pixels (>= 1)
    pub target_height: u32,
    /// Resolved upscale factor
    pub scale: ScaleFactor,
}

impl EnhancementParameters {
    /// Compute parameters from source dimensions and a resolved scale.
    ///
    /// Fails with [`UnreadableImage`] when either dimension is zero
    /// (metadata read failed upstream). Targets are floored at one pixel so
    /// the raster engine is never asked for a degenerate buffer.
    pub fn compute(width: u32, height: u32, scale: ScaleFactor) -> Result<Self, UnreadableImage> {
        if width == 0 || height == 0 {
            return Err(UnreadableImage);
        }

        let factor = scale.get() as f64;
        let target_width = ((width as f64 * factor).round() as u32).max(1);
        let target_height = ((height as f64 * factor).round() as u32).max(1);

        Ok(Self {
            target_width,
            target_height,
            scale,
        })
    }
}
