//! Image transform executor.
//!
//! Applies the fixed enhancement pipeline to a source image. Stage order
//! matters; each stage operates on the previous stage's output:
//!
//! 1. median denoise (radius 1)
//! 2. brightness/saturation modulation
//! 3. linear contrast
//! 4. Lanczos3 resize to the target dimensions
//! 5. PNG encode at maximum compression
//!
//! Filter stages operate on the color channels; an alpha plane, when the
//! source has one, is carried through untouched and resampled with the
//! resize. Opaque sources encode as three-channel PNG.
//!
//! A single deterministic attempt per request, no retries.

use std::io::Cursor;
use std::time::Instant;

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, RgbaImage};
use metrics::histogram;
use rayon::prelude::*;
use tracing::debug;

use ugc_models::enhance::{
    BRIGHTNESS, CONTRAST_INTERCEPT, CONTRAST_SLOPE, DENOISE_RADIUS, SATURATION,
};
use ugc_models::EnhancementParameters;

use crate::error::{MediaError, MediaResult};

/// Read image dimensions from encoded bytes without a full decode.
///
/// Fails with [`MediaError::UnreadableImage`] when the header cannot be
/// parsed, mirroring a failed metadata read.
pub fn read_dimensions(bytes: &[u8]) -> MediaResult<(u32, u32)> {
    let reader = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|_| MediaError::UnreadableImage)?;
    reader
        .into_dimensions()
        .map_err(|_| MediaError::UnreadableImage)
}

/// Stateless executor for the enhancement pipeline.
#[derive(Debug, Default, Clone)]
pub struct ImageEnhancer;

impl ImageEnhancer {
    pub fn new() -> Self {
        Self
    }

    /// Run the full pipeline and return encoded PNG bytes.
    pub fn enhance(&self, source: &[u8], params: &EnhancementParameters) -> MediaResult<Vec<u8>> {
        let started = Instant::now();

        let decoded = image::load_from_memory(source)
            .map_err(|e| MediaError::transform_failed(format!("decode failed: {}", e)))?;
        let has_alpha = decoded.color().has_alpha();
        let mut rgba = decoded.to_rgba8();

        rgba = median_denoise(&rgba, DENOISE_RADIUS);
        modulate(&mut rgba, BRIGHTNESS, SATURATION);
        linear_contrast(&mut rgba, CONTRAST_SLOPE, CONTRAST_INTERCEPT);

        let resized = image::imageops::resize(
            &rgba,
            params.target_width,
            params.target_height,
            FilterType::Lanczos3,
        );

        let mut out = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut out, CompressionType::Best, PngFilter::Adaptive);
        let written = if has_alpha {
            encoder.write_image(
                resized.as_raw(),
                params.target_width,
                params.target_height,
                image::ColorType::Rgba8,
            )
        } else {
            let rgb = DynamicImage::ImageRgba8(resized).to_rgb8();
            encoder.write_image(
                rgb.as_raw(),
                params.target_width,
                params.target_height,
                image::ColorType::Rgb8,
            )
        };
        written.map_err(|e| MediaError::transform_failed(format!("PNG encode failed: {}", e)))?;

        let elapsed = started.elapsed().as_secs_f64();
        histogram!("ugc_enhance_duration_seconds").record(elapsed);
        debug!(
            target_width = params.target_width,
            target_height = params.target_height,
            elapsed_secs = elapsed,
            "Enhancement completed"
        );

        Ok(out)
    }
}

/// Median filter over a `(2r+1)^2` window per color channel, edge-clamped.
/// Alpha is copied from the source pixel.
fn median_denoise(src: &RgbaImage, radius: u32) -> RgbaImage {
    let (width, height) = src.dimensions();
    let r = radius as i64;
    let raw = src.as_raw();
    let row_stride = (width * 4) as usize;

    let mut out = vec![0u8; raw.len()];
    out.par_chunks_mut(row_stride)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            let mut window = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
            for x in 0..width as i64 {
                for c in 0..3usize {
                    window.clear();
                    for dy in -r..=r {
                        let sy = (y + dy).clamp(0, height as i64 - 1) as usize;
                        for dx in -r..=r {
                            let sx = (x + dx).clamp(0, width as i64 - 1) as usize;
                            window.push(raw[sy * row_stride + sx * 4 + c]);
                        }
                    }
                    window.sort_unstable();
                    row[x as usize * 4 + c] = window[window.len() / 2];
                }
                row[x as usize * 4 + 3] = raw[y as usize * row_stride + x as usize * 4 + 3];
            }
        });

    RgbaImage::from_raw(width, height, out).expect("buffer sized from source dimensions")
}

/// Brightness and saturation modulation on the color channels.
///
/// Saturation scales each channel's distance from the pixel's Rec.709 luma,
/// so it interpolates between gray and the source color without inventing
/// detail.
fn modulate(img: &mut RgbaImage, brightness: f32, saturation: f32) {
    for pixel in img.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        let adjust = |c: f32| {
            let saturated = luma + (c - luma) * saturation;
            (saturated * brightness).clamp(0.0, 255.0) as u8
        };
        pixel.0 = [adjust(r), adjust(g), adjust(b), a];
    }
}

/// Linear contrast: `out = in * slope + intercept` in 8-bit channel units,
/// alpha untouched.
fn linear_contrast(img: &mut RgbaImage, slope: f32, intercept: f32) {
    for pixel in img.pixels_mut() {
        for c in &mut pixel.0[..3] {
            *c = (*c as f32 * slope + intercept).clamp(0.0, 255.0) as u8;
        }
    }
}
