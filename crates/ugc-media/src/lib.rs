#![deny(unreachable_patterns)]
//! Media capabilities for the UGC Mode backend.
//!
//! This crate provides:
//! - The image transform executor (denoise, color/contrast, upscale, PNG)
//! - Type-safe FFmpeg command building and execution
//! - Still-to-video synthesis
//! - Object detection behind a substitutable capability trait

pub mod command;
pub mod detection;
pub mod enhance;
pub mod error;
pub mod synthesis;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use detection::{ObjectDetect, OnnxDetector, OnnxDetectorConfig, COCO_CLASSES};
pub use enhance::{read_dimensions, ImageEnhancer};
pub use error::{MediaError, MediaResult};
pub use synthesis::VideoSynthesizer;
