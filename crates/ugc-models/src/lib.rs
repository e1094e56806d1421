//! Shared data models for the UGC Mode backend.
//!
//! This crate provides the pure decision logic of the pipeline:
//! - Scale-factor resolution and clamping
//! - Enhancement parameter derivation (target dimensions + filter constants)
//! - Detection types, the clothing/accessory allow-list, and filter/rank
//! - Video synthesis parameter planning

pub mod detection;
pub mod enhance;
pub mod rect;
pub mod scale;
pub mod synthesis;

// Re-export common types
pub use detection::{filter_and_rank, Detection, ALLOWED_LABELS};
pub use enhance::{EnhancementParameters, UnreadableImage};
pub use rect::PixelRect;
pub use scale::{resolve_scale, ScaleFactor};
pub use synthesis::VideoSynthesisParameters;
