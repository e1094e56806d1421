//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("source image dimensions unavailable")]
    UnreadableImage,

    #[error("image transform failed: {message}")]
    TransformFailed { message: String },

    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("video synthesis failed: {message}")]
    SynthesisFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a transform failure error.
    pub fn transform_failed(message: impl Into<String>) -> Self {
        Self::TransformFailed {
            message: message.into(),
        }
    }

    /// Create an inference failure error.
    pub fn inference_failed(message: impl Into<String>) -> Self {
        Self::InferenceFailed(message.into())
    }

    /// Create a synthesis failure error.
    pub fn synthesis_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::SynthesisFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<ugc_models::UnreadableImage> for MediaError {
    fn from(_: ugc_models::UnreadableImage) -> Self {
        Self::UnreadableImage
    }
}
