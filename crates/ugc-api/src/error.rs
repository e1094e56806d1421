//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use ugc_media::MediaError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The `image` field was missing or was not an uploaded file.
    #[error("No image")]
    NoImage,

    /// Any processing failure downstream of input validation.
    #[error("Processing failed: {0}")]
    Processing(#[from] MediaError),

    /// Malformed multipart payload.
    #[error("Processing failed: {0}")]
    Multipart(#[from] MultipartError),
}

/// Wire shape of error bodies: `{"error": "..."}`.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Validation gets a specific message; processing failures get a
        // short generic notice with full detail kept server-side.
        let (status, message) = match &self {
            ApiError::NoImage => (StatusCode::BAD_REQUEST, "No image"),
            ApiError::Processing(e) => {
                error!(error = %e, "Enhancement request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Processing failed")
            }
            ApiError::Multipart(e) => {
                error!(error = %e, "Malformed multipart payload");
                (StatusCode::INTERNAL_SERVER_ERROR, "Processing failed")
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
