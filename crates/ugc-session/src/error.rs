//! Session error types.

use thiserror::Error;

use ugc_media::MediaError;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no source image selected")]
    NoSource,

    #[error("unsupported image type: {0}")]
    UnsupportedMime(String),

    #[error("{0} already in flight")]
    ActionInFlight(&'static str),

    #[error("superseded by a newer source selection")]
    Superseded,

    #[error(transparent)]
    Media(#[from] MediaError),
}
