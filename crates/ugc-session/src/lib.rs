//! Client-flow orchestration for the UGC Mode backend.
//!
//! This crate provides:
//! - The `Session` state machine (select → enhance → detect → synthesize)
//! - Capability traits for the enhancement, inference, and encoding engines
//! - Generation-counter supersession of in-flight work

pub mod capabilities;
pub mod error;
pub mod session;

pub use capabilities::{EnhanceCapability, LocalEnhancer, SynthesisCapability};
pub use error::{SessionError, SessionResult};
pub use session::{Phase, Session, ACCEPTED_IMAGE_MIME};
