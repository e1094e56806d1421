//! Request handlers.

pub mod enhance;
pub mod health;

pub use enhance::*;
pub use health::*;
