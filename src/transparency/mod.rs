//! Transparency module.
//!
//! Tracks and exposes what the decorator attached to analytics calls,
//! so integrators can audit it.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, SharedTransparencyLog, TransparencyLog, TransparencyStats};
