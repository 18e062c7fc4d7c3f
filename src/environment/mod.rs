//! Simulated implementations of the environment capabilities.
//!
//! The decorator never talks to a rendering engine directly; it reads media
//! features through [`crate::probe::MediaQueryEvaluator`] and focus through
//! [`crate::probe::FocusObserver`]. This module provides in-memory versions
//! of both for tests, scripted scenarios and the CLI.

pub mod focus;
pub mod media;
pub mod scenario;

// Re-export commonly used types
pub use focus::{ChannelFocusObserver, FocusChange, FocusFeed};
pub use media::{MediaSupport, SimulatedMediaEnvironment};
pub use scenario::{Scenario, ScenarioError};
