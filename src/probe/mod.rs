//! Accessibility signal probes.
//!
//! This module contains:
//! - Media-feature resolution (display preferences such as reduced motion)
//! - Keyboard-usage detection from visible focus

pub mod keyboard;
pub mod media;

// Re-export commonly used types
pub use keyboard::{
    DetectionCallback, DetectionError, DetectionState, DetectorHandle, ElementDescriptor,
    FocusObserver, KeyboardUsageDetector, PollOutcome, TagCategory, DEFAULT_POLL_INTERVAL,
};
pub use media::{
    provider_safe_key, resolve, resolve_all, MatchMedia, MatchMediaEvaluator, MediaFeatureSpec,
    MediaQueryEvaluator, ProbeError, ProbeReport, ResolvedPreference,
};

/// Failure reported by an injected environment capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentError(pub String);

impl EnvironmentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for EnvironmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EnvironmentError {}
