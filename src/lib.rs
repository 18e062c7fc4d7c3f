//! a11y-analytics - Accessibility context for analytics events.
//!
//! This library decorates an existing analytics reporting function so that
//! every event it sends also carries the user's accessibility environment:
//! display preferences such as reduced motion or forced colors, and whether
//! the user navigates with a keyboard. Existing call sites stay unchanged.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     a11y-analytics                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │ Media probe │──┐                  │  Keyboard   │       │
//! │  │   (sync)    │  │                  │  detector   │       │
//! │  └─────────────┘  ▼                  └─────────────┘       │
//! │            ┌─────────────┐                  │              │
//! │            │ Preference  │◀─────────────────┘              │
//! │            │  Snapshot   │                                 │
//! │            └─────────────┘                                 │
//! │                   │                                        │
//! │                   ▼                                        │
//! │  caller ──▶ ┌─────────────┐  translate  ┌─────────────┐   │
//! │             │ Interceptor │────────────▶│  Original   │   │
//! │             └─────────────┘             │  analytics  │   │
//! │                                         └─────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use a11y_analytics::environment::{FocusFeed, MediaSupport, SimulatedMediaEnvironment};
//! use a11y_analytics::gtag::decorate_gtag;
//! use a11y_analytics::interceptor::{AnalyticsGlobal, DecorationEnvironment};
//! use a11y_analytics::schedule::ManualScheduler;
//! use serde_json::json;
//!
//! let gtag = AnalyticsGlobal::with_function(|args| println!("{args:?}"));
//!
//! let media = SimulatedMediaEnvironment::new()
//!     .with_feature("prefers-color-scheme", MediaSupport::Matching("dark".into()));
//! let (_feed, focus) = FocusFeed::new();
//! let env = DecorationEnvironment::new(
//!     Arc::new(media),
//!     Arc::new(focus),
//!     Arc::new(ManualScheduler::new()),
//! );
//!
//! decorate_gtag(&gtag, &env).expect("gtag is installed");
//! gtag.call(&[json!("event"), json!("click"), json!({"foo": 1})]);
//! ```

pub mod config;
pub mod environment;
pub mod gtag;
pub mod interceptor;
pub mod probe;
pub mod schedule;
pub mod snapshot;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use interceptor::{
    install, AnalyticsFn, AnalyticsGlobal, DecorationEnvironment, InstallError, Installation,
    InterceptorConfig, TranslationInput,
};
pub use probe::{
    DetectionState, ElementDescriptor, FocusObserver, KeyboardUsageDetector, MediaFeatureSpec,
    MediaQueryEvaluator, ProbeError,
};
pub use schedule::{ManualScheduler, Scheduler, TaskHandle, TokioScheduler};
pub use snapshot::{PreferenceSnapshot, PreferenceValue, SharedSnapshot};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Data declaration that can be displayed to users.
pub const DATA_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║             A11Y ANALYTICS - DATA DECLARATION                    ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  Analytics events are annotated with accessibility context.      ║
║                                                                  ║
║  ✓ WHAT WE ATTACH:                                               ║
║    • Reduced motion, color scheme, inverted colors               ║
║    • Forced colors and contrast preferences                      ║
║    • Whether the page was navigated with a keyboard              ║
║                                                                  ║
║  ✗ WHAT WE NEVER CAPTURE:                                        ║
║    • Which keys you press                                        ║
║    • What you type into text fields                              ║
║    • Where your pointer is                                       ║
║                                                                  ║
║  Values live in memory for the current page only and are         ║
║  never stored between visits.                                    ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_declaration_contents() {
        assert!(DATA_DECLARATION.contains("DATA DECLARATION"));
        assert!(DATA_DECLARATION.contains("NEVER CAPTURE"));
        assert!(DATA_DECLARATION.contains("keys you press"));
    }
}
