//! Keyboard-usage detection from visible focus.
//!
//! The detector polls the environment for the element that currently shows
//! a visible focus indicator. The first time such an element is something a
//! pointer user would not normally leave focused, we conclude the user
//! navigates with a keyboard, record `uses_keyboard = true` and stop
//! polling for good.
//!
//! Text fields, text areas and content-editable regions are ignored: they
//! show visible focus after a click or tap too.

use crate::probe::EnvironmentError;
use crate::schedule::{Scheduler, TaskHandle, TickOutcome};
use crate::snapshot::{SharedSnapshot, USES_KEYBOARD_KEY};
use crate::transparency::SharedTransparencyLog;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default interval between focus checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Coarse element classification used for false-positive suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    /// `<input>`
    Input,
    /// `<textarea>`
    TextArea,
    /// Anything else (buttons, links, custom widgets)
    Other,
}

impl TagCategory {
    /// Classify an element by tag name, case-insensitively.
    pub fn from_tag_name(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("input") {
            TagCategory::Input
        } else if tag.eq_ignore_ascii_case("textarea") {
            TagCategory::TextArea
        } else {
            TagCategory::Other
        }
    }
}

/// The element holding visible focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub tag_category: TagCategory,
    #[serde(default)]
    pub is_content_editable: bool,
}

impl ElementDescriptor {
    pub fn new(tag_category: TagCategory) -> Self {
        Self {
            tag_category,
            is_content_editable: false,
        }
    }

    pub fn from_tag_name(tag: &str, is_content_editable: bool) -> Self {
        Self {
            tag_category: TagCategory::from_tag_name(tag),
            is_content_editable,
        }
    }

    pub fn content_editable(mut self) -> Self {
        self.is_content_editable = true;
        self
    }

    /// Whether pointer interaction alone commonly gives this element visible focus.
    pub fn is_pointer_prone(&self) -> bool {
        matches!(self.tag_category, TagCategory::Input | TagCategory::TextArea)
            || self.is_content_editable
    }
}

/// Source of the currently visible-focus element.
pub trait FocusObserver: Send + Sync {
    fn current_visible_focus_target(&self) -> Result<Option<ElementDescriptor>, EnvironmentError>;
}

/// Lifecycle of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionState {
    Idle,
    Polling,
    /// Terminal
    Detected,
}

/// Result of a single focus check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    NoFocus,
    /// Focus is on an element that pointer users also focus
    Suppressed(ElementDescriptor),
    Detected,
    AlreadyDetected,
}

/// Errors during a focus check. Polling continues after these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    Transient(String),
}

impl std::fmt::Display for DetectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionError::Transient(e) => write!(f, "Focus check failed: {e}"),
        }
    }
}

impl std::error::Error for DetectionError {}

/// Invoked once when keyboard usage is first detected.
pub type DetectionCallback = Box<dyn FnOnce() + Send + 'static>;

/// One-shot keyboard usage detector.
pub struct KeyboardUsageDetector {
    observer: Arc<dyn FocusObserver>,
    snapshot: SharedSnapshot,
    state: Arc<Mutex<DetectionState>>,
    on_detected: Option<DetectionCallback>,
    transparency_log: Option<SharedTransparencyLog>,
}

impl KeyboardUsageDetector {
    pub fn new(observer: Arc<dyn FocusObserver>, snapshot: SharedSnapshot) -> Self {
        Self {
            observer,
            snapshot,
            state: Arc::new(Mutex::new(DetectionState::Idle)),
            on_detected: None,
            transparency_log: None,
        }
    }

    /// Run `callback` once, right after detection is recorded.
    pub fn with_callback(mut self, callback: DetectionCallback) -> Self {
        self.on_detected = Some(callback);
        self
    }

    pub fn with_transparency_log(mut self, log: SharedTransparencyLog) -> Self {
        self.transparency_log = Some(log);
        self
    }

    pub fn state(&self) -> DetectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: DetectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Check focus once.
    pub fn poll_once(&mut self) -> Result<PollOutcome, DetectionError> {
        match self.state() {
            DetectionState::Detected => return Ok(PollOutcome::AlreadyDetected),
            DetectionState::Idle => self.set_state(DetectionState::Polling),
            DetectionState::Polling => {}
        }

        if let Some(ref log) = self.transparency_log {
            log.record_detection_tick();
        }

        let focused = match self.observer.current_visible_focus_target() {
            Ok(focused) => focused,
            Err(e) => {
                if let Some(ref log) = self.transparency_log {
                    log.record_detection_error();
                }
                return Err(DetectionError::Transient(e.to_string()));
            }
        };

        let Some(element) = focused else {
            return Ok(PollOutcome::NoFocus);
        };

        if element.is_pointer_prone() {
            tracing::trace!(?element, "Ignoring visible focus on pointer-prone element");
            return Ok(PollOutcome::Suppressed(element));
        }

        self.snapshot.record(USES_KEYBOARD_KEY, true);
        self.set_state(DetectionState::Detected);
        if let Some(ref log) = self.transparency_log {
            log.record_keyboard_detected();
        }
        tracing::info!(?element, "Keyboard usage detected");

        if let Some(callback) = self.on_detected.take() {
            callback();
        }

        Ok(PollOutcome::Detected)
    }

    /// Start polling every `interval` on `scheduler`.
    ///
    /// The task stops itself after the first detection.
    pub fn start(mut self, scheduler: &dyn Scheduler, interval: Duration) -> DetectorHandle {
        if self.state() == DetectionState::Idle {
            self.set_state(DetectionState::Polling);
        }
        let state = self.state.clone();

        let task = scheduler.schedule_repeating(
            interval,
            Box::new(move || match self.poll_once() {
                Ok(PollOutcome::Detected) | Ok(PollOutcome::AlreadyDetected) => TickOutcome::Stop,
                Ok(_) => TickOutcome::Continue,
                Err(e) => {
                    tracing::error!("{e}");
                    TickOutcome::Continue
                }
            }),
        );

        DetectorHandle { task, state }
    }
}

/// Handle to a started detector.
#[derive(Debug, Clone)]
pub struct DetectorHandle {
    task: TaskHandle,
    state: Arc<Mutex<DetectionState>>,
}

impl DetectorHandle {
    pub fn state(&self) -> DetectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_detected(&self) -> bool {
        self.state() == DetectionState::Detected
    }

    pub fn task(&self) -> &TaskHandle {
        &self.task
    }

    /// Stop polling without a detection. The state stays `Polling`.
    pub fn cancel(&self) {
        self.task.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ManualScheduler;
    use crate::snapshot::{create_shared_snapshot, PreferenceValue};
    use crate::transparency::create_shared_log;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed sequence of focus answers, then reports no focus.
    struct ReplayObserver {
        answers: Mutex<VecDeque<Result<Option<ElementDescriptor>, EnvironmentError>>>,
    }

    impl ReplayObserver {
        fn new(
            answers: Vec<Result<Option<ElementDescriptor>, EnvironmentError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into()),
            })
        }
    }

    impl FocusObserver for ReplayObserver {
        fn current_visible_focus_target(
            &self,
        ) -> Result<Option<ElementDescriptor>, EnvironmentError> {
            self.answers.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }
    }

    fn button() -> ElementDescriptor {
        ElementDescriptor::from_tag_name("BUTTON", false)
    }

    #[test]
    fn test_tag_classification() {
        assert_eq!(TagCategory::from_tag_name("INPUT"), TagCategory::Input);
        assert_eq!(TagCategory::from_tag_name("textarea"), TagCategory::TextArea);
        assert_eq!(TagCategory::from_tag_name("a"), TagCategory::Other);

        assert!(ElementDescriptor::new(TagCategory::Input).is_pointer_prone());
        assert!(ElementDescriptor::new(TagCategory::Other)
            .content_editable()
            .is_pointer_prone());
        assert!(!button().is_pointer_prone());
    }

    #[test]
    fn test_false_positives_never_detect() {
        let observer = ReplayObserver::new(vec![
            Ok(Some(ElementDescriptor::new(TagCategory::Input))),
            Ok(Some(ElementDescriptor::new(TagCategory::TextArea))),
            Ok(Some(ElementDescriptor::from_tag_name("div", true))),
            Ok(None),
        ]);
        let snapshot = create_shared_snapshot();
        let mut detector = KeyboardUsageDetector::new(observer, snapshot.clone());

        for _ in 0..4 {
            let outcome = detector.poll_once().unwrap();
            assert!(matches!(outcome, PollOutcome::Suppressed(_) | PollOutcome::NoFocus));
        }

        assert!(!snapshot.contains(USES_KEYBOARD_KEY));
        assert_eq!(detector.state(), DetectionState::Polling);
    }

    #[test]
    fn test_detects_once_and_stops_polling() {
        let observer = ReplayObserver::new(vec![
            Ok(None),
            Ok(Some(button())),
            Ok(Some(button())),
        ]);
        let snapshot = create_shared_snapshot();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_callback = calls.clone();
        let scheduler = ManualScheduler::new();

        let handle = KeyboardUsageDetector::new(observer, snapshot.clone())
            .with_callback(Box::new(move || {
                calls_in_callback.fetch_add(1, Ordering::SeqCst);
            }))
            .start(&scheduler, DEFAULT_POLL_INTERVAL);

        assert_eq!(handle.state(), DetectionState::Polling);
        scheduler.advance(Duration::from_millis(500));
        assert!(!handle.is_detected());

        scheduler.advance(Duration::from_millis(500));
        assert!(handle.is_detected());
        assert!(handle.task().is_cancelled());
        assert_eq!(snapshot.get(USES_KEYBOARD_KEY), Some(PreferenceValue::Flag(true)));

        assert_eq!(scheduler.advance(Duration::from_secs(10)), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_error_keeps_polling() {
        let observer = ReplayObserver::new(vec![
            Err(EnvironmentError::new("focus query threw")),
            Ok(Some(button())),
        ]);
        let snapshot = create_shared_snapshot();
        let log = create_shared_log();
        let scheduler = ManualScheduler::new();

        let handle = KeyboardUsageDetector::new(observer, snapshot.clone())
            .with_transparency_log(log.clone())
            .start(&scheduler, DEFAULT_POLL_INTERVAL);

        scheduler.run_pending_ticks();
        assert!(!handle.task().is_cancelled());
        assert!(!snapshot.contains(USES_KEYBOARD_KEY));

        scheduler.run_pending_ticks();
        assert!(handle.is_detected());

        let stats = log.stats();
        assert_eq!(stats.detection_ticks, 2);
        assert_eq!(stats.detection_errors, 1);
        assert!(stats.keyboard_detected_at.is_some());
    }

    #[test]
    fn test_poll_after_detection_is_inert() {
        let observer = ReplayObserver::new(vec![Ok(Some(button()))]);
        let snapshot = create_shared_snapshot();
        let mut detector = KeyboardUsageDetector::new(observer, snapshot);

        assert_eq!(detector.poll_once().unwrap(), PollOutcome::Detected);
        assert_eq!(detector.poll_once().unwrap(), PollOutcome::AlreadyDetected);
    }

    #[test]
    fn test_cancel_before_detection() {
        let observer = ReplayObserver::new(vec![Ok(None), Ok(Some(button()))]);
        let snapshot = create_shared_snapshot();
        let scheduler = ManualScheduler::new();

        let handle = KeyboardUsageDetector::new(observer, snapshot.clone())
            .start(&scheduler, DEFAULT_POLL_INTERVAL);
        scheduler.run_pending_ticks();
        handle.cancel();
        scheduler.run_pending_ticks();

        assert_eq!(handle.state(), DetectionState::Polling);
        assert!(!snapshot.contains(USES_KEYBOARD_KEY));
        assert_eq!(scheduler.active_tasks(), 0);
    }
}
