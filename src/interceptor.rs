//! Analytics function interception.
//!
//! [`install`] captures the current analytics function, replaces it with a
//! wrapper that merges the accessibility snapshot into every call, then
//! populates the snapshot: media features synchronously, keyboard usage on
//! a repeating task.
//!
//! # Install order
//!
//! 1. The wrapper goes in first, so no call bypasses it.
//! 2. Media features are probed to completion before `install` returns.
//! 3. Keyboard detection is scheduled and outlives the `install` call.
//!
//! Calls observe whatever has resolved by the time they are made.

use crate::probe::{
    resolve_all, DetectionCallback, DetectionState, DetectorHandle, FocusObserver,
    KeyboardUsageDetector, MediaFeatureSpec, MediaQueryEvaluator, ProbeReport,
    DEFAULT_POLL_INTERVAL,
};
use crate::schedule::Scheduler;
use crate::snapshot::{
    create_shared_snapshot, PreferenceValue, SharedSnapshot, SnapshotEntries, USES_KEYBOARD_KEY,
};
use crate::transparency::{create_shared_log, SharedTransparencyLog};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// An analytics reporting function taking any arguments.
pub type AnalyticsFn = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Owned slot holding the current analytics function.
///
/// Clones refer to the same slot.
#[derive(Clone, Default)]
pub struct AnalyticsGlobal {
    slot: Arc<RwLock<Option<AnalyticsFn>>>,
}

impl AnalyticsGlobal {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot holding `function`.
    pub fn with_function(function: impl Fn(&[Value]) + Send + Sync + 'static) -> Self {
        let global = Self::new();
        global.set(Arc::new(function));
        global
    }

    pub fn get(&self) -> Option<AnalyticsFn> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, function: AnalyticsFn) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(function);
    }

    /// Call whatever function is current. Returns `false` if the slot is empty.
    pub fn call(&self, args: &[Value]) -> bool {
        // Clone out first so the function may replace the slot while running.
        match self.get() {
            Some(function) => {
                function(args);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for AnalyticsGlobal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsGlobal")
            .field("installed", &self.get().is_some())
            .finish()
    }
}

/// What the translation function sees on each call.
#[derive(Debug, Clone, Copy)]
pub struct TranslationInput<'a> {
    pub original_arguments: &'a [Value],
    pub accessibility_event_parameters: &'a SnapshotEntries,
}

pub type GetGlobal = Box<dyn Fn() -> Option<AnalyticsFn> + Send + 'static>;
pub type SetGlobal = Box<dyn Fn(AnalyticsFn) + Send + 'static>;
pub type TranslateArguments = Arc<dyn Fn(TranslationInput<'_>) -> Vec<Value> + Send + Sync>;
pub type SyncCompleteCallback = Box<dyn FnOnce() + Send + 'static>;
/// Invoked with the snapshot key and value each time a signal resolves.
pub type ResolutionCallback = Arc<dyn Fn(&str, &PreferenceValue) + Send + Sync>;

/// Everything `install` needs from the integrator.
pub struct InterceptorConfig {
    get_global: GetGlobal,
    set_global: SetGlobal,
    translate_arguments: TranslateArguments,
    on_sync_complete: Option<SyncCompleteCallback>,
    on_keyboard_detected: Option<DetectionCallback>,
    on_resolution: Option<ResolutionCallback>,
    features: Vec<MediaFeatureSpec>,
    poll_interval: Duration,
    keyboard_detection: bool,
    transparency_log: Option<SharedTransparencyLog>,
}

impl InterceptorConfig {
    pub fn new(
        get_global: impl Fn() -> Option<AnalyticsFn> + Send + 'static,
        set_global: impl Fn(AnalyticsFn) + Send + 'static,
        translate_arguments: impl Fn(TranslationInput<'_>) -> Vec<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            get_global: Box::new(get_global),
            set_global: Box::new(set_global),
            translate_arguments: Arc::new(translate_arguments),
            on_sync_complete: None,
            on_keyboard_detected: None,
            on_resolution: None,
            features: MediaFeatureSpec::predefined(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            keyboard_detection: true,
            transparency_log: None,
        }
    }

    /// Intercept the function held in `global`.
    pub fn for_global(
        global: &AnalyticsGlobal,
        translate_arguments: impl Fn(TranslationInput<'_>) -> Vec<Value> + Send + Sync + 'static,
    ) -> Self {
        let getter = global.clone();
        let setter = global.clone();
        Self::new(
            move || getter.get(),
            move |function| setter.set(function),
            translate_arguments,
        )
    }

    /// Run once after all media features have been probed.
    pub fn with_sync_complete(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_sync_complete = Some(Box::new(callback));
        self
    }

    /// Run once when keyboard usage is first detected.
    pub fn with_keyboard_detected(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_keyboard_detected = Some(Box::new(callback));
        self
    }

    pub fn with_resolution_callback(
        mut self,
        callback: impl Fn(&str, &PreferenceValue) + Send + Sync + 'static,
    ) -> Self {
        self.on_resolution = Some(Arc::new(callback));
        self
    }

    /// Replace the tracked media features.
    pub fn with_features(mut self, features: Vec<MediaFeatureSpec>) -> Self {
        self.features = features;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_keyboard_detection(mut self, enabled: bool) -> Self {
        self.keyboard_detection = enabled;
        self
    }

    pub fn with_transparency_log(mut self, log: SharedTransparencyLog) -> Self {
        self.transparency_log = Some(log);
        self
    }
}

/// Capabilities the decorator reads the environment through.
#[derive(Clone)]
pub struct DecorationEnvironment {
    pub media: Arc<dyn MediaQueryEvaluator + Send + Sync>,
    pub focus: Arc<dyn FocusObserver>,
    pub scheduler: Arc<dyn Scheduler>,
}

impl DecorationEnvironment {
    pub fn new(
        media: Arc<dyn MediaQueryEvaluator + Send + Sync>,
        focus: Arc<dyn FocusObserver>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            media,
            focus,
            scheduler,
        }
    }
}

/// Errors that prevent installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// There was no analytics function to intercept
    MissingGlobal,
}

impl std::fmt::Display for InstallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallError::MissingGlobal => {
                write!(f, "No analytics function is installed to decorate")
            }
        }
    }
}

impl std::error::Error for InstallError {}

/// A live decoration.
///
/// Dropping it does not stop keyboard detection; use
/// [`Installation::cancel_keyboard_detection`] for that.
pub struct Installation {
    snapshot: SharedSnapshot,
    probe_report: ProbeReport,
    detector: Option<DetectorHandle>,
    transparency_log: SharedTransparencyLog,
}

impl Installation {
    pub fn snapshot(&self) -> &SharedSnapshot {
        &self.snapshot
    }

    /// Outcome of the install-time media feature pass.
    pub fn probe_report(&self) -> &ProbeReport {
        &self.probe_report
    }

    /// `None` when keyboard detection was disabled.
    pub fn detector(&self) -> Option<&DetectorHandle> {
        self.detector.as_ref()
    }

    pub fn detection_state(&self) -> Option<DetectionState> {
        self.detector.as_ref().map(DetectorHandle::state)
    }

    /// Stop keyboard polling if it is still running.
    pub fn cancel_keyboard_detection(&self) {
        if let Some(ref detector) = self.detector {
            detector.cancel();
        }
    }

    pub fn transparency_log(&self) -> &SharedTransparencyLog {
        &self.transparency_log
    }

    pub fn instance_id(&self) -> Uuid {
        self.transparency_log.instance_id()
    }
}

/// Decorate the analytics function described by `config`.
pub fn install(
    config: InterceptorConfig,
    environment: &DecorationEnvironment,
) -> Result<Installation, InstallError> {
    let original = (config.get_global)().ok_or(InstallError::MissingGlobal)?;
    let snapshot = create_shared_snapshot();
    let transparency_log = config.transparency_log.unwrap_or_else(create_shared_log);

    let wrapper: AnalyticsFn = {
        let snapshot = snapshot.clone();
        let translate = config.translate_arguments.clone();
        let log = transparency_log.clone();
        Arc::new(move |received: &[Value]| {
            let parameters = snapshot.entries();
            let translated = translate(TranslationInput {
                original_arguments: received,
                accessibility_event_parameters: &parameters,
            });
            log.record_call_forwarded();
            original(translated.as_slice());
        })
    };
    (config.set_global)(wrapper);
    tracing::debug!(
        instance_id = %transparency_log.instance_id(),
        "Analytics function decorated"
    );

    let on_resolution = config.on_resolution;
    let probe_report = resolve_all(
        &config.features,
        environment.media.as_ref(),
        &snapshot,
        |resolved| {
            if let Some(ref callback) = on_resolution {
                callback(&resolved.key, &PreferenceValue::Text(resolved.value.clone()));
            }
        },
    );
    for _ in &probe_report.resolved {
        transparency_log.record_feature_resolved();
    }
    for _ in &probe_report.failures {
        transparency_log.record_feature_skipped();
    }

    if let Some(callback) = config.on_sync_complete {
        callback();
    }

    let detector = if config.keyboard_detection {
        let on_keyboard_detected = config.on_keyboard_detected;
        let detector = KeyboardUsageDetector::new(environment.focus.clone(), snapshot.clone())
            .with_transparency_log(transparency_log.clone())
            .with_callback(Box::new(move || {
                if let Some(callback) = on_keyboard_detected {
                    callback();
                }
                if let Some(ref callback) = on_resolution {
                    callback(USES_KEYBOARD_KEY, &PreferenceValue::Flag(true));
                }
            }));
        Some(detector.start(environment.scheduler.as_ref(), config.poll_interval))
    } else {
        None
    };

    Ok(Installation {
        snapshot,
        probe_report,
        detector,
        transparency_log,
    })
}
