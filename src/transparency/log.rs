//! Decoration transparency log.
//!
//! This module tracks what the decorator did during the current session
//! (how many calls it augmented, which preferences it resolved, how long
//! keyboard detection took) without recording any payload contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Transparency statistics for the current installation.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Identifies this installation in logs
    instance_id: Uuid,
    /// Number of analytics calls forwarded through the decorator
    calls_forwarded: AtomicU64,
    /// Number of media features resolved
    features_resolved: AtomicU64,
    /// Number of media features skipped after a probe failure
    features_skipped: AtomicU64,
    /// Number of keyboard detection ticks run
    detection_ticks: AtomicU64,
    /// Number of detection ticks that failed
    detection_errors: AtomicU64,
    /// When keyboard usage was first detected
    keyboard_detected_at: Mutex<Option<DateTime<Utc>>>,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            calls_forwarded: AtomicU64::new(0),
            features_resolved: AtomicU64::new(0),
            features_skipped: AtomicU64::new(0),
            detection_ticks: AtomicU64::new(0),
            detection_errors: AtomicU64::new(0),
            keyboard_detected_at: Mutex::new(None),
            session_start: Utc::now(),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Record a call forwarded to the original analytics function.
    pub fn record_call_forwarded(&self) {
        self.calls_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a resolved media feature.
    pub fn record_feature_resolved(&self) {
        self.features_resolved.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a media feature that could not be resolved.
    pub fn record_feature_skipped(&self) {
        self.features_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detection_tick(&self) {
        self.detection_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detection_error(&self) {
        self.detection_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record keyboard detection. Only the first call is kept.
    pub fn record_keyboard_detected(&self) {
        let mut detected = self
            .keyboard_detected_at
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if detected.is_none() {
            *detected = Some(Utc::now());
        }
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            instance_id: self.instance_id,
            calls_forwarded: self.calls_forwarded.load(Ordering::Relaxed),
            features_resolved: self.features_resolved.load(Ordering::Relaxed),
            features_skipped: self.features_skipped.load(Ordering::Relaxed),
            detection_ticks: self.detection_ticks.load(Ordering::Relaxed),
            detection_errors: self.detection_errors.load(Ordering::Relaxed),
            keyboard_detected_at: *self
                .keyboard_detected_at
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        let keyboard = match stats.keyboard_detected_at {
            Some(at) => format!(
                "detected after {} seconds",
                (at - stats.session_start).num_seconds().max(0)
            ),
            None => "not detected".to_string(),
        };
        format!(
            "Session Statistics:\n\
             - Analytics calls decorated: {}\n\
             - Media features resolved: {}\n\
             - Media features skipped: {}\n\
             - Keyboard detection ticks: {} ({} failed)\n\
             - Keyboard usage: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Data Guarantee:\n\
             - Only display preferences and keyboard usage are attached\n\
             - No key content or pointer positions captured\n\
             - Nothing is persisted between sessions",
            stats.calls_forwarded,
            stats.features_resolved,
            stats.features_skipped,
            stats.detection_ticks,
            stats.detection_errors,
            keyboard,
            stats.session_duration_secs
        )
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub instance_id: Uuid,
    pub calls_forwarded: u64,
    pub features_resolved: u64,
    pub features_skipped: u64,
    pub detection_ticks: u64,
    pub detection_errors: u64,
    pub keyboard_detected_at: Option<DateTime<Utc>>,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}
