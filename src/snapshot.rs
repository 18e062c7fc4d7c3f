//! In-memory snapshot of resolved accessibility signals.
//!
//! The snapshot is written by the media-feature probe (once per feature, at
//! install time) and by the keyboard detector (at most once), and read by
//! every decorated analytics call. Keys are never removed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Snapshot key written by the keyboard detector.
pub const USES_KEYBOARD_KEY: &str = "uses_keyboard";

/// A resolved accessibility value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    /// A discrete media-feature value such as `"dark"`
    Text(String),
    /// A detected flag such as `uses_keyboard`
    Flag(bool),
}

impl PreferenceValue {
    /// Convert into a JSON value for an outgoing analytics payload.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PreferenceValue::Text(s) => serde_json::Value::String(s.clone()),
            PreferenceValue::Flag(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceValue::Text(s) => write!(f, "{s}"),
            PreferenceValue::Flag(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for PreferenceValue {
    fn from(value: &str) -> Self {
        PreferenceValue::Text(value.to_string())
    }
}

impl From<String> for PreferenceValue {
    fn from(value: String) -> Self {
        PreferenceValue::Text(value)
    }
}

impl From<bool> for PreferenceValue {
    fn from(value: bool) -> Self {
        PreferenceValue::Flag(value)
    }
}

/// Copy of the snapshot contents at a point in time.
pub type SnapshotEntries = BTreeMap<String, PreferenceValue>;

/// Append/overwrite-only mapping from provider-safe key to resolved value.
#[derive(Debug, Default)]
pub struct PreferenceSnapshot {
    entries: RwLock<SnapshotEntries>,
}

impl PreferenceSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved value, overwriting any previous value for the key.
    pub fn record(&self, key: impl Into<String>, value: impl Into<PreferenceValue>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.into(), value.into());
    }

    /// Look up a single key.
    pub fn get(&self, key: &str) -> Option<PreferenceValue> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    /// Copy out everything resolved so far.
    pub fn entries(&self) -> SnapshotEntries {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Snapshot shared between the interceptor, the probe pass and the detector.
pub type SharedSnapshot = Arc<PreferenceSnapshot>;

/// Create a new empty shared snapshot.
pub fn create_shared_snapshot() -> SharedSnapshot {
    Arc::new(PreferenceSnapshot::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_read_back() {
        let snapshot = PreferenceSnapshot::new();
        assert!(snapshot.is_empty());

        snapshot.record("prefers_color_scheme", "dark");
        snapshot.record(USES_KEYBOARD_KEY, true);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.get("prefers_color_scheme"),
            Some(PreferenceValue::Text("dark".to_string()))
        );
        assert_eq!(snapshot.get(USES_KEYBOARD_KEY), Some(PreferenceValue::Flag(true)));
        assert!(!snapshot.contains("forced_colors"));
    }

    #[test]
    fn test_entries_is_a_copy() {
        let snapshot = PreferenceSnapshot::new();
        snapshot.record("forced_colors", "none");

        let before = snapshot.entries();
        snapshot.record("inverted_colors", "inverted");

        assert_eq!(before.len(), 1);
        assert_eq!(snapshot.entries().len(), 2);
    }

    #[test]
    fn test_value_json_shape() {
        assert_eq!(PreferenceValue::from("reduce").to_json(), serde_json::json!("reduce"));
        assert_eq!(PreferenceValue::from(true).to_json(), serde_json::json!(true));
        assert_eq!(
            serde_json::to_string(&PreferenceValue::from("more")).unwrap(),
            "\"more\""
        );
    }
}
