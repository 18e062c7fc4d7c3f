//! Scripted environments for the `simulate` command and integration tests.
//!
//! A scenario describes the media environment, what happens to visible
//! focus on each detection tick, and the analytics calls to issue.

use crate::environment::focus::FocusChange;
use crate::environment::media::{MediaSupport, SimulatedMediaEnvironment};
use crate::probe::{ElementDescriptor, TagCategory};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// A scripted run of the decorator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Support per media feature; missing features are unsupported
    #[serde(default)]
    pub media: BTreeMap<String, MediaSupport>,
    /// Focus change to apply before each detection tick (`null` for none)
    #[serde(default)]
    pub focus_timeline: Vec<Option<FocusChange>>,
    /// Calls issued through the decorated function
    #[serde(default)]
    pub calls: Vec<Vec<Value>>,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ScenarioError::IoError(e.to_string()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ScenarioError> {
        serde_json::from_str(content).map_err(|e| ScenarioError::ParseError(e.to_string()))
    }

    /// Dark color scheme, no reduced-motion support, a click on a text
    /// field followed by keyboard focus on a button.
    pub fn example() -> Self {
        let mut media = BTreeMap::new();
        media.insert(
            "prefers-color-scheme".to_string(),
            MediaSupport::Matching("dark".to_string()),
        );
        media.insert("prefers-reduced-motion".to_string(), MediaSupport::Unsupported);
        media.insert(
            "forced-colors".to_string(),
            MediaSupport::Matching("none".to_string()),
        );

        Self {
            media,
            focus_timeline: vec![
                None,
                Some(FocusChange::Focus(ElementDescriptor::new(TagCategory::Input))),
                Some(FocusChange::Blur),
                Some(FocusChange::Focus(ElementDescriptor::new(TagCategory::Other))),
            ],
            calls: vec![vec![json!("event"), json!("click"), json!({"foo": 1})]],
        }
    }

    pub fn media_environment(&self) -> SimulatedMediaEnvironment {
        SimulatedMediaEnvironment::from_table(self.media.clone())
    }
}

/// Scenario loading errors.
#[derive(Debug)]
pub enum ScenarioError {
    IoError(String),
    ParseError(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::IoError(e) => write!(f, "IO error: {e}"),
            ScenarioError::ParseError(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl std::error::Error for ScenarioError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_from_json() {
        let scenario = Scenario::from_json(
            r#"{
                "media": {"prefers-contrast": {"matching": "less"}},
                "focus_timeline": [null, {"focus": {"tag_category": "text_area"}}, "blur"],
                "calls": [["event", "page_view", {}]]
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.focus_timeline.len(), 3);
        assert_eq!(
            scenario.focus_timeline[1],
            Some(FocusChange::Focus(ElementDescriptor::new(TagCategory::TextArea)))
        );
        assert_eq!(scenario.focus_timeline[2], Some(FocusChange::Blur));
        assert_eq!(scenario.calls[0][1], json!("page_view"));
    }

    #[test]
    fn test_empty_scenario_defaults() {
        let scenario = Scenario::from_json("{}").unwrap();
        assert!(scenario.media.is_empty());
        assert!(scenario.focus_timeline.is_empty());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            Scenario::from_json("{not json"),
            Err(ScenarioError::ParseError(_))
        ));
    }

    #[test]
    fn test_example_round_trips_through_json() {
        let json = serde_json::to_string(&Scenario::example()).unwrap();
        let parsed = Scenario::from_json(&json).unwrap();
        assert_eq!(parsed.focus_timeline, Scenario::example().focus_timeline);
    }
}
