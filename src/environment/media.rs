//! In-memory media query environment.

use crate::probe::{EnvironmentError, MediaFeatureSpec, MediaQueryEvaluator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the simulated environment answers for one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSupport {
    /// The feature is not recognized
    Unsupported,
    /// The feature is recognized and this value matches
    Matching(String),
    /// The feature is recognized but no declared value matches
    NoMatch,
    /// Evaluating anything about the feature fails
    Broken(String),
}

/// Media environment backed by a per-feature table.
///
/// Features missing from the table are unsupported.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulatedMediaEnvironment {
    features: BTreeMap<String, MediaSupport>,
}

impl SimulatedMediaEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(features: BTreeMap<String, MediaSupport>) -> Self {
        Self { features }
    }

    pub fn with_feature(mut self, feature: &str, support: MediaSupport) -> Self {
        self.set_feature(feature, support);
        self
    }

    pub fn set_feature(&mut self, feature: &str, support: MediaSupport) {
        self.features.insert(feature.to_string(), support);
    }

    fn support(&self, feature: &str) -> &MediaSupport {
        self.features
            .get(feature)
            .unwrap_or(&MediaSupport::Unsupported)
    }
}

impl MediaQueryEvaluator for SimulatedMediaEnvironment {
    fn supports(&self, spec: &MediaFeatureSpec) -> Result<bool, EnvironmentError> {
        match self.support(&spec.feature) {
            MediaSupport::Unsupported => Ok(false),
            MediaSupport::Matching(_) | MediaSupport::NoMatch => Ok(true),
            MediaSupport::Broken(message) => Err(EnvironmentError::new(message.clone())),
        }
    }

    fn matches(&self, spec: &MediaFeatureSpec, value: &str) -> Result<bool, EnvironmentError> {
        match self.support(&spec.feature) {
            MediaSupport::Matching(current) => Ok(current == value),
            MediaSupport::Unsupported | MediaSupport::NoMatch => Ok(false),
            MediaSupport::Broken(message) => Err(EnvironmentError::new(message.clone())),
        }
    }
}
