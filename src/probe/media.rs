//! Media-feature preference resolution.
//!
//! Each tracked feature has a closed list of legal values. Resolution first
//! checks that the environment recognizes the feature at all, then looks for
//! the first declared value whose discrete query matches. A feature nobody
//! matches usually means the platform grew a new value.

use crate::probe::EnvironmentError;
use crate::snapshot::{PreferenceSnapshot, PreferenceValue};
use serde::{Deserialize, Serialize};

/// A media feature and its legal values, in tie-break order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFeatureSpec {
    /// Feature name as written in a media query, e.g. `prefers-reduced-motion`
    pub feature: String,
    /// Declared values; the first matching one wins
    pub possible_values: Vec<String>,
}

impl MediaFeatureSpec {
    pub fn new(feature: &str, possible_values: &[&str]) -> Self {
        Self {
            feature: feature.to_string(),
            possible_values: possible_values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// The five tracked display preferences.
    pub fn predefined() -> Vec<Self> {
        vec![
            Self::new("prefers-reduced-motion", &["no-preference", "reduce"]),
            Self::new("prefers-color-scheme", &["light", "dark"]),
            // Safari only at the moment
            Self::new("inverted-colors", &["none", "inverted"]),
            Self::new("forced-colors", &["none", "active"]),
            Self::new("prefers-contrast", &["no-preference", "more", "less", "custom"]),
        ]
    }

    /// Snapshot key for this feature.
    pub fn key(&self) -> String {
        provider_safe_key(&self.feature)
    }

    /// Query that is true exactly when the feature is recognized.
    pub fn support_query(&self) -> String {
        format!("not all and ({0}), ({0})", self.feature)
    }

    /// Discrete query for one value.
    pub fn value_query(&self, value: &str) -> String {
        format!("({}: {})", self.feature, value)
    }
}

/// Replace characters analytics backends reject in parameter names.
pub fn provider_safe_key(feature: &str) -> String {
    feature.replace('-', "_")
}

/// Feature detection and discrete value matching.
pub trait MediaQueryEvaluator {
    /// Whether the environment recognizes `spec.feature`.
    fn supports(&self, spec: &MediaFeatureSpec) -> Result<bool, EnvironmentError>;

    /// Whether `(feature: value)` currently matches.
    fn matches(&self, spec: &MediaFeatureSpec, value: &str) -> Result<bool, EnvironmentError>;
}

/// Raw media query evaluation, the shape of a browser's `matchMedia`.
pub trait MatchMedia {
    fn match_media(&self, query: &str) -> Result<bool, EnvironmentError>;
}

/// Adapts a raw [`MatchMedia`] into a [`MediaQueryEvaluator`] by building
/// the support and value queries.
#[derive(Debug, Clone)]
pub struct MatchMediaEvaluator<M> {
    inner: M,
}

impl<M: MatchMedia> MatchMediaEvaluator<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<M: MatchMedia> MediaQueryEvaluator for MatchMediaEvaluator<M> {
    fn supports(&self, spec: &MediaFeatureSpec) -> Result<bool, EnvironmentError> {
        self.inner.match_media(&spec.support_query())
    }

    fn matches(&self, spec: &MediaFeatureSpec, value: &str) -> Result<bool, EnvironmentError> {
        self.inner.match_media(&spec.value_query(value))
    }
}

/// A feature resolved to one of its declared values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPreference {
    /// Provider-safe key
    pub key: String,
    pub value: String,
}

/// Why a feature could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The environment does not recognize the feature
    Unsupported { feature: String },
    /// None of the declared values matched
    NoMatch { feature: String },
    /// The environment failed while evaluating a query
    Environment { feature: String, message: String },
}

impl ProbeError {
    pub fn feature(&self) -> &str {
        match self {
            ProbeError::Unsupported { feature }
            | ProbeError::NoMatch { feature }
            | ProbeError::Environment { feature, .. } => feature,
        }
    }
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Unsupported { feature } => {
                write!(f, "Environment doesn't support {feature} yet")
            }
            ProbeError::NoMatch { feature } => write!(
                f,
                "No declared value matched. Is there a new {feature} allowed value not accounted for?"
            ),
            ProbeError::Environment { feature, message } => {
                write!(f, "Failed to evaluate {feature}: {message}")
            }
        }
    }
}

impl std::error::Error for ProbeError {}

/// Resolve one feature without touching any snapshot.
pub fn resolve(
    spec: &MediaFeatureSpec,
    evaluator: &dyn MediaQueryEvaluator,
) -> Result<ResolvedPreference, ProbeError> {
    let environment_error = |e: EnvironmentError| ProbeError::Environment {
        feature: spec.feature.clone(),
        message: e.to_string(),
    };

    if !evaluator.supports(spec).map_err(environment_error)? {
        return Err(ProbeError::Unsupported {
            feature: spec.feature.clone(),
        });
    }

    for value in &spec.possible_values {
        if evaluator.matches(spec, value).map_err(environment_error)? {
            return Ok(ResolvedPreference {
                key: spec.key(),
                value: value.clone(),
            });
        }
    }

    Err(ProbeError::NoMatch {
        feature: spec.feature.clone(),
    })
}

/// Outcome of a batch of probes.
#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    pub resolved: Vec<ResolvedPreference>,
    pub failures: Vec<ProbeError>,
}

impl ProbeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolve every spec, writing successes into `snapshot`.
///
/// Failures are logged and skipped; they never stop the remaining probes.
/// `on_resolved` runs after each successful write.
pub fn resolve_all(
    specs: &[MediaFeatureSpec],
    evaluator: &dyn MediaQueryEvaluator,
    snapshot: &PreferenceSnapshot,
    mut on_resolved: impl FnMut(&ResolvedPreference),
) -> ProbeReport {
    let mut report = ProbeReport::default();

    for spec in specs {
        match resolve(spec, evaluator) {
            Ok(resolved) => {
                tracing::debug!(
                    key = %resolved.key,
                    value = %resolved.value,
                    "Resolved media feature"
                );
                snapshot.record(
                    resolved.key.clone(),
                    PreferenceValue::Text(resolved.value.clone()),
                );
                on_resolved(&resolved);
                report.resolved.push(resolved);
            }
            Err(e) => {
                match &e {
                    ProbeError::Unsupported { .. } => tracing::warn!("{e}"),
                    ProbeError::NoMatch { .. } | ProbeError::Environment { .. } => {
                        tracing::error!("{e}")
                    }
                }
                report.failures.push(e);
            }
        }
    }

    report
}
