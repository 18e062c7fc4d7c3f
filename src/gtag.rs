//! Wiring for gtag-style analytics functions.
//!
//! gtag is called as `gtag(command, event_name, params)`. Accessibility
//! parameters are merged into `params`, each key suffixed with the event
//! name so the values stay distinguishable in reports:
//!
//! ```text
//! gtag("event", "click", {foo: 1})
//!   -> gtag("event", "click", {foo: 1, "prefers_color_scheme [click]": "dark"})
//! ```

use crate::interceptor::{
    install, AnalyticsGlobal, DecorationEnvironment, InstallError, Installation,
    InterceptorConfig, TranslationInput,
};
use crate::snapshot::{PreferenceValue, SnapshotEntries};
use serde_json::{json, Map, Value};

/// Event name used to report each value as it resolves.
pub const RESOLUTION_EVENT: &str = "resolvedAccessibilityData";

/// Suffix a snapshot key with the event it is attached to.
pub fn disambiguated_key(key: &str, event_name: &str) -> String {
    format!("{key} [{event_name}]")
}

fn event_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn disambiguated_parameters(parameters: &SnapshotEntries, event_name: &str) -> Map<String, Value> {
    parameters
        .iter()
        .map(|(key, value)| (disambiguated_key(key, event_name), value.to_json()))
        .collect()
}

/// Merge the snapshot into the third argument of a gtag call.
///
/// Calls with fewer than three arguments pass through unchanged. A
/// non-object third argument is replaced by an object holding only the
/// accessibility parameters.
pub fn translate_gtag_arguments(input: TranslationInput<'_>) -> Vec<Value> {
    let mut translated = input.original_arguments.to_vec();

    if translated.len() >= 3 {
        let event_name = event_name(&translated[1]);
        let mut parameters = match &translated[2] {
            Value::Object(original) => original.clone(),
            _ => Map::new(),
        };
        parameters.extend(disambiguated_parameters(
            input.accessibility_event_parameters,
            &event_name,
        ));
        translated[2] = Value::Object(parameters);
    }

    translated
}

/// Build the gtag interceptor configuration for `global`.
///
/// Every resolved value is also reported as its own
/// [`RESOLUTION_EVENT`] event through the decorated function.
pub fn gtag_config(global: &AnalyticsGlobal) -> InterceptorConfig {
    let reporter = global.clone();
    InterceptorConfig::for_global(global, translate_gtag_arguments).with_resolution_callback(
        move |key: &str, value: &PreferenceValue| {
            let mut parameters = Map::new();
            parameters.insert(disambiguated_key(key, RESOLUTION_EVENT), value.to_json());
            reporter.call(&[
                json!("event"),
                json!(RESOLUTION_EVENT),
                Value::Object(parameters),
            ]);
        },
    )
}

/// Decorate the gtag function held in `global`.
pub fn decorate_gtag(
    global: &AnalyticsGlobal,
    environment: &DecorationEnvironment,
) -> Result<Installation, InstallError> {
    install(gtag_config(global), environment)
}
