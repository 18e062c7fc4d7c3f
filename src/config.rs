//! Configuration for the accessibility analytics decorator.

use crate::interceptor::InterceptorConfig;
use crate::probe::{MediaFeatureSpec, DEFAULT_POLL_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interval between keyboard detection ticks
    #[serde(with = "duration_millis_serde")]
    pub poll_interval: Duration,

    /// Media features to resolve at install time
    pub features: Vec<MediaFeatureSpec>,

    /// Whether to run keyboard usage detection
    pub keyboard_detection: bool,

    /// Default tracing filter for the CLI (`RUST_LOG` takes precedence)
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            features: MediaFeatureSpec::predefined(),
            keyboard_detection: true,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let config_path = Self::config_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("a11y-analytics")
            .join("config.json")
    }

    /// Apply these settings to an interceptor configuration.
    pub fn apply(&self, interceptor: InterceptorConfig) -> InterceptorConfig {
        interceptor
            .with_features(self.features.clone())
            .with_poll_interval(self.poll_interval)
            .with_keyboard_detection(self.keyboard_detection)
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as milliseconds.
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.features.len(), 5);
        assert!(config.keyboard_detection);
    }

    #[test]
    fn test_config_from_json() {
        let config = Config::from_json(
            r#"{
                "poll_interval": 250,
                "features": [{
                    "feature": "prefers-reduced-transparency",
                    "possible_values": ["no-preference", "reduce"]
                }],
                "keyboard_detection": false,
                "log_filter": "debug"
            }"#,
        )
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.features[0].key(), "prefers_reduced_transparency");
        assert!(!config.keyboard_detection);
    }

    #[test]
    fn test_config_serializes_millis() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["poll_interval"], 500);
        assert_eq!(json["features"][1]["feature"], "prefers-color-scheme");
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(
            Config::from_json("[]"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_save_to_writes_loadable_config() {
        let dir = std::env::temp_dir().join(format!("a11y-analytics-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("config.json");

        let config = Config {
            poll_interval: Duration::from_millis(750),
            keyboard_detection: false,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.poll_interval, Duration::from_millis(750));
        assert!(!loaded.keyboard_detection);
        assert_eq!(loaded.features.len(), 5);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
