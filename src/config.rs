// ============================================================================
// CONFIGURATION SYSTEM
// ============================================================================
// TOML file parsing with environment variable overrides, validation and
// sensible defaults. Environment variables use the `METRICS_COLLECTOR_`
// prefix with `__` between section and field, e.g.
// `METRICS_COLLECTOR_SAMPLER__INTERVAL_MS=500`.
// ============================================================================

use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::labels::LabelKey;
use crate::{
    DEFAULT_HISTORY_CAPACITY, DEFAULT_SAMPLE_INTERVAL_MS, MAX_HISTORY_CAPACITY,
    MAX_SAMPLE_INTERVAL_MS, MIN_SAMPLE_INTERVAL_MS,
};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "METRICS_COLLECTOR_";

// ----------------------------------------------------------------------------
// Root Configuration
// ----------------------------------------------------------------------------

/// Root configuration for the collector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Series identity settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Snapshot sampling settings
    #[serde(default)]
    pub sampler: SamplerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CollectorConfig {
    /// Load configuration from file with environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        Self::extract_with_env(Figment::new().merge(Toml::file(path)))
    }

    /// Defaults with environment overrides, for running without a file
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::extract_with_env(Figment::new())
    }

    fn extract_with_env(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string (no environment overrides)
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = self.sampler.interval_ms;
        if !(MIN_SAMPLE_INTERVAL_MS..=MAX_SAMPLE_INTERVAL_MS).contains(&interval) {
            return Err(ConfigError::invalid_value(
                "sampler.interval_ms",
                format!(
                    "Sample interval must be between {}ms and {}ms",
                    MIN_SAMPLE_INTERVAL_MS, MAX_SAMPLE_INTERVAL_MS
                ),
            ));
        }

        let capacity = self.sampler.history_capacity;
        if capacity == 0 || capacity > MAX_HISTORY_CAPACITY {
            return Err(ConfigError::invalid_value(
                "sampler.history_capacity",
                format!("History capacity must be between 1 and {}", MAX_HISTORY_CAPACITY),
            ));
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("Unknown log level '{}'", self.logging.level),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "compact" | "json") {
            return Err(ConfigError::invalid_value(
                "logging.format",
                "Format must be one of pretty, compact, json",
            ));
        }

        Ok(())
    }

    /// Render the default configuration as TOML
    pub fn generate_default_config() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------
// Registry Configuration
// ----------------------------------------------------------------------------

/// Series identity settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Label keys kept on series. Only narrows the built-in vocabulary.
    #[serde(default = "default_allowed_label_keys")]
    pub allowed_label_keys: Vec<LabelKey>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allowed_label_keys: default_allowed_label_keys(),
        }
    }
}

fn default_allowed_label_keys() -> Vec<LabelKey> {
    LabelKey::ALL.to_vec()
}

// ----------------------------------------------------------------------------
// Sampler Configuration
// ----------------------------------------------------------------------------

/// Snapshot sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Interval between snapshots in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Snapshots retained in history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Sample host CPU/memory and process RSS on each tick
    #[serde(default = "default_true")]
    pub collect_system_metrics: bool,
}

impl SamplerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            history_capacity: default_history_capacity(),
            collect_system_metrics: true,
        }
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_MS
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_true() -> bool {
    true
}

// ----------------------------------------------------------------------------
// Logging Configuration
// ----------------------------------------------------------------------------

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Enable ANSI colors
    #[serde(default = "default_true")]
    pub colors: bool,

    /// Include source location
    #[serde(default)]
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            colors: true,
            source_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = CollectorConfig::default();

        assert_eq!(config.sampler.interval_ms, DEFAULT_SAMPLE_INTERVAL_MS);
        assert_eq!(config.sampler.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert!(config.sampler.collect_system_metrics);
        assert_eq!(config.registry.allowed_label_keys, LabelKey::ALL.to_vec());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_round_trips() {
        let rendered = CollectorConfig::generate_default_config();
        let parsed = CollectorConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed, CollectorConfig::default());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = CollectorConfig::from_toml_str(
            r#"
            [registry]
            allowed_label_keys = ["status", "provider"]

            [sampler]
            interval_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.allowed_label_keys, vec![LabelKey::Status, LabelKey::Provider]);
        assert_eq!(config.sampler.interval(), Duration::from_millis(250));
        assert_eq!(config.sampler.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unknown_label_key_is_rejected() {
        let err = CollectorConfig::from_toml_str(
            r#"
            [registry]
            allowed_label_keys = ["status", "hostname"]
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let mut config = CollectorConfig::default();
        config.sampler.interval_ms = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "sampler.interval_ms"
        ));

        let mut config = CollectorConfig::default();
        config.sampler.history_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = CollectorConfig::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = CollectorConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }

    // Tests that read the environment run inside `Jail`, which serializes them
    // and restores any variables they set.

    #[test]
    fn test_load_from_file() {
        figment::Jail::expect_with(|_jail| {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "[sampler]\nhistory_capacity = 60\ncollect_system_metrics = false").unwrap();

            let config = CollectorConfig::load(file.path()).unwrap();
            assert_eq!(config.sampler.history_capacity, 60);
            assert!(!config.sampler.collect_system_metrics);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "collector.toml",
                "[sampler]\ninterval_ms = 1000\nhistory_capacity = 60\n",
            )?;
            jail.set_env("METRICS_COLLECTOR_SAMPLER__INTERVAL_MS", 200);
            jail.set_env("METRICS_COLLECTOR_LOGGING__FORMAT", "json");

            let config = CollectorConfig::load("collector.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.sampler.interval_ms, 200);
            assert_eq!(config.sampler.history_capacity, 60);
            assert_eq!(config.logging.format, "json");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_are_validated() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("collector.toml", "")?;
            jail.set_env("METRICS_COLLECTOR_SAMPLER__INTERVAL_MS", 5);

            let err = CollectorConfig::load("collector.toml").unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "sampler.interval_ms"));
            Ok(())
        });
    }

    #[test]
    fn test_from_env_without_file() {
        figment::Jail::expect_with(|jail| {
            assert_eq!(CollectorConfig::from_env().map_err(|e| e.to_string())?, CollectorConfig::default());

            jail.set_env("METRICS_COLLECTOR_SAMPLER__HISTORY_CAPACITY", 42);
            let config = CollectorConfig::from_env().map_err(|e| e.to_string())?;
            assert_eq!(config.sampler.history_capacity, 42);
            assert_eq!(config.sampler.interval_ms, DEFAULT_SAMPLE_INTERVAL_MS);

            jail.set_env("METRICS_COLLECTOR_SAMPLER__INTERVAL_MS", 5);
            assert!(CollectorConfig::from_env().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_load_missing_file() {
        let err = CollectorConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
