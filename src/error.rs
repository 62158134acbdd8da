// ============================================================================
// ERROR HANDLING FRAMEWORK
// ============================================================================
// The registry and the derived calculators are total: they normalize bad
// input instead of failing. Errors exist only around them, for configuration
// loading, logging setup and the background sampler.
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

// ----------------------------------------------------------------------------
// Top-Level Error
// ----------------------------------------------------------------------------

/// The main error type for the collector.
/// All subsystem errors can be converted to this type.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sampler error: {0}")]
    Sampler(#[from] SamplerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MetricsError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            MetricsError::Config(_) => false,
            MetricsError::Sampler(e) => e.is_recoverable(),
            MetricsError::Io(_) => true,
            MetricsError::Serialization(_) => true,
            MetricsError::Internal(_) => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            MetricsError::Config(_) => "config",
            MetricsError::Sampler(_) => "sampler",
            MetricsError::Io(_) => "io",
            MetricsError::Serialization(_) => "serialization",
            MetricsError::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for MetricsError {
    fn from(e: serde_json::Error) -> Self {
        MetricsError::Serialization(e.to_string())
    }
}

// ----------------------------------------------------------------------------
// Configuration Errors
// ----------------------------------------------------------------------------

/// Errors related to configuration loading and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to parse configuration: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        ConfigError::ParseError {
            message: message.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Sampler Errors
// ----------------------------------------------------------------------------

/// Errors from the background snapshot sampler
#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("Sampler is already running")]
    AlreadyRunning,

    #[error("Sampler is not running")]
    NotRunning,

    #[error("System probe unavailable: {message}")]
    SystemProbe { message: String },
}

impl SamplerError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SamplerError::SystemProbe { .. })
    }
}

/// Result type alias for collector operations
pub type MetricsResult<T> = Result<T, MetricsError>;
