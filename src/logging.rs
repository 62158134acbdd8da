// ============================================================================
// LOGGING & TRACING
// ============================================================================
// Structured logging via `tracing`. Every event carries a target under
// `metrics_collector::*`, so `RUST_LOG=metrics_collector::sampler=debug`
// narrows output to one component.
// ============================================================================

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{MetricsError, MetricsResult};

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` directives take precedence over `config.level`. Fails if a
/// global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> MetricsResult<()> {
    let level_filter = match config.level.to_lowercase().as_str() {
        "trace" => tracing::level_filters::LevelFilter::TRACE,
        "debug" => tracing::level_filters::LevelFilter::DEBUG,
        "info" => tracing::level_filters::LevelFilter::INFO,
        "warn" => tracing::level_filters::LevelFilter::WARN,
        "error" => tracing::level_filters::LevelFilter::ERROR,
        _ => tracing::level_filters::LevelFilter::INFO,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format.as_str() {
        "json" => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location)
                    .with_thread_names(true),
            )
            .try_init(),
        "compact" => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(config.colors)
                    .with_target(true),
            )
            .try_init(),
        _ => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_ansi(config.colors)
                    .with_target(true)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location)
                    .with_thread_names(true),
            )
            .try_init(),
    };

    installed.map_err(|e| MetricsError::Internal(format!("Failed to set logger: {}", e)))?;

    info!(
        target: "metrics_collector::init",
        level = %config.level,
        format = %config.format,
        "Logging initialized"
    );

    Ok(())
}

// ----------------------------------------------------------------------------
// Logging Macros
// ----------------------------------------------------------------------------

/// Trace a metric write under the `metrics_collector::metrics` target.
#[macro_export]
macro_rules! log_metric {
    ($name:expr, $value:expr) => {
        tracing::trace!(
            target: "metrics_collector::metrics",
            metric_name = $name,
            metric_value = ?$value,
            "Metric recorded"
        )
    };
    ($name:expr, $value:expr, $($field:tt)*) => {
        tracing::trace!(
            target: "metrics_collector::metrics",
            metric_name = $name,
            metric_value = ?$value,
            $($field)*,
            "Metric recorded"
        )
    };
}

/// Debug-level sampler lifecycle event.
#[macro_export]
macro_rules! log_sampler {
    ($event:expr) => {
        tracing::debug!(
            target: "metrics_collector::sampler",
            event = $event,
            "Sampler event"
        )
    };
    ($event:expr, $($field:tt)*) => {
        tracing::debug!(
            target: "metrics_collector::sampler",
            event = $event,
            $($field)*,
            "Sampler event"
        )
    };
}
