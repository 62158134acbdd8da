// ============================================================================
// METRICS COLLECTOR CLI
// ============================================================================
// Command-line entry point:
// - Sample this process into a registry and print the result
// - Validate or generate configuration files
// - Version and build information
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result as AnyhowResult};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use metrics_collector::logging::init_logging;
use metrics_collector::render::{render_json, render_sparkline, render_text};
use metrics_collector::{
    derived, CollectorConfig, MetricsError, MetricsRegistry, MetricsResult, Sampler,
    COLLECTOR_FULL_NAME, COLLECTOR_VERSION,
};

/// Points shown in the trend lines printed after a run
const SPARKLINE_POINTS: usize = 60;

/// Exit status for an interrupt that arrives with no sampling loop running
const INTERRUPTED_EXIT_CODE: i32 = 130;

// ----------------------------------------------------------------------------
// CLI Argument Parser
// ----------------------------------------------------------------------------

/// Metrics Collector CLI
#[derive(Parser, Debug)]
#[command(
    name = "metrics-collector",
    author = "Desktop Team",
    version,
    about = "In-process metrics aggregation engine",
    long_about = "Aggregates counters, gauges and bucketed histograms in memory, \
                  snapshots them on an interval into a bounded history and derives \
                  rates, error percentages and sparklines for dashboards."
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "metrics-collector.toml", env = "METRICS_COLLECTOR_CONFIG")]
    pub config: PathBuf,

    /// Log level override
    #[arg(short, long, env = "METRICS_COLLECTOR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, env = "METRICS_COLLECTOR_DEBUG")]
    pub debug: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample this process and print snapshots
    Run {
        /// Stop after this many ticks (default: until Ctrl-C)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Output format
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Validate configuration file
    Validate {
        /// Show full parsed configuration
        #[arg(short, long)]
        verbose: bool,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version and build info
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

// ----------------------------------------------------------------------------
// CLI Handler Functions
// ----------------------------------------------------------------------------

/// Handle the validate subcommand
fn handle_validate(config_path: &Path, verbose: bool) -> MetricsResult<()> {
    println!("Validating configuration file: {}", config_path.display());

    match CollectorConfig::load(config_path) {
        Ok(config) => {
            println!("✅ Configuration is valid!");

            if verbose {
                println!("\n📋 Parsed configuration:");
                println!("{}", "=".repeat(60));
                match toml::to_string_pretty(&config) {
                    Ok(s) => println!("{}", s),
                    Err(e) => println!("Failed to serialize: {}", e),
                }
            }

            println!("\n📊 Configuration Summary:");
            println!("  • Sample interval: {}ms", config.sampler.interval_ms);
            println!("  • History capacity: {}", config.sampler.history_capacity);
            println!(
                "  • System metrics: {}",
                if config.sampler.collect_system_metrics { "enabled" } else { "disabled" }
            );
            let keys: Vec<&str> = config.registry.allowed_label_keys.iter().map(|k| k.as_str()).collect();
            println!("  • Label keys: {}", keys.join(", "));

            Ok(())
        }
        Err(e) => {
            println!("❌ Configuration validation failed!");
            println!("Error: {}", e);
            Err(MetricsError::Config(e))
        }
    }
}

/// Handle the generate-config subcommand
fn handle_generate_config(output: Option<&Path>) -> MetricsResult<()> {
    let config_str = CollectorConfig::generate_default_config();

    match output {
        Some(path) => {
            fs::write(path, &config_str)?;
            println!("✅ Default configuration written to: {}", path.display());
        }
        None => {
            println!("{}", config_str);
        }
    }

    Ok(())
}

/// Handle the version subcommand
fn handle_version() {
    println!("📈 {} v{}", COLLECTOR_FULL_NAME, COLLECTOR_VERSION);
    println!();
    println!("Build Information:");
    println!("  • Target: {}", std::env::consts::ARCH);
    println!("  • OS: {}", std::env::consts::OS);
    println!("  • Family: {}", std::env::consts::FAMILY);
}

/// Stop the sampler on Ctrl-C. Returns `false` when no sampling loop was
/// running to stop, in which case the caller exits instead.
fn handle_interrupt(sampler: &Sampler) -> bool {
    match sampler.shutdown() {
        Ok(()) => true,
        Err(e) => {
            warn!(target: "metrics_collector::cli", error = %e, "No sampling loop to stop");
            false
        }
    }
}

/// Log a failure with its category before it is returned from `main`
fn report_failure(err: &MetricsError) {
    error!(
        target: "metrics_collector::cli",
        category = err.category(),
        recoverable = err.is_recoverable(),
        error = %err,
        "Command failed"
    );
}

/// Handle the run subcommand
async fn handle_run(config: &CollectorConfig, ticks: Option<u64>, format: OutputFormat) -> AnyhowResult<()> {
    let registry = Arc::new(MetricsRegistry::with_config(&config.registry));
    let sampler = Arc::new(Sampler::new(Arc::clone(&registry), &config.sampler));

    {
        let sampler = Arc::clone(&sampler);
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                info!(target: "metrics_collector::cli", "Received Ctrl-C");
                if !handle_interrupt(&sampler) {
                    std::process::exit(INTERRUPTED_EXIT_CODE);
                }
            }
        });
    }

    let mut timer = registry.start_timer("collector.run_seconds", &[("mode", "cli")]);
    if let Err(e) = sampler.run(ticks).await {
        registry.inc("collector.runs", &[("status", "error")]);
        report_failure(&e);
        return Err(e.into());
    }
    timer.end();
    registry.inc("collector.runs", &[("status", "success")]);

    let snapshot = registry.snapshot();
    match format {
        OutputFormat::Json => {
            let json = render_json(&snapshot).map_err(|e| {
                report_failure(&e);
                e
            })?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            print!("{}", render_text(&snapshot));

            let history = sampler.history();
            let history = history.read();
            let cpu = derived::sparkline_with(&*history, SPARKLINE_POINTS, |s| s.system.cpu_percent);
            let lag = derived::sparkline_with(&*history, SPARKLINE_POINTS, |s| s.system.event_loop_lag_ms);
            println!("Trends ({} snapshots):", history.len());
            println!("  cpu       {}", render_sparkline(&cpu));
            println!("  loop lag  {}", render_sparkline(&lag));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> AnyhowResult<()> {
    let cli = Cli::parse();

    // Subcommands that don't need full initialization
    match &cli.command {
        Some(Commands::Version) => {
            handle_version();
            return Ok(());
        }
        Some(Commands::GenerateConfig { output }) => {
            handle_generate_config(output.as_deref())?;
            return Ok(());
        }
        Some(Commands::Validate { verbose }) => {
            handle_validate(&cli.config, *verbose)?;
            return Ok(());
        }
        _ => {}
    }

    let config_found = cli.config.exists();
    let config = if config_found {
        CollectorConfig::load(&cli.config)
            .with_context(|| format!("Failed to load config from {}", cli.config.display()))?
    } else {
        CollectorConfig::from_env().context("Invalid configuration from environment")?
    };

    let mut logging_config = config.logging.clone();
    if let Some(level) = &cli.log_level {
        logging_config.level = level.clone();
    }
    if cli.debug {
        logging_config.level = "debug".into();
    }

    init_logging(&logging_config)?;
    if !config_found {
        warn!(
            "Config file not found at {}, using defaults with environment overrides",
            cli.config.display()
        );
    }

    info!("📈 {} v{}", COLLECTOR_FULL_NAME, COLLECTOR_VERSION);

    match cli.command {
        Some(Commands::Run { ticks, format }) => handle_run(&config, ticks, format).await?,
        None => handle_run(&config, None, OutputFormat::Text).await?,
        Some(Commands::Version | Commands::GenerateConfig { .. } | Commands::Validate { .. }) => {}
    }

    Ok(())
}
