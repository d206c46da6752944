//! Exporter configuration derived from CLI arguments

use std::path::PathBuf;
use std::time::Duration;

use super::cli::CliArgs;
use crate::metrics::CounterMode;
use crate::stats::DEFAULT_CHANGELOG_WINDOW;

/// Default metric namespace
pub const DEFAULT_NAMESPACE: &str = "mongodb";

/// Settings that shape the metric pipeline
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub namespace: String,
    pub counter_mode: CounterMode,
    pub changelog_enabled: bool,
    pub changelog_window: Duration,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            counter_mode: CounterMode::default(),
            changelog_enabled: true,
            changelog_window: DEFAULT_CHANGELOG_WINDOW,
        }
    }
}

/// Complete configuration of the command-line tool
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub exporter: ExporterConfig,

    // Inputs
    pub stats_file: PathBuf,
    pub changelog_file: Option<PathBuf>,

    // Scrape loop
    pub cycles: u32,
    pub interval: Duration,

    // Output
    pub output_path: Option<PathBuf>,
    pub quiet: bool,
    pub verbose: bool,
}

impl RunConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        args.validate()?;

        let exporter = ExporterConfig {
            namespace: args.namespace.clone(),
            counter_mode: args.counter_mode.into(),
            changelog_enabled: !args.no_changelog,
            changelog_window: Duration::from_secs(args.changelog_window_secs),
        };

        Ok(Self {
            exporter,
            stats_file: args.stats_file.clone(),
            changelog_file: args.changelog_file.clone(),
            cycles: args.cycles,
            interval: Duration::from_millis(args.interval_ms),
            output_path: args.output.clone(),
            quiet: args.quiet,
            verbose: args.verbose,
        })
    }
}
