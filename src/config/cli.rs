//! Command-line argument parsing
//!
//! Arguments are grouped by category: inputs, metric shape, scrape loop
//! and output.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::metrics::CounterMode;

/// Translate MongoDB engine statistics into Prometheus metrics
#[derive(Parser, Debug, Clone)]
#[command(name = "mongodb-stats-exporter")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Inputs =====
    /// serverStatus (or bare wiredTiger) JSON document
    #[arg(short = 's', long = "stats-file")]
    pub stats_file: PathBuf,

    /// config.changelog entries or grouped aggregation output, as a JSON array
    #[arg(short = 'c', long = "changelog-file")]
    pub changelog_file: Option<PathBuf>,

    /// Skip the sharding changelog query entirely
    #[arg(long = "no-changelog")]
    pub no_changelog: bool,

    // ===== Metric Shape =====
    /// Metric namespace (first component of every metric name)
    #[arg(long = "namespace", default_value = "mongodb")]
    pub namespace: String,

    /// Trailing changelog window in seconds
    #[arg(long = "changelog-window-secs", default_value_t = 600)]
    pub changelog_window_secs: u64,

    /// How engine lifetime totals become counter increments
    #[arg(long = "counter-mode", value_enum, default_value_t = CounterModeArg::Cumulative)]
    pub counter_mode: CounterModeArg,

    // ===== Scrape Loop =====
    /// Number of scrape cycles to run
    #[arg(short = 'n', long = "cycles", default_value_t = 1)]
    pub cycles: u32,

    /// Pause between scrape cycles in milliseconds
    #[arg(long = "interval-ms", default_value_t = 1000)]
    pub interval_ms: u64,

    // ===== Output =====
    /// Write the exposition to a file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

/// Counter increment policy
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterModeArg {
    /// Re-add the engine's lifetime total every scrape
    #[default]
    Cumulative,
    /// Add only the growth since the previous scrape
    Delta,
}

impl From<CounterModeArg> for CounterMode {
    fn from(arg: CounterModeArg) -> Self {
        match arg {
            CounterModeArg::Cumulative => CounterMode::Cumulative,
            CounterModeArg::Delta => CounterMode::Delta,
        }
    }
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.namespace.trim().is_empty() {
            return Err("--namespace must not be empty".to_string());
        }

        if !self
            .namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(format!(
                "--namespace '{}' may only contain [a-zA-Z0-9_]",
                self.namespace
            ));
        }

        if self.changelog_window_secs == 0 {
            return Err("--changelog-window-secs must be at least 1".to_string());
        }

        if self.cycles == 0 {
            return Err("--cycles must be at least 1".to_string());
        }

        if self.no_changelog && self.changelog_file.is_some() {
            return Err("--no-changelog conflicts with --changelog-file".to_string());
        }

        if self.verbose && self.quiet {
            return Err("--verbose and --quiet are mutually exclusive".to_string());
        }

        Ok(())
    }
}
