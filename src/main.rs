//! mongodb-stats-exporter - MongoDB statistics to Prometheus exposition
//!
//! Reads a captured serverStatus document (and optionally the sharding
//! changelog), runs the requested number of scrape cycles and prints the
//! resulting Prometheus text exposition.

use std::fs;
use std::thread;

use anyhow::{Context, Result};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use mongodb_stats_exporter::client::{ChangelogSource, JsonFileSource};
use mongodb_stats_exporter::config::{CliArgs, RunConfig};
use mongodb_stats_exporter::metrics::Scraper;
use mongodb_stats_exporter::ExporterError;

fn setup_logging(verbose: bool, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // Logs go to stderr so stdout carries only the exposition
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse_args();

    // Setup logging
    setup_logging(args.verbose, args.quiet)?;

    // Build configuration
    let config = RunConfig::from_cli(&args).map_err(ExporterError::Config)?;

    let scraper = Scraper::new(config.exporter.clone())?;
    info!(
        "Exporting under namespace '{}' with {} counters",
        config.exporter.namespace, config.exporter.counter_mode
    );

    let mut source = JsonFileSource::new(&config.stats_file);
    if let Some(ref changelog_file) = config.changelog_file {
        source = source.with_changelog(changelog_file);
    }
    let changelog: Option<&dyn ChangelogSource> = if config.changelog_file.is_some() {
        Some(&source)
    } else {
        None
    };

    for cycle in 1..=config.cycles {
        let report = scraper.scrape(&source, changelog);
        if !report.stats_fetched {
            warn!("Cycle {} ran without serverStatus", cycle);
        }
        if cycle < config.cycles {
            thread::sleep(config.interval);
        }
    }

    let exposition = scraper.encode()?;
    match config.output_path {
        Some(ref path) => {
            fs::write(path, &exposition)
                .with_context(|| format!("Failed to write exposition to {}", path.display()))?;
            info!("Wrote exposition to {}", path.display());
        }
        None => print!("{}", exposition),
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
