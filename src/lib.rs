//! mongodb-stats-exporter library
//!
//! Translates MongoDB serverStatus WiredTiger statistics and the sharding
//! changelog into Prometheus metrics.

pub mod client;
pub mod config;
pub mod metrics;
pub mod stats;
pub mod utils;

pub use client::{ChangelogSource, JsonFileSource, StatsSource};
pub use config::ExporterConfig;
pub use metrics::{CounterMode, ExporterRegistry, ScrapeReport, Scraper};
pub use utils::{ExporterError, Result, SourceError};
