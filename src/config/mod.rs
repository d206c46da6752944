//! Configuration module

pub mod cli;
pub mod exporter_config;

pub use cli::{CliArgs, CounterModeArg};
pub use exporter_config::{ExporterConfig, RunConfig, DEFAULT_NAMESPACE};
