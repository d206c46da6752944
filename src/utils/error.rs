//! Error types for mongodb-stats-exporter

use std::io;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Failures reported by a statistics or changelog collaborator
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed { path: String, source: io::Error },

    #[error("Invalid JSON document in {path}: {source}")]
    InvalidDocument {
        path: String,
        source: serde_json::Error,
    },

    #[error("Unexpected document shape: expected {expected}, got {actual}")]
    UnexpectedShape { expected: String, actual: String },

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
