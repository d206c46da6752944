//! Utility modules

pub mod error;

pub use error::{ExporterError, Result, SourceError};
