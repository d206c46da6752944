//! Prometheus metric export
//!
//! This module provides:
//! - Counter increment policies (cumulative re-add or delta)
//! - Labeled and scalar instrument helpers
//! - One exporter per WiredTiger subsystem
//! - The sharding changelog gauge family
//! - The registry that owns every instrument
//! - Scrape orchestration and text encoding

pub mod changelog;
pub mod collector;
pub mod counter_mode;
pub mod instruments;
pub mod registry;
pub mod wiredtiger;

pub use changelog::ChangelogMetrics;
pub use collector::{ScrapeReport, Scraper};
pub use counter_mode::{CounterMode, CounterPolicy};
pub use registry::ExporterRegistry;
pub use wiredtiger::{
    BlockManagerMetrics, CacheMetrics, ConcurrentTransactionsMetrics, LogMetrics,
    SessionMetrics, SubsystemExporter, TransactionMetrics, WiredTigerMetrics,
};
