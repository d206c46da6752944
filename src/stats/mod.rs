//! Typed statistics decoded from MongoDB documents
//!
//! This module provides:
//! - Lenient numeric decoding (plain and Extended JSON numbers)
//! - WiredTiger subsystem structures with optional subsystems
//! - serverStatus decoding and node role detection
//! - Sharding changelog window queries and baseline merging

pub mod changelog;
pub mod decode;
pub mod server_status;
pub mod wiredtiger;

pub use changelog::{
    ChangelogQuery, ChangelogSummary, ChangelogSummaryId, ShardingChangelogStats,
    BASELINE_EVENTS, CHANGELOG_COLLECTION, CHANGELOG_DATABASE, DEFAULT_CHANGELOG_WINDOW,
};
pub use decode::value_to_f64;
pub use server_status::{NodeRole, ServerStatus};
pub use wiredtiger::{
    WiredTigerStats, WtBlockManagerStats, WtCacheStats, WtConcurrentTransactionsStats,
    WtLogStats, WtSessionStats, WtTicketStats, WtTransactionStats,
};
