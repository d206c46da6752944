//! Typed WiredTiger statistics
//!
//! Each struct binds its fields to the exact keys the storage engine uses in
//! the `wiredTiger` section of serverStatus. Every numeric field goes through
//! [`lenient_f64`], so missing or malformed values read as zero.

use serde::Deserialize;
use serde_json::Value;

use super::decode::{decode_subsystem, lenient_f64, lenient_subsystem};

/// Block manager statistics (`wiredTiger.block-manager`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WtBlockManagerStats {
    #[serde(rename = "mapped bytes read", deserialize_with = "lenient_f64")]
    pub mapped_bytes_read: f64,
    #[serde(rename = "bytes read", deserialize_with = "lenient_f64")]
    pub bytes_read: f64,
    #[serde(rename = "bytes written", deserialize_with = "lenient_f64")]
    pub bytes_written: f64,
    #[serde(rename = "mapped blocks read", deserialize_with = "lenient_f64")]
    pub mapped_blocks_read: f64,
    #[serde(rename = "blocks pre-loaded", deserialize_with = "lenient_f64")]
    pub blocks_pre_loaded: f64,
    #[serde(rename = "blocks read", deserialize_with = "lenient_f64")]
    pub blocks_read: f64,
    #[serde(rename = "blocks written", deserialize_with = "lenient_f64")]
    pub blocks_written: f64,
}

/// Cache statistics (`wiredTiger.cache`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WtCacheStats {
    #[serde(rename = "bytes currently in the cache", deserialize_with = "lenient_f64")]
    pub bytes_total: f64,
    #[serde(rename = "tracked dirty bytes in the cache", deserialize_with = "lenient_f64")]
    pub bytes_dirty: f64,
    #[serde(
        rename = "tracked bytes belonging to internal pages in the cache",
        deserialize_with = "lenient_f64"
    )]
    pub bytes_internal_pages: f64,
    #[serde(
        rename = "tracked bytes belonging to leaf pages in the cache",
        deserialize_with = "lenient_f64"
    )]
    pub bytes_leaf_pages: f64,
    #[serde(rename = "maximum bytes configured", deserialize_with = "lenient_f64")]
    pub max_bytes: f64,
    #[serde(rename = "bytes read into cache", deserialize_with = "lenient_f64")]
    pub bytes_read_into: f64,
    #[serde(rename = "bytes written from cache", deserialize_with = "lenient_f64")]
    pub bytes_written_from: f64,
    #[serde(rename = "unmodified pages evicted", deserialize_with = "lenient_f64")]
    pub evicted_unmodified: f64,
    #[serde(rename = "modified pages evicted", deserialize_with = "lenient_f64")]
    pub evicted_modified: f64,
    #[serde(rename = "percentage overhead", deserialize_with = "lenient_f64")]
    pub percent_overhead: f64,
    #[serde(rename = "pages currently held in the cache", deserialize_with = "lenient_f64")]
    pub pages_total: f64,
    #[serde(rename = "pages read into cache", deserialize_with = "lenient_f64")]
    pub pages_read_into: f64,
    #[serde(rename = "pages written from cache", deserialize_with = "lenient_f64")]
    pub pages_written_from: f64,
    #[serde(rename = "tracked dirty pages in the cache", deserialize_with = "lenient_f64")]
    pub pages_dirty: f64,
}

/// Journal/log statistics (`wiredTiger.log`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WtLogStats {
    #[serde(rename = "total log buffer size", deserialize_with = "lenient_f64")]
    pub total_buffer_size: f64,
    #[serde(rename = "total size of compressed records", deserialize_with = "lenient_f64")]
    pub total_size_compressed: f64,
    #[serde(rename = "log bytes of payload data", deserialize_with = "lenient_f64")]
    pub bytes_payload_data: f64,
    #[serde(rename = "log bytes written", deserialize_with = "lenient_f64")]
    pub bytes_written: f64,
    #[serde(rename = "log records not compressed", deserialize_with = "lenient_f64")]
    pub records_uncompressed: f64,
    #[serde(rename = "log records compressed", deserialize_with = "lenient_f64")]
    pub records_compressed: f64,
    #[serde(rename = "records processed by log scan", deserialize_with = "lenient_f64")]
    pub records_processed_log_scan: f64,
    #[serde(rename = "maximum log file size", deserialize_with = "lenient_f64")]
    pub max_log_size: f64,
    #[serde(rename = "log flush operations", deserialize_with = "lenient_f64")]
    pub log_flushes: f64,
    #[serde(rename = "log read operations", deserialize_with = "lenient_f64")]
    pub log_reads: f64,
    #[serde(rename = "log scan records requiring two reads", deserialize_with = "lenient_f64")]
    pub log_scans_double: f64,
    #[serde(rename = "log scan operations", deserialize_with = "lenient_f64")]
    pub log_scans: f64,
    #[serde(rename = "log sync operations", deserialize_with = "lenient_f64")]
    pub log_syncs: f64,
    #[serde(rename = "log sync_dir operations", deserialize_with = "lenient_f64")]
    pub log_sync_dirs: f64,
    #[serde(rename = "log write operations", deserialize_with = "lenient_f64")]
    pub log_writes: f64,
}

/// Session statistics (`wiredTiger.session`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WtSessionStats {
    #[serde(rename = "open cursor count", deserialize_with = "lenient_f64")]
    pub cursors: f64,
    #[serde(rename = "open session count", deserialize_with = "lenient_f64")]
    pub sessions: f64,
}

/// Transaction and checkpoint statistics (`wiredTiger.transaction`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WtTransactionStats {
    #[serde(rename = "transaction begins", deserialize_with = "lenient_f64")]
    pub begins: f64,
    #[serde(rename = "transaction checkpoints", deserialize_with = "lenient_f64")]
    pub checkpoints: f64,
    #[serde(
        rename = "transaction checkpoint currently running",
        deserialize_with = "lenient_f64"
    )]
    pub checkpoints_running: f64,
    #[serde(
        rename = "transaction checkpoint max time (msecs)",
        deserialize_with = "lenient_f64"
    )]
    pub checkpoint_max_ms: f64,
    #[serde(
        rename = "transaction checkpoint min time (msecs)",
        deserialize_with = "lenient_f64"
    )]
    pub checkpoint_min_ms: f64,
    #[serde(
        rename = "transaction checkpoint most recent time (msecs)",
        deserialize_with = "lenient_f64"
    )]
    pub checkpoint_last_ms: f64,
    #[serde(
        rename = "transaction checkpoint total time (msecs)",
        deserialize_with = "lenient_f64"
    )]
    pub checkpoint_total_ms: f64,
    #[serde(rename = "transactions committed", deserialize_with = "lenient_f64")]
    pub committed: f64,
    #[serde(
        rename = "transaction failures due to cache overflow",
        deserialize_with = "lenient_f64"
    )]
    pub cache_overflow_failure: f64,
    #[serde(rename = "transactions rolled back", deserialize_with = "lenient_f64")]
    pub rolled_back: f64,
}

/// Ticket pool for one direction of concurrent transactions
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WtTicketStats {
    #[serde(deserialize_with = "lenient_f64")]
    pub out: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub available: f64,
    #[serde(rename = "totalTickets", deserialize_with = "lenient_f64")]
    pub total_tickets: f64,
}

/// Concurrency ticket statistics (`wiredTiger.concurrentTransactions`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WtConcurrentTransactionsStats {
    #[serde(deserialize_with = "lenient_subsystem")]
    pub read: Option<WtTicketStats>,
    #[serde(deserialize_with = "lenient_subsystem")]
    pub write: Option<WtTicketStats>,
}

/// The `wiredTiger` section of serverStatus
///
/// Every subsystem is optional: availability depends on engine version and
/// on the node's role, and a missing subsystem is skipped at export time.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WiredTigerStats {
    #[serde(rename = "block-manager", deserialize_with = "lenient_subsystem")]
    pub block_manager: Option<WtBlockManagerStats>,
    #[serde(deserialize_with = "lenient_subsystem")]
    pub cache: Option<WtCacheStats>,
    #[serde(deserialize_with = "lenient_subsystem")]
    pub log: Option<WtLogStats>,
    #[serde(deserialize_with = "lenient_subsystem")]
    pub session: Option<WtSessionStats>,
    #[serde(deserialize_with = "lenient_subsystem")]
    pub transaction: Option<WtTransactionStats>,
    #[serde(rename = "concurrentTransactions", deserialize_with = "lenient_subsystem")]
    pub concurrent_transactions: Option<WtConcurrentTransactionsStats>,
}

impl WiredTigerStats {
    /// Decode from the `wiredTiger` document; anything else yields `None`
    pub fn from_document(document: &Value) -> Option<Self> {
        decode_subsystem(document.clone())
    }

    /// Names of the subsystems present in this sample
    pub fn present_subsystems(&self) -> Vec<&'static str> {
        let mut present = Vec::new();
        if self.block_manager.is_some() {
            present.push("block-manager");
        }
        if self.cache.is_some() {
            present.push("cache");
        }
        if self.log.is_some() {
            present.push("log");
        }
        if self.session.is_some() {
            present.push("session");
        }
        if self.transaction.is_some() {
            present.push("transaction");
        }
        if self.concurrent_transactions.is_some() {
            present.push("concurrentTransactions");
        }
        present
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_fields_bind_to_engine_keys() {
        let doc = json!({
            "cache": {
                "bytes currently in the cache": 1024,
                "maximum bytes configured": 4096,
                "tracked dirty bytes in the cache": 12,
                "pages read into cache": 7,
                "percentage overhead": 8
            }
        });

        let stats = WiredTigerStats::from_document(&doc).unwrap();
        let cache = stats.cache.unwrap();
        assert_eq!(cache.bytes_total, 1024.0);
        assert_eq!(cache.max_bytes, 4096.0);
        assert_eq!(cache.bytes_dirty, 12.0);
        assert_eq!(cache.pages_read_into, 7.0);
        assert_eq!(cache.percent_overhead, 8.0);
        assert_eq!(cache.evicted_modified, 0.0);
    }

    #[test]
    fn test_absent_subsystems_stay_none() {
        let stats = WiredTigerStats::from_document(&json!({
            "session": {"open cursor count": 3, "open session count": 2}
        }))
        .unwrap();

        assert!(stats.block_manager.is_none());
        assert!(stats.cache.is_none());
        assert!(stats.log.is_none());
        assert!(stats.transaction.is_none());
        assert!(stats.concurrent_transactions.is_none());
        assert_eq!(stats.present_subsystems(), vec!["session"]);
    }

    #[test]
    fn test_present_subsystem_with_missing_fields_is_zeroed() {
        let stats = WiredTigerStats::from_document(&json!({"log": {}})).unwrap();
        assert_eq!(stats.log, Some(WtLogStats::default()));
    }

    #[test]
    fn test_malformed_fields_decode_to_zero() {
        let stats = WiredTigerStats::from_document(&json!({
            "block-manager": {
                "blocks read": "lots",
                "blocks written": null,
                "bytes read": [1],
                "bytes written": {"$numberLong": "77"}
            }
        }))
        .unwrap();

        let bm = stats.block_manager.unwrap();
        assert_eq!(bm.blocks_read, 0.0);
        assert_eq!(bm.blocks_written, 0.0);
        assert_eq!(bm.bytes_read, 0.0);
        assert_eq!(bm.bytes_written, 77.0);
    }

    #[test]
    fn test_non_document_subsystem_is_absent() {
        let stats = WiredTigerStats::from_document(&json!({
            "cache": "unavailable",
            "transaction": null,
            "session": {"open session count": 5}
        }))
        .unwrap();

        assert!(stats.cache.is_none());
        assert!(stats.transaction.is_none());
        assert_eq!(stats.session.unwrap().sessions, 5.0);
    }

    #[test]
    fn test_ticket_directions_are_not_swapped() {
        let stats = WiredTigerStats::from_document(&json!({
            "concurrentTransactions": {
                "read": {"out": 1, "available": 127, "totalTickets": 128},
                "write": {"out": 4, "available": 124, "totalTickets": 128}
            }
        }))
        .unwrap();

        let ct = stats.concurrent_transactions.unwrap();
        assert_eq!(ct.read.as_ref().unwrap().out, 1.0);
        assert_eq!(ct.write.as_ref().unwrap().out, 4.0);
        assert_eq!(ct.read.unwrap().total_tickets, 128.0);
    }

    #[test]
    fn test_missing_ticket_direction() {
        let stats = WiredTigerStats::from_document(&json!({
            "concurrentTransactions": {"write": {"out": 2}}
        }))
        .unwrap();

        let ct = stats.concurrent_transactions.unwrap();
        assert!(ct.read.is_none());
        assert_eq!(ct.write.unwrap().available, 0.0);
    }

    #[test]
    fn test_non_document_root_is_none() {
        assert!(WiredTigerStats::from_document(&json!(42)).is_none());
    }
}
