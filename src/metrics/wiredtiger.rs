//! WiredTiger metric exporters
//!
//! One exporter per storage-engine subsystem. Each owns its instruments and
//! maps its typed stats onto them: lifetime totals go to counters through
//! the counter policy, point-in-time values overwrite gauges. Label values
//! are fixed per field.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec};

use super::counter_mode::CounterPolicy;
use super::instruments::{
    collect_all, describe_all, labeled_gauge, metric_opts, scalar_gauge, LabeledCounter,
    ScalarCounter,
};
use crate::stats::{
    WiredTigerStats, WtBlockManagerStats, WtCacheStats, WtConcurrentTransactionsStats,
    WtLogStats, WtSessionStats, WtTransactionStats,
};

/// Common shape of a per-subsystem exporter
pub trait SubsystemExporter: Send + Sync {
    type Stats;

    /// Subsystem part of the metric names
    fn subsystem(&self) -> &'static str;

    /// Owned instruments, in describe/collect order
    fn collectors(&self) -> Vec<&dyn Collector>;

    /// Apply one sample to the owned instruments
    fn export(&self, stats: &Self::Stats);

    /// Static descriptors, whether or not data has been exported
    fn describe(&self) -> Vec<&Desc> {
        describe_all(&self.collectors())
    }

    /// Current values of every owned instrument
    fn collect(&self) -> Vec<MetricFamily> {
        collect_all(&self.collectors())
    }
}

/// `wiredtiger_blockmanager` metrics
#[derive(Clone)]
pub struct BlockManagerMetrics {
    pub blocks_total: LabeledCounter,
    pub bytes_total: LabeledCounter,
}

impl BlockManagerMetrics {
    pub const SUBSYSTEM: &'static str = "wiredtiger_blockmanager";

    pub fn new(namespace: &str, policy: Arc<CounterPolicy>) -> prometheus::Result<Self> {
        let sub = Self::SUBSYSTEM;
        Ok(Self {
            blocks_total: LabeledCounter::new(
                metric_opts(
                    namespace,
                    sub,
                    "blocks_total",
                    "The total number of blocks read by the WiredTiger BlockManager",
                ),
                Arc::clone(&policy),
            )?,
            bytes_total: LabeledCounter::new(
                metric_opts(
                    namespace,
                    sub,
                    "bytes_total",
                    "The total number of bytes read by the WiredTiger BlockManager",
                ),
                policy,
            )?,
        })
    }
}

impl SubsystemExporter for BlockManagerMetrics {
    type Stats = WtBlockManagerStats;

    fn subsystem(&self) -> &'static str {
        Self::SUBSYSTEM
    }

    fn collectors(&self) -> Vec<&dyn Collector> {
        vec![self.blocks_total.collector(), self.bytes_total.collector()]
    }

    fn export(&self, stats: &WtBlockManagerStats) {
        self.blocks_total.add("read", stats.blocks_read);
        self.blocks_total.add("read_mapped", stats.mapped_blocks_read);
        self.blocks_total.add("pre_loaded", stats.blocks_pre_loaded);
        self.blocks_total.add("written", stats.blocks_written);
        self.bytes_total.add("read", stats.bytes_read);
        self.bytes_total.add("read_mapped", stats.mapped_bytes_read);
        self.bytes_total.add("written", stats.bytes_written);
    }
}

/// `wiredtiger_cache` metrics
#[derive(Clone)]
pub struct CacheMetrics {
    pub pages: GaugeVec,
    pub pages_total: LabeledCounter,
    pub bytes: GaugeVec,
    pub max_bytes: Gauge,
    pub bytes_total: LabeledCounter,
    pub evicted_total: LabeledCounter,
    pub overhead_percent: Gauge,
}

impl CacheMetrics {
    pub const SUBSYSTEM: &'static str = "wiredtiger_cache";

    pub fn new(namespace: &str, policy: Arc<CounterPolicy>) -> prometheus::Result<Self> {
        let sub = Self::SUBSYSTEM;
        Ok(Self {
            pages: labeled_gauge(metric_opts(
                namespace,
                sub,
                "pages",
                "The current number of pages in the WiredTiger Cache",
            ))?,
            pages_total: LabeledCounter::new(
                metric_opts(
                    namespace,
                    sub,
                    "pages_total",
                    "The total number of pages read into/from the WiredTiger Cache",
                ),
                Arc::clone(&policy),
            )?,
            bytes: labeled_gauge(metric_opts(
                namespace,
                sub,
                "bytes",
                "The current size of data in the WiredTiger Cache in bytes",
            ))?,
            max_bytes: scalar_gauge(metric_opts(
                namespace,
                sub,
                "max_bytes",
                "The maximum size of data in the WiredTiger Cache in bytes",
            ))?,
            bytes_total: LabeledCounter::new(
                metric_opts(
                    namespace,
                    sub,
                    "bytes_total",
                    "The total number of bytes read into/from the WiredTiger Cache",
                ),
                Arc::clone(&policy),
            )?,
            evicted_total: LabeledCounter::new(
                metric_opts(
                    namespace,
                    sub,
                    "evicted_total",
                    "The total number of pages evicted from the WiredTiger Cache",
                ),
                policy,
            )?,
            overhead_percent: scalar_gauge(metric_opts(
                namespace,
                sub,
                "overhead_percent",
                "The percentage overhead of the WiredTiger Cache",
            ))?,
        })
    }
}

impl SubsystemExporter for CacheMetrics {
    type Stats = WtCacheStats;

    fn subsystem(&self) -> &'static str {
        Self::SUBSYSTEM
    }

    fn collectors(&self) -> Vec<&dyn Collector> {
        vec![
            self.pages_total.collector(),
            self.bytes_total.collector(),
            self.evicted_total.collector(),
            &self.pages,
            &self.bytes,
            &self.max_bytes,
            &self.overhead_percent,
        ]
    }

    fn export(&self, stats: &WtCacheStats) {
        self.pages_total.add("read", stats.pages_read_into);
        self.pages_total.add("written", stats.pages_written_from);
        self.bytes_total.add("read", stats.bytes_read_into);
        self.bytes_total.add("written", stats.bytes_written_from);
        self.evicted_total.add("modified", stats.evicted_modified);
        self.evicted_total.add("unmodified", stats.evicted_unmodified);
        self.pages.with_label_values(&["total"]).set(stats.pages_total);
        self.pages.with_label_values(&["dirty"]).set(stats.pages_dirty);
        self.bytes.with_label_values(&["total"]).set(stats.bytes_total);
        self.bytes.with_label_values(&["dirty"]).set(stats.bytes_dirty);
        self.bytes
            .with_label_values(&["internal_pages"])
            .set(stats.bytes_internal_pages);
        self.bytes
            .with_label_values(&["leaf_pages"])
            .set(stats.bytes_leaf_pages);
        self.max_bytes.set(stats.max_bytes);
        self.overhead_percent.set(stats.percent_overhead);
    }
}

/// `wiredtiger_transactions` metrics
#[derive(Clone)]
pub struct TransactionMetrics {
    pub total: LabeledCounter,
    pub checkpoint_milliseconds_total: ScalarCounter,
    pub checkpoint_milliseconds: GaugeVec,
    pub running_checkpoints: Gauge,
}

impl TransactionMetrics {
    pub const SUBSYSTEM: &'static str = "wiredtiger_transactions";

    pub fn new(namespace: &str, policy: Arc<CounterPolicy>) -> prometheus::Result<Self> {
        let sub = Self::SUBSYSTEM;
        Ok(Self {
            total: LabeledCounter::new(
                metric_opts(
                    namespace,
                    sub,
                    "total",
                    "The total number of transactions WiredTiger has handled",
                ),
                Arc::clone(&policy),
            )?,
            checkpoint_milliseconds_total: ScalarCounter::new(
                metric_opts(
                    namespace,
                    sub,
                    "checkpoint_milliseconds_total",
                    "The total time in milliseconds transactions have checkpointed in WiredTiger",
                ),
                policy,
            )?,
            checkpoint_milliseconds: labeled_gauge(metric_opts(
                namespace,
                sub,
                "checkpoint_milliseconds",
                "The time in milliseconds transactions have checkpointed in WiredTiger",
            ))?,
            running_checkpoints: scalar_gauge(metric_opts(
                namespace,
                sub,
                "running_checkpoints",
                "The number of currently running checkpoints in WiredTiger",
            ))?,
        })
    }
}

impl SubsystemExporter for TransactionMetrics {
    type Stats = WtTransactionStats;

    fn subsystem(&self) -> &'static str {
        Self::SUBSYSTEM
    }

    fn collectors(&self) -> Vec<&dyn Collector> {
        vec![
            self.total.collector(),
            self.checkpoint_milliseconds_total.collector(),
            &self.checkpoint_milliseconds,
            &self.running_checkpoints,
        ]
    }

    fn export(&self, stats: &WtTransactionStats) {
        self.total.add("begins", stats.begins);
        self.total.add("checkpoints", stats.checkpoints);
        self.total.add("committed", stats.committed);
        self.total.add("rolledback", stats.rolled_back);
        self.checkpoint_milliseconds
            .with_label_values(&["min"])
            .set(stats.checkpoint_min_ms);
        self.checkpoint_milliseconds
            .with_label_values(&["max"])
            .set(stats.checkpoint_max_ms);
        self.checkpoint_milliseconds_total
            .add(stats.checkpoint_total_ms);
        self.running_checkpoints.set(stats.checkpoints_running);
    }
}

/// `wiredtiger_log` metrics
#[derive(Clone)]
pub struct LogMetrics {
    pub records_scanned_total: ScalarCounter,
    pub records_total: LabeledCounter,
    pub bytes_total: LabeledCounter,
    pub operations_total: LabeledCounter,
}

impl LogMetrics {
    pub const SUBSYSTEM: &'static str = "wiredtiger_log";

    pub fn new(namespace: &str, policy: Arc<CounterPolicy>) -> prometheus::Result<Self> {
        let sub = Self::SUBSYSTEM;
        Ok(Self {
            records_scanned_total: ScalarCounter::new(
                metric_opts(
                    namespace,
                    sub,
                    "records_scanned_total",
                    "The total number of records scanned by log scan in the WiredTiger log",
                ),
                Arc::clone(&policy),
            )?,
            records_total: LabeledCounter::new(
                metric_opts(
                    namespace,
                    sub,
                    "records_total",
                    "The total number of compressed/uncompressed records written to the WiredTiger log",
                ),
                Arc::clone(&policy),
            )?,
            bytes_total: LabeledCounter::new(
                metric_opts(
                    namespace,
                    sub,
                    "bytes_total",
                    "The total number of bytes written to the WiredTiger log",
                ),
                Arc::clone(&policy),
            )?,
            operations_total: LabeledCounter::new(
                metric_opts(
                    namespace,
                    sub,
                    "operations_total",
                    "The total number of WiredTiger log operations",
                ),
                policy,
            )?,
        })
    }
}

impl SubsystemExporter for LogMetrics {
    type Stats = WtLogStats;

    fn subsystem(&self) -> &'static str {
        Self::SUBSYSTEM
    }

    fn collectors(&self) -> Vec<&dyn Collector> {
        vec![
            self.records_total.collector(),
            self.bytes_total.collector(),
            self.operations_total.collector(),
            self.records_scanned_total.collector(),
        ]
    }

    fn export(&self, stats: &WtLogStats) {
        self.records_total.add("compressed", stats.records_compressed);
        self.records_total
            .add("uncompressed", stats.records_uncompressed);
        self.bytes_total.add("payload", stats.bytes_payload_data);
        self.bytes_total.add("written", stats.bytes_written);
        self.operations_total.add("read", stats.log_reads);
        self.operations_total.add("write", stats.log_writes);
        self.operations_total.add("scan", stats.log_scans);
        self.operations_total.add("scan_double", stats.log_scans_double);
        self.operations_total.add("sync", stats.log_syncs);
        self.operations_total.add("sync_dir", stats.log_sync_dirs);
        self.operations_total.add("flush", stats.log_flushes);
        self.records_scanned_total
            .add(stats.records_processed_log_scan);
    }
}

/// `wiredtiger_session` metrics
#[derive(Clone)]
pub struct SessionMetrics {
    pub open_cursors: Gauge,
    pub open_sessions: Gauge,
}

impl SessionMetrics {
    pub const SUBSYSTEM: &'static str = "wiredtiger_session";

    pub fn new(namespace: &str) -> prometheus::Result<Self> {
        let sub = Self::SUBSYSTEM;
        Ok(Self {
            open_cursors: scalar_gauge(metric_opts(
                namespace,
                sub,
                "open_cursors_total",
                "The total number of cursors opened in WiredTiger",
            ))?,
            open_sessions: scalar_gauge(metric_opts(
                namespace,
                sub,
                "open_sessions_total",
                "The total number of sessions opened in WiredTiger",
            ))?,
        })
    }
}

impl SubsystemExporter for SessionMetrics {
    type Stats = WtSessionStats;

    fn subsystem(&self) -> &'static str {
        Self::SUBSYSTEM
    }

    fn collectors(&self) -> Vec<&dyn Collector> {
        vec![&self.open_cursors, &self.open_sessions]
    }

    fn export(&self, stats: &WtSessionStats) {
        self.open_cursors.set(stats.cursors);
        self.open_sessions.set(stats.sessions);
    }
}

/// `wiredtiger_concurrent_transactions` metrics
#[derive(Clone)]
pub struct ConcurrentTransactionsMetrics {
    pub out_tickets: GaugeVec,
    pub available_tickets: GaugeVec,
    pub total_tickets: GaugeVec,
}

impl ConcurrentTransactionsMetrics {
    pub const SUBSYSTEM: &'static str = "wiredtiger_concurrent_transactions";

    pub fn new(namespace: &str) -> prometheus::Result<Self> {
        let sub = Self::SUBSYSTEM;
        Ok(Self {
            out_tickets: labeled_gauge(metric_opts(
                namespace,
                sub,
                "out_tickets",
                "The number of tickets that are currently in use (out) in WiredTiger",
            ))?,
            available_tickets: labeled_gauge(metric_opts(
                namespace,
                sub,
                "available_tickets",
                "The number of tickets that are available in WiredTiger",
            ))?,
            total_tickets: labeled_gauge(metric_opts(
                namespace,
                sub,
                "total_tickets",
                "The total number of tickets that are available in WiredTiger",
            ))?,
        })
    }
}

impl SubsystemExporter for ConcurrentTransactionsMetrics {
    type Stats = WtConcurrentTransactionsStats;

    fn subsystem(&self) -> &'static str {
        Self::SUBSYSTEM
    }

    fn collectors(&self) -> Vec<&dyn Collector> {
        vec![&self.out_tickets, &self.available_tickets, &self.total_tickets]
    }

    fn export(&self, stats: &WtConcurrentTransactionsStats) {
        let directions = [("read", &stats.read), ("write", &stats.write)];
        for (label, tickets) in directions {
            // a missing direction leaves its series untouched
            let Some(tickets) = tickets else {
                continue;
            };
            self.out_tickets.with_label_values(&[label]).set(tickets.out);
            self.available_tickets
                .with_label_values(&[label])
                .set(tickets.available);
            self.total_tickets
                .with_label_values(&[label])
                .set(tickets.total_tickets);
        }
    }
}

/// Number of WiredTiger subsystems
const SUBSYSTEM_COUNT: usize = 6;

/// All WiredTiger exporters, registered as one collector
///
/// A subsystem's series are only collected once it has been exported at
/// least once; until then a node that never reports it (a router, or an
/// engine build without that section) publishes nothing for it. After the
/// first export the last values are kept even if the subsystem disappears.
#[derive(Clone)]
pub struct WiredTigerMetrics {
    pub block_manager: BlockManagerMetrics,
    pub cache: CacheMetrics,
    pub transaction: TransactionMetrics,
    pub log: LogMetrics,
    pub session: SessionMetrics,
    pub concurrent_transactions: ConcurrentTransactionsMetrics,
    /// Per-subsystem "exported at least once", in [`Self::subsystem_collectors`] order
    seen: Arc<[AtomicBool; SUBSYSTEM_COUNT]>,
}

impl WiredTigerMetrics {
    pub fn new(namespace: &str, policy: Arc<CounterPolicy>) -> prometheus::Result<Self> {
        Ok(Self {
            block_manager: BlockManagerMetrics::new(namespace, Arc::clone(&policy))?,
            cache: CacheMetrics::new(namespace, Arc::clone(&policy))?,
            transaction: TransactionMetrics::new(namespace, Arc::clone(&policy))?,
            log: LogMetrics::new(namespace, policy)?,
            session: SessionMetrics::new(namespace)?,
            concurrent_transactions: ConcurrentTransactionsMetrics::new(namespace)?,
            seen: Arc::new(Default::default()),
        })
    }

    /// Export every present subsystem; absent ones are skipped
    ///
    /// Returns the number of subsystems exported.
    pub fn export(&self, stats: &WiredTigerStats) -> usize {
        let mut exported = 0;
        if let Some(ref s) = stats.block_manager {
            self.block_manager.export(s);
            self.mark_seen(0);
            exported += 1;
        }
        if let Some(ref s) = stats.cache {
            self.cache.export(s);
            self.mark_seen(1);
            exported += 1;
        }
        if let Some(ref s) = stats.transaction {
            self.transaction.export(s);
            self.mark_seen(2);
            exported += 1;
        }
        if let Some(ref s) = stats.log {
            self.log.export(s);
            self.mark_seen(3);
            exported += 1;
        }
        if let Some(ref s) = stats.session {
            self.session.export(s);
            self.mark_seen(4);
            exported += 1;
        }
        if let Some(ref s) = stats.concurrent_transactions {
            self.concurrent_transactions.export(s);
            self.mark_seen(5);
            exported += 1;
        }
        exported
    }

    /// Subsystem names that have been exported at least once
    pub fn seen_subsystems(&self) -> Vec<&'static str> {
        let names = [
            self.block_manager.subsystem(),
            self.cache.subsystem(),
            self.transaction.subsystem(),
            self.log.subsystem(),
            self.session.subsystem(),
            self.concurrent_transactions.subsystem(),
        ];
        names
            .into_iter()
            .zip(self.seen.iter())
            .filter(|(_, seen)| seen.load(Ordering::Acquire))
            .map(|(name, _)| name)
            .collect()
    }

    fn mark_seen(&self, index: usize) {
        self.seen[index].store(true, Ordering::Release);
    }

    fn subsystem_collectors(&self) -> [Vec<&dyn Collector>; SUBSYSTEM_COUNT] {
        [
            self.block_manager.collectors(),
            self.cache.collectors(),
            self.transaction.collectors(),
            self.log.collectors(),
            self.session.collectors(),
            self.concurrent_transactions.collectors(),
        ]
    }
}

impl Collector for WiredTigerMetrics {
    fn desc(&self) -> Vec<&Desc> {
        let collectors: Vec<&dyn Collector> =
            self.subsystem_collectors().into_iter().flatten().collect();
        describe_all(&collectors)
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let collectors: Vec<&dyn Collector> = self
            .subsystem_collectors()
            .into_iter()
            .zip(self.seen.iter())
            .filter(|(_, seen)| seen.load(Ordering::Acquire))
            .flat_map(|(collectors, _)| collectors)
            .collect();
        collect_all(&collectors)
    }
}
