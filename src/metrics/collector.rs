//! Scrape orchestration
//!
//! One scrape cycle reads the node's serverStatus, exports every present
//! WiredTiger subsystem, refreshes the sharding changelog window and leaves
//! the registry ready to be gathered.
//!
//! Thread-safe: a `Scraper` can be shared behind an `Arc` and scraped from
//! several threads. Counters from concurrent cycles add up and gauges keep
//! the last written value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use tracing::{debug, error, info, warn};

use super::registry::ExporterRegistry;
use crate::client::{ChangelogSource, ChangelogSourceExt, StatsSource};
use crate::config::ExporterConfig;
use crate::stats::{ChangelogQuery, NodeRole, ServerStatus, ShardingChangelogStats};
use crate::utils::Result;

/// Outcome of one scrape cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeReport {
    /// Sequence number of this cycle, starting at 1
    pub cycle: u64,
    pub role: NodeRole,
    pub host: Option<String>,
    /// Whether the serverStatus document was fetched
    pub stats_fetched: bool,
    /// Number of WiredTiger subsystems exported
    pub subsystems_exported: usize,
    /// Grouped changelog records returned by the query
    pub changelog_records: usize,
    /// `Some(false)` when the changelog query failed and the baseline was
    /// used; `None` when the changelog is disabled
    pub changelog_ok: Option<bool>,
    pub duration: Duration,
}

/// Runs scrape cycles against a registry
pub struct Scraper {
    config: ExporterConfig,
    registry: ExporterRegistry,
    cycles: AtomicU64,
}

impl Scraper {
    /// Build the registry described by `config`
    pub fn new(config: ExporterConfig) -> Result<Self> {
        let registry = ExporterRegistry::new(&config.namespace, config.counter_mode)?;
        Ok(Self {
            config,
            registry,
            cycles: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExporterRegistry {
        &self.registry
    }

    /// Descriptors of every family this scraper can emit
    pub fn describe(&self) -> Vec<Desc> {
        self.registry.describe()
    }

    /// Run one cycle
    ///
    /// Source failures never abort the cycle: a failed stats fetch leaves
    /// the WiredTiger families untouched and a failed changelog query
    /// exports the zero baseline.
    pub fn scrape(
        &self,
        stats: &dyn StatsSource,
        changelog: Option<&dyn ChangelogSource>,
    ) -> ScrapeReport {
        let start = Instant::now();
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;

        let mut report = ScrapeReport {
            cycle,
            role: NodeRole::Unknown,
            host: None,
            stats_fetched: false,
            subsystems_exported: 0,
            changelog_records: 0,
            changelog_ok: None,
            duration: Duration::ZERO,
        };

        match stats.server_status() {
            Ok(document) => {
                report.stats_fetched = true;
                let status = ServerStatus::from_document(&document);
                report.role = status.role();
                report.host = status.host.clone();

                match status.wired_tiger {
                    Some(ref wired_tiger) => {
                        report.subsystems_exported = self.registry.wiredtiger().export(wired_tiger);
                        debug!(
                            "Exported {} WiredTiger subsystems: {:?}",
                            report.subsystems_exported,
                            wired_tiger.present_subsystems()
                        );
                    }
                    None => debug!(
                        "No WiredTiger statistics on {} node",
                        report.role.as_str()
                    ),
                }
            }
            Err(e) => warn!("Failed to fetch serverStatus: {}", e),
        }

        if self.config.changelog_enabled {
            report.changelog_ok = Some(true);
            let changelog_stats = self.query_changelog(changelog, &mut report);
            self.registry.changelog().export(&changelog_stats);
        }

        report.duration = start.elapsed();
        info!(
            "Scrape #{} finished in {:?} (role: {}, subsystems: {}, changelog records: {})",
            report.cycle,
            report.duration,
            report.role.as_str(),
            report.subsystems_exported,
            report.changelog_records
        );
        report
    }

    fn query_changelog(
        &self,
        source: Option<&dyn ChangelogSource>,
        report: &mut ScrapeReport,
    ) -> ShardingChangelogStats {
        let Some(source) = source else {
            debug!("No changelog source configured, exporting baseline");
            return ShardingChangelogStats::default();
        };

        let query = ChangelogQuery::ending_now(self.config.changelog_window);
        match source.sharding_changelog(&query) {
            Ok(stats) => {
                report.changelog_records = stats.items.len();
                stats
            }
            Err(e) => {
                error!("Failed to aggregate sharding changelog: {}", e);
                report.changelog_ok = Some(false);
                ShardingChangelogStats::default()
            }
        }
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Prometheus text exposition of the current samples
    pub fn encode(&self) -> Result<String> {
        self.registry.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::CounterMode;
    use crate::stats::BASELINE_EVENTS;
    use crate::utils::SourceError;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::thread;

    struct FixedChangelog(Vec<Value>);

    impl ChangelogSource for FixedChangelog {
        fn aggregate(
            &self,
            _database: &str,
            _collection: &str,
            _pipeline: &[Value],
        ) -> std::result::Result<Vec<Value>, SourceError> {
            Ok(self.0.clone())
        }
    }

    struct FailingChangelog;

    impl ChangelogSource for FailingChangelog {
        fn aggregate(
            &self,
            _database: &str,
            _collection: &str,
            _pipeline: &[Value],
        ) -> std::result::Result<Vec<Value>, SourceError> {
            Err(SourceError::CommandFailed("not authorized on config".to_string()))
        }
    }

    fn cache_only_status() -> Value {
        json!({
            "host": "shard01:27017",
            "process": "mongod",
            "wiredTiger": {
                "cache": {
                    "bytes currently in the cache": 1024,
                    "tracked dirty bytes in the cache": 64,
                    "modified pages evicted": 7,
                    "unmodified pages evicted": 3,
                    "maximum bytes configured": 4096,
                    "percentage overhead": 8
                }
            }
        })
    }

    fn default_scraper() -> Scraper {
        Scraper::new(ExporterConfig::default()).unwrap()
    }

    #[test]
    fn test_cache_only_scenario() {
        let scraper = default_scraper();
        let stats = || -> std::result::Result<Value, SourceError> { Ok(cache_only_status()) };

        let report = scraper.scrape(&stats, None);
        assert!(report.stats_fetched);
        assert_eq!(report.role, NodeRole::Mongod);
        assert_eq!(report.host.as_deref(), Some("shard01:27017"));
        assert_eq!(report.subsystems_exported, 1);

        let cache = &scraper.registry().wiredtiger().cache;
        assert_eq!(cache.bytes.with_label_values(&["total"]).get(), 1024.0);
        assert_eq!(cache.bytes.with_label_values(&["dirty"]).get(), 64.0);
        assert_eq!(cache.evicted_total.get("modified"), Some(7.0));
        assert_eq!(cache.evicted_total.get("unmodified"), Some(3.0));
        assert_eq!(cache.max_bytes.get(), 4096.0);
        assert_eq!(cache.overhead_percent.get(), 8.0);

        let text = scraper.encode().unwrap();
        assert!(text.contains("mongodb_wiredtiger_cache_bytes{type=\"total\"} 1024"));
        assert!(!text.contains("mongodb_wiredtiger_log_"));
        assert!(!text.contains("mongodb_wiredtiger_session_"));
    }

    #[test]
    fn test_cumulative_counters_readd_each_cycle() {
        let scraper = default_scraper();
        let stats = || -> std::result::Result<Value, SourceError> { Ok(cache_only_status()) };

        scraper.scrape(&stats, None);
        let report = scraper.scrape(&stats, None);

        assert_eq!(report.cycle, 2);
        let cache = &scraper.registry().wiredtiger().cache;
        assert_eq!(cache.evicted_total.get("modified"), Some(14.0));
        assert_eq!(cache.bytes.with_label_values(&["total"]).get(), 1024.0);
    }

    #[test]
    fn test_delta_counters_track_growth() {
        let config = ExporterConfig {
            counter_mode: CounterMode::Delta,
            ..Default::default()
        };
        let scraper = Scraper::new(config).unwrap();
        let stats = || -> std::result::Result<Value, SourceError> { Ok(cache_only_status()) };

        scraper.scrape(&stats, None);
        scraper.scrape(&stats, None);

        let cache = &scraper.registry().wiredtiger().cache;
        assert_eq!(cache.evicted_total.get("modified"), Some(7.0));
    }

    #[test]
    fn test_add_shard_aggregation() {
        let scraper = default_scraper();
        let stats = || -> std::result::Result<Value, SourceError> { Ok(json!({"process": "mongos"})) };
        let changelog = FixedChangelog(vec![
            json!({"_id": {"event": "addShard", "note": ""}, "count": 2}),
            json!({"_id": {"event": "moveChunk.to", "note": "errorOccurred"}, "count": 1}),
        ]);

        let report = scraper.scrape(&stats, Some(&changelog));
        assert_eq!(report.role, NodeRole::Mongos);
        assert_eq!(report.subsystems_exported, 0);
        assert_eq!(report.changelog_records, 2);
        assert_eq!(report.changelog_ok, Some(true));

        let metrics = scraper.registry().changelog();
        assert_eq!(metrics.get("addShard"), Some(2.0));
        assert_eq!(metrics.get("moveChunk.to_failed"), Some(1.0));
        assert_eq!(metrics.get("moveChunk.to"), Some(0.0));
        assert_eq!(metrics.get("split"), Some(0.0));
    }

    #[test]
    fn test_router_node_has_no_wiredtiger_series() {
        let scraper = default_scraper();
        let stats = || -> std::result::Result<Value, SourceError> {
            Ok(json!({"host": "router1:27017", "process": "mongos"}))
        };

        let report = scraper.scrape(&stats, Some(&FixedChangelog(vec![])));
        assert_eq!(report.role, NodeRole::Mongos);

        let text = scraper.encode().unwrap();
        assert!(!text.contains("mongodb_wiredtiger_"));
        for event in BASELINE_EVENTS {
            assert!(text.contains(&format!(
                "mongodb_sharding_changelog_10min_total{{event=\"{}\"}} 0",
                event
            )));
        }
    }

    #[test]
    fn test_changelog_failure_exports_baseline() {
        let scraper = default_scraper();
        let stats = || -> std::result::Result<Value, SourceError> { Ok(cache_only_status()) };

        let report = scraper.scrape(&stats, Some(&FailingChangelog));
        assert_eq!(report.changelog_ok, Some(false));
        assert_eq!(report.changelog_records, 0);
        assert_eq!(report.subsystems_exported, 1);

        let metrics = scraper.registry().changelog();
        for event in BASELINE_EVENTS {
            assert_eq!(metrics.get(event), Some(0.0));
        }
    }

    #[test]
    fn test_stats_failure_still_runs_changelog() {
        let scraper = default_scraper();
        let stats = || -> std::result::Result<Value, SourceError> {
            Err(SourceError::Unavailable("connection refused".to_string()))
        };
        let changelog = FixedChangelog(vec![json!({"_id": {"event": "split"}, "count": 4})]);

        let report = scraper.scrape(&stats, Some(&changelog));
        assert!(!report.stats_fetched);
        assert_eq!(report.role, NodeRole::Unknown);
        assert_eq!(scraper.registry().changelog().get("split"), Some(4.0));
    }

    #[test]
    fn test_changelog_disabled() {
        let config = ExporterConfig {
            changelog_enabled: false,
            ..Default::default()
        };
        let scraper = Scraper::new(config).unwrap();
        let stats = || -> std::result::Result<Value, SourceError> { Ok(cache_only_status()) };

        let report = scraper.scrape(&stats, Some(&FixedChangelog(vec![])));
        assert_eq!(report.changelog_ok, None);
        let text = scraper.encode().unwrap();
        assert!(!text.contains("mongodb_sharding_changelog_10min_total"));
    }

    #[test]
    fn test_describe_is_stable_across_scrapes() {
        let scraper = default_scraper();
        let before = scraper.describe().len();
        let stats = || -> std::result::Result<Value, SourceError> { Ok(cache_only_status()) };
        scraper.scrape(&stats, None);
        assert_eq!(scraper.describe().len(), before);
        assert_eq!(before, 23);
    }

    #[test]
    fn test_concurrent_scrapes() {
        let scraper = Arc::new(default_scraper());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let scraper = Arc::clone(&scraper);
                thread::spawn(move || {
                    let stats =
                        || -> std::result::Result<Value, SourceError> { Ok(cache_only_status()) };
                    scraper.scrape(&stats, None);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let cache = &scraper.registry().wiredtiger().cache;
        assert_eq!(cache.evicted_total.get("modified"), Some(28.0));
        assert_eq!(cache.bytes.with_label_values(&["dirty"]).get(), 64.0);
    }
}
