//! Sharding changelog metric
//!
//! `<namespace>_sharding_changelog_10min_total{event=...}` carries the number
//! of balancer events in the trailing window. Each cycle sets the baseline
//! events and the window counts, then drops events that left the window, so
//! the value is always a complete window count and never an accumulation.
//! Baseline labels are never removed, so a concurrent gather always sees all
//! of them.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::GaugeVec;
use tracing::debug;

use super::instruments::{labeled_value, metric_opts};
use crate::stats::ShardingChangelogStats;

/// Label carrying the event name
pub const EVENT_LABEL: &str = "event";

#[derive(Clone)]
pub struct ChangelogMetrics {
    pub changelog_10min_total: GaugeVec,
    /// Labels written by the last export; also serializes exports
    exported: Arc<Mutex<BTreeSet<String>>>,
}

impl ChangelogMetrics {
    pub const SUBSYSTEM: &'static str = "sharding";

    pub fn new(namespace: &str) -> prometheus::Result<Self> {
        let changelog_10min_total = GaugeVec::new(
            metric_opts(
                namespace,
                Self::SUBSYSTEM,
                "changelog_10min_total",
                "Total # of Cluster Balancer log events over the last 10 minutes",
            ),
            &[EVENT_LABEL],
        )?;
        Ok(Self {
            changelog_10min_total,
            exported: Arc::new(Mutex::new(BTreeSet::new())),
        })
    }

    /// Replace the exported window with `stats` merged over the baseline
    pub fn export(&self, stats: &ShardingChangelogStats) {
        let counts = stats.merged_counts();
        let mut exported = self.exported.lock();

        for (event, count) in &counts {
            self.changelog_10min_total
                .with_label_values(&[event.as_str()])
                .set(*count);
        }

        // events outside the baseline must not outlive their window
        for stale in exported.iter().filter(|e| !counts.contains_key(*e)) {
            if let Err(e) = self
                .changelog_10min_total
                .remove_label_values(&[stale.as_str()])
            {
                debug!("Changelog event '{}' already removed: {}", stale, e);
            }
        }

        *exported = counts.into_keys().collect();
    }

    /// Current window count for `event`; `None` if not exported
    pub fn get(&self, event: &str) -> Option<f64> {
        labeled_value(&self.changelog_10min_total, event)
    }
}

impl Collector for ChangelogMetrics {
    fn desc(&self) -> Vec<&Desc> {
        self.changelog_10min_total.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.changelog_10min_total.collect()
    }
}
