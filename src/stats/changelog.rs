//! Sharding changelog window summaries
//!
//! The config server keeps a `config.changelog` collection of balancer and
//! sharding events. Each scrape counts the events of a trailing window,
//! grouped by event name and outcome note, and merges the counts into a
//! fixed baseline so that every known event is reported even when it did
//! not happen in the window.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tracing::debug;

use super::decode::value_to_f64;

/// Database holding the changelog collection
pub const CHANGELOG_DATABASE: &str = "config";

/// Changelog collection name
pub const CHANGELOG_COLLECTION: &str = "changelog";

/// Default trailing window
pub const DEFAULT_CHANGELOG_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Event labels always exported, zero when absent from the window
pub const BASELINE_EVENTS: [&str; 12] = [
    "moveChunk.start",
    "moveChunk.to",
    "moveChunk.to_failed",
    "moveChunk.from",
    "moveChunk.from_failed",
    "moveChunk.commit",
    "addShard",
    "removeShard.start",
    "shardCollection",
    "shardCollection.start",
    "split",
    "multi-split",
];

/// Two-phase events whose non-successful outcomes get their own label
const FAILURE_REMAP: [(&str, &str); 2] = [
    ("moveChunk.to", "moveChunk.to_failed"),
    ("moveChunk.from", "moveChunk.from_failed"),
];

/// Note values that count as a successful outcome
const SUCCESS_NOTES: [&str; 2] = ["success", ""];

/// Grouping key of one aggregation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogSummaryId {
    pub event: String,
    pub note: String,
}

/// One grouped aggregation result: an event/note pair and its window count
#[derive(Debug, Clone, PartialEq)]
pub struct ChangelogSummary {
    pub id: ChangelogSummaryId,
    pub count: f64,
}

impl ChangelogSummary {
    pub fn new(event: &str, note: &str, count: f64) -> Self {
        Self {
            id: ChangelogSummaryId {
                event: event.to_string(),
                note: note.to_string(),
            },
            count,
        }
    }

    /// Decode `{"_id": {"event": .., "note": ..}, "count": ..}`
    ///
    /// Records without an event name are dropped. A missing note (events
    /// that carry no `details.note`) is the empty string.
    pub fn from_document(document: &Value) -> Option<Self> {
        let id = document.get("_id")?;
        let event = id.get("event").and_then(Value::as_str)?;
        let note = id.get("note").and_then(Value::as_str).unwrap_or("");
        let count = document.get("count").map(value_to_f64).unwrap_or(0.0);
        Some(Self::new(event, note, count))
    }

    /// Label this record is exported under
    pub fn label(&self) -> String {
        let failed = !SUCCESS_NOTES.contains(&self.id.note.as_str());
        if failed {
            if let Some((_, remapped)) = FAILURE_REMAP
                .iter()
                .find(|(event, _)| *event == self.id.event)
            {
                return (*remapped).to_string();
            }
        }
        self.id.event.clone()
    }
}

/// Result of one window query; empty when the query failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShardingChangelogStats {
    pub items: Vec<ChangelogSummary>,
}

impl ShardingChangelogStats {
    /// Decode raw aggregation output, skipping unreadable records
    pub fn from_documents(documents: &[Value]) -> Self {
        let items = documents
            .iter()
            .filter_map(|doc| {
                let item = ChangelogSummary::from_document(doc);
                if item.is_none() {
                    debug!("Skipping changelog record without an event: {}", doc);
                }
                item
            })
            .collect();
        Self { items }
    }

    /// Baseline labels at zero, overlaid with this window's counts
    ///
    /// Records that resolve to the same label are summed.
    pub fn merged_counts(&self) -> BTreeMap<String, f64> {
        let mut counts: BTreeMap<String, f64> = BASELINE_EVENTS
            .iter()
            .map(|event| (event.to_string(), 0.0))
            .collect();

        for item in &self.items {
            let count = if item.count > 0.0 { item.count } else { 0.0 };
            *counts.entry(item.label()).or_insert(0.0) += count;
        }

        counts
    }
}

/// Aggregation over the trailing window ending at `now`
#[derive(Debug, Clone)]
pub struct ChangelogQuery {
    pub window: Duration,
    pub now: SystemTime,
}

impl ChangelogQuery {
    pub fn new(window: Duration, now: SystemTime) -> Self {
        Self { window, now }
    }

    /// Window ending at the current wall-clock time
    pub fn ending_now(window: Duration) -> Self {
        Self::new(window, SystemTime::now())
    }

    /// Start of the window in milliseconds since the epoch
    pub fn window_start_millis(&self) -> i64 {
        let start = self.now.checked_sub(self.window).unwrap_or(UNIX_EPOCH);
        start
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    /// `$match` on the window followed by `$group` on (event, note)
    pub fn pipeline(&self) -> Vec<Value> {
        let since = self.window_start_millis().to_string();
        vec![
            json!({
                "$match": {
                    "time": { "$gt": { "$date": { "$numberLong": since } } }
                }
            }),
            json!({
                "$group": {
                    "_id": { "event": "$what", "note": "$details.note" },
                    "count": { "$sum": 1 }
                }
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_only() {
        let counts = ShardingChangelogStats::default().merged_counts();
        assert_eq!(counts.len(), 12);
        assert!(counts.values().all(|v| *v == 0.0));
        for event in BASELINE_EVENTS {
            assert!(counts.contains_key(event), "missing {}", event);
        }
    }

    #[test]
    fn test_failed_move_is_remapped() {
        let item = ChangelogSummary::new("moveChunk.to", "errorOccurred", 2.0);
        assert_eq!(item.label(), "moveChunk.to_failed");

        let item = ChangelogSummary::new("moveChunk.from", "aborted", 1.0);
        assert_eq!(item.label(), "moveChunk.from_failed");
    }

    #[test]
    fn test_successful_move_keeps_label() {
        assert_eq!(ChangelogSummary::new("moveChunk.from", "", 1.0).label(), "moveChunk.from");
        assert_eq!(
            ChangelogSummary::new("moveChunk.to", "success", 1.0).label(),
            "moveChunk.to"
        );
    }

    #[test]
    fn test_notes_ignored_for_other_events() {
        let item = ChangelogSummary::new("split", "errorOccurred", 4.0);
        assert_eq!(item.label(), "split");
    }

    #[test]
    fn test_merge_overlays_results() {
        let stats = ShardingChangelogStats {
            items: vec![
                ChangelogSummary::new("addShard", "", 3.0),
                ChangelogSummary::new("moveChunk.to", "errorOccurred", 2.0),
                ChangelogSummary::new("moveChunk.to", "abort", 1.0),
                ChangelogSummary::new("dropCollection", "", 5.0),
            ],
        };

        let counts = stats.merged_counts();
        assert_eq!(counts["addShard"], 3.0);
        assert_eq!(counts["moveChunk.to_failed"], 3.0);
        assert_eq!(counts["moveChunk.to"], 0.0);
        assert_eq!(counts["dropCollection"], 5.0);
        assert_eq!(counts.len(), 13);
    }

    #[test]
    fn test_decode_records() {
        let docs = vec![
            json!({"_id": {"event": "addShard", "note": ""}, "count": 3}),
            json!({"_id": {"event": "split"}, "count": {"$numberInt": "2"}}),
            json!({"_id": {"note": "success"}, "count": 9}),
            json!({"count": 1}),
        ];

        let stats = ShardingChangelogStats::from_documents(&docs);
        assert_eq!(
            stats.items,
            vec![
                ChangelogSummary::new("addShard", "", 3.0),
                ChangelogSummary::new("split", "", 2.0),
            ]
        );
    }

    #[test]
    fn test_pipeline_window() {
        let now = UNIX_EPOCH + Duration::from_secs(3_600);
        let query = ChangelogQuery::new(DEFAULT_CHANGELOG_WINDOW, now);
        assert_eq!(query.window_start_millis(), 3_000_000);

        let pipeline = query.pipeline();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(
            pipeline[0]["$match"]["time"]["$gt"]["$date"]["$numberLong"],
            "3000000"
        );
        assert_eq!(pipeline[1]["$group"]["_id"]["event"], "$what");
        assert_eq!(pipeline[1]["$group"]["_id"]["note"], "$details.note");
        assert_eq!(pipeline[1]["$group"]["count"]["$sum"], 1);
    }

    #[test]
    fn test_window_before_epoch_clamps() {
        let query = ChangelogQuery::new(DEFAULT_CHANGELOG_WINDOW, UNIX_EPOCH);
        assert_eq!(query.window_start_millis(), 0);
    }
}
