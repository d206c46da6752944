//! File-backed source
//!
//! Serves documents captured from a deployment, e.g. with
//! `mongosh --quiet --eval 'EJSON.stringify(db.serverStatus())'`.
//!
//! The changelog file may hold either already-grouped aggregation output
//! (`{"_id": {"event", "note"}, "count"}`) or raw `config.changelog` entries
//! (`{"what", "time", "details": {"note"}}`). Raw entries are filtered by
//! the pipeline's time window and grouped here.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::debug;

use super::source::{ChangelogSource, StatsSource};
use crate::stats::decode::kind_of;
use crate::utils::SourceError;

/// Keys that identify a bare `wiredTiger` document
const WIREDTIGER_KEYS: [&str; 6] = [
    "block-manager",
    "cache",
    "log",
    "session",
    "transaction",
    "concurrentTransactions",
];

#[derive(Debug, Clone)]
pub struct JsonFileSource {
    stats_path: PathBuf,
    changelog_path: Option<PathBuf>,
}

impl JsonFileSource {
    pub fn new(stats_path: impl Into<PathBuf>) -> Self {
        Self {
            stats_path: stats_path.into(),
            changelog_path: None,
        }
    }

    pub fn with_changelog(mut self, changelog_path: impl Into<PathBuf>) -> Self {
        self.changelog_path = Some(changelog_path.into());
        self
    }

    pub fn stats_path(&self) -> &Path {
        &self.stats_path
    }

    pub fn changelog_path(&self) -> Option<&Path> {
        self.changelog_path.as_deref()
    }
}

fn read_json(path: &Path) -> Result<Value, SourceError> {
    let text = fs::read_to_string(path).map_err(|source| SourceError::ReadFailed {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SourceError::InvalidDocument {
        path: path.display().to_string(),
        source,
    })
}

impl StatsSource for JsonFileSource {
    fn server_status(&self) -> Result<Value, SourceError> {
        let document = read_json(&self.stats_path)?;
        let Some(map) = document.as_object() else {
            return Err(SourceError::UnexpectedShape {
                expected: "document".to_string(),
                actual: kind_of(&document).to_string(),
            });
        };

        let bare_wiredtiger =
            !map.contains_key("wiredTiger") && WIREDTIGER_KEYS.iter().any(|k| map.contains_key(*k));
        if bare_wiredtiger {
            debug!(
                "Treating {} as a bare wiredTiger document",
                self.stats_path.display()
            );
            return Ok(json!({ "wiredTiger": document }));
        }

        Ok(document)
    }
}

impl ChangelogSource for JsonFileSource {
    fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: &[Value],
    ) -> Result<Vec<Value>, SourceError> {
        let path = self.changelog_path.as_ref().ok_or_else(|| {
            SourceError::Unavailable(format!("no file configured for {}.{}", database, collection))
        })?;

        let document = read_json(path)?;
        let entries = match document {
            Value::Array(entries) => entries,
            other => {
                return Err(SourceError::UnexpectedShape {
                    expected: "array".to_string(),
                    actual: kind_of(&other).to_string(),
                })
            }
        };

        let grouped = entries.iter().all(|e| e.get("_id").is_some());
        if grouped {
            return Ok(entries);
        }

        let since = match_since(pipeline);
        Ok(group_raw_entries(&entries, since))
    }
}

/// Lower time bound of the pipeline's `$match` stage, in epoch milliseconds
fn match_since(pipeline: &[Value]) -> Option<i64> {
    pipeline.iter().find_map(|stage| {
        let bound = stage.get("$match")?.get("time")?.get("$gt")?;
        date_millis(bound)
    })
}

/// Epoch milliseconds of an Extended JSON `$date` or a bare number
fn date_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::Object(map) => {
            let inner = map.get("$date").or_else(|| map.get("$numberLong"))?;
            match inner {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.parse().ok(),
                Value::Object(_) => date_millis(inner),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Apply the window and the (event, note) grouping to raw changelog entries
fn group_raw_entries(entries: &[Value], since: Option<i64>) -> Vec<Value> {
    let mut groups: BTreeMap<(String, Option<String>), f64> = BTreeMap::new();

    for entry in entries {
        if let Some(since) = since {
            match entry.get("time").and_then(date_millis) {
                Some(time) if time > since => {}
                _ => continue,
            }
        }
        let Some(event) = entry.get("what").and_then(Value::as_str) else {
            continue;
        };
        let note = entry
            .get("details")
            .and_then(|d| d.get("note"))
            .and_then(Value::as_str)
            .map(str::to_string);

        *groups.entry((event.to_string(), note)).or_insert(0.0) += 1.0;
    }

    groups
        .into_iter()
        .map(|((event, note), count)| {
            let id = match note {
                Some(note) => json!({ "event": event, "note": note }),
                None => json!({ "event": event }),
            };
            json!({ "_id": id, "count": count })
        })
        .collect()
}
