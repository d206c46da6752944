//! serverStatus document decoding
//!
//! Only the parts the exporter publishes are decoded. The role is detected
//! from the `process` field and is used for logging; export decisions are
//! made purely on which subsystems are present.

use serde_json::Value;

use super::wiredtiger::WiredTigerStats;

/// Role of the node that produced a serverStatus document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Storage node (standalone or replica set member)
    Mongod,
    /// Shard router; has no storage engine
    Mongos,
    /// `process` missing or unrecognized
    Unknown,
}

impl NodeRole {
    /// Detect the role from the `process` field
    pub fn detect(process: Option<&str>) -> Self {
        match process {
            Some(p) if p.eq_ignore_ascii_case("mongos") => NodeRole::Mongos,
            Some(p) if p.eq_ignore_ascii_case("mongod") => NodeRole::Mongod,
            _ => NodeRole::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Mongod => "mongod",
            NodeRole::Mongos => "mongos",
            NodeRole::Unknown => "unknown",
        }
    }
}

/// Decoded serverStatus
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerStatus {
    /// `host` field, if reported
    pub host: Option<String>,
    /// `process` field, if reported
    pub process: Option<String>,
    /// Storage engine statistics; `None` on routers and non-WiredTiger engines
    pub wired_tiger: Option<WiredTigerStats>,
}

impl ServerStatus {
    /// Decode a serverStatus document. Never fails: unreadable parts are absent.
    pub fn from_document(document: &Value) -> Self {
        let host = document
            .get("host")
            .and_then(Value::as_str)
            .map(str::to_string);
        let process = document
            .get("process")
            .and_then(Value::as_str)
            .map(str::to_string);
        let wired_tiger = document
            .get("wiredTiger")
            .and_then(WiredTigerStats::from_document);

        Self {
            host,
            process,
            wired_tiger,
        }
    }

    pub fn role(&self) -> NodeRole {
        NodeRole::detect(self.process.as_deref())
    }
}
