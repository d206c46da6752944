//! Database collaborator traits
//!
//! These traits abstract the two reads the exporter makes against a
//! deployment: the node's serverStatus document and an aggregation over a
//! named collection. Connection management, auth and TLS live behind them.
//!
//! Implementations:
//! - `JsonFileSource`: documents captured to disk
//! - closures and fixtures in tests

use serde_json::Value;

use crate::stats::{
    ChangelogQuery, ShardingChangelogStats, CHANGELOG_COLLECTION, CHANGELOG_DATABASE,
};
use crate::utils::SourceError;

/// Source of the current node's serverStatus document
pub trait StatsSource {
    fn server_status(&self) -> Result<Value, SourceError>;
}

/// Runs aggregation pipelines
pub trait ChangelogSource {
    /// Run `pipeline` against `database.collection` and return every result
    fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: &[Value],
    ) -> Result<Vec<Value>, SourceError>;
}

/// Changelog helpers built on [`ChangelogSource`]
pub trait ChangelogSourceExt: ChangelogSource {
    /// Group `config.changelog` over the query window
    fn sharding_changelog(
        &self,
        query: &ChangelogQuery,
    ) -> Result<ShardingChangelogStats, SourceError> {
        let documents =
            self.aggregate(CHANGELOG_DATABASE, CHANGELOG_COLLECTION, &query.pipeline())?;
        Ok(ShardingChangelogStats::from_documents(&documents))
    }
}

impl<T: ChangelogSource + ?Sized> ChangelogSourceExt for T {}

impl<F> StatsSource for F
where
    F: Fn() -> Result<Value, SourceError>,
{
    fn server_status(&self) -> Result<Value, SourceError> {
        self()
    }
}
