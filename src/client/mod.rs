//! Database collaborator layer

pub mod json_file;
pub mod source;

pub use json_file::JsonFileSource;
pub use source::{ChangelogSource, ChangelogSourceExt, StatsSource};
