use thiserror::Error;

use crate::types::{TargetId, VersionId};

#[derive(Error, Debug)]
pub enum TargetsError {
    #[error("Failed to read targets file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("Malformed targets declaration: {0}")]
    Malformed(String),

    #[error("Unknown task `{task}` in {context}")]
    UnknownTask { task: String, context: String },

    #[error("Version {0} is not declared")]
    UnknownVersion(VersionId),

    #[error("Target {0} is not declared")]
    UnknownTarget(TargetId),

    /// A height was produced by a newer version than the running code knows about.
    #[error("Stored index version {stored} is newer than the current version {current}")]
    VersionAhead { stored: VersionId, current: VersionId },
}
