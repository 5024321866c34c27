pub mod targets;
pub mod task;

use thiserror::Error;

use crate::core::client::chain::ClientError;
use crate::core::client::database::DatabaseError;
use crate::pipeline::stage::StageName;
use crate::pipeline::task::TaskId;
use crate::types::Height;
pub use targets::TargetsError;
pub use task::{TaskError, TaskResult};

/// Result type for indexer operations
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Error types for the indexer
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Chain client error: {0}")]
    ClientError(#[from] ClientError),

    #[error("Targets error: {0}")]
    TargetsError(#[from] TargetsError),

    /// A stage exhausted its retries on one height; the run stops there.
    #[error("Stage {stage} failed at height {height} in task {task}: {source}")]
    StageFailed {
        stage: StageName,
        task: TaskId,
        height: Height,
        #[source]
        source: TaskError,
    },

    #[error("Height {0} reached the sink without a syncable")]
    MissingSyncable(Height),

    #[error("Nothing to process")]
    NothingToProcess,

    #[error("Nothing to backfill")]
    NothingToBackfill,

    #[error("Run was cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl IndexerError {
    /// A clean no-op run rather than a failure.
    pub fn is_idle(&self) -> bool {
        matches!(self, IndexerError::NothingToProcess | IndexerError::NothingToBackfill)
    }
}
