use thiserror::Error;

use crate::core::client::chain::ClientError;
use crate::core::client::database::DatabaseError;
use crate::types::error::ValidationError;

pub type TaskResult<T> = Result<T, TaskError>;

/// Failure of a single task invocation.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Chain client error: {0}")]
    Client(#[from] ClientError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A task ran before the stage that fills its input.
    #[error("Payload field `{0}` is not populated")]
    MissingPayload(&'static str),

    #[error("Task was cancelled")]
    Cancelled,
}

impl TaskError {
    /// Default transience predicate of the retrying task: only I/O failures of collaborators are retried.
    pub fn is_transient(&self) -> bool {
        match self {
            TaskError::Client(e) => e.is_transient(),
            TaskError::Database(e) => e.is_transient(),
            TaskError::Validation(_) | TaskError::MissingPayload(_) | TaskError::Cancelled => false,
        }
    }
}
