use std::time::Duration;

use crate::cli::pipeline::PipelineCliArgs;
use crate::cli::{BackfillCmd, IndexCmd, ReindexCmd};
use crate::types::constant::{DEFAULT_TASK_MAX_ATTEMPTS, DEFAULT_TASK_RETRY_BASE_DELAY_MS};
use crate::types::report::ReportKind;
use crate::types::{Height, TargetId};

/// Retry policy applied to every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryParams {
    pub max_attempts: u32,
    /// wait before the first retry; zero disables waiting
    pub base_delay: Duration,
}

impl Default for RetryParams {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_TASK_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_TASK_RETRY_BASE_DELAY_MS),
        }
    }
}

impl From<&PipelineCliArgs> for RetryParams {
    fn from(args: &PipelineCliArgs) -> Self {
        Self { max_attempts: args.task_max_attempts, base_delay: Duration::from_millis(args.task_retry_base_delay_ms) }
    }
}

/// Which heights a run processes and which tasks it runs on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Index { first_height: Height, batch_size: u64, force_single_height: bool },
    /// Empty `target_ids` selects the tasks of every version missing from the store.
    Backfill { target_ids: Vec<TargetId> },
    /// Empty `target_ids` selects every task.
    Reindex { start_height: Option<Height>, end_height: Option<Height>, target_ids: Vec<TargetId> },
}

impl RunMode {
    pub fn kind(&self) -> ReportKind {
        match self {
            RunMode::Index { .. } => ReportKind::Index,
            RunMode::Backfill { .. } => ReportKind::Backfill,
            RunMode::Reindex { .. } => ReportKind::Reindex,
        }
    }
}

/// Options of a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub mode: RunMode,
    /// Whether stages declared concurrent run their tasks in parallel.
    pub concurrent_stages: bool,
}

impl PipelineOptions {
    pub fn new(mode: RunMode) -> Self {
        Self { mode, concurrent_stages: true }
    }
}

impl From<&IndexCmd> for PipelineOptions {
    fn from(cmd: &IndexCmd) -> Self {
        Self {
            mode: RunMode::Index {
                first_height: cmd.first_block_height,
                batch_size: cmd.batch_size,
                force_single_height: cmd.force_single_height,
            },
            concurrent_stages: !cmd.common.pipeline_args.sequential_stages,
        }
    }
}

impl From<&BackfillCmd> for PipelineOptions {
    fn from(cmd: &BackfillCmd) -> Self {
        Self {
            mode: RunMode::Backfill { target_ids: cmd.target_ids.clone() },
            concurrent_stages: !cmd.common.pipeline_args.sequential_stages,
        }
    }
}

impl From<&ReindexCmd> for PipelineOptions {
    fn from(cmd: &ReindexCmd) -> Self {
        Self {
            mode: RunMode::Reindex {
                start_height: cmd.start_height,
                end_height: cmd.end_height,
                target_ids: cmd.target_ids.clone(),
            },
            concurrent_stages: !cmd.common.pipeline_args.sequential_stages,
        }
    }
}
