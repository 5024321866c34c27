use std::path::PathBuf;

use clap::Args;

use crate::types::constant::{
    DEFAULT_MAX_VALIDATOR_SEQUENCES, DEFAULT_MISSED_IN_A_ROW_THRESHOLD, DEFAULT_MISSED_IN_A_ROW_WINDOW,
    DEFAULT_MISSED_M_OF_N_THRESHOLD, DEFAULT_TASK_MAX_ATTEMPTS, DEFAULT_TASK_RETRY_BASE_DELAY_MS,
};

fn parse_positive_u32(s: &str) -> Result<u32, String> {
    let value: u32 = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if value == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(value)
}

/// Parameters shared by every run mode.
#[derive(Debug, Clone, Args)]
pub struct PipelineCliArgs {
    /// Path to the targets declaration (versions, shared tasks and available targets).
    #[arg(env = "INDEXER_TARGETS_FILE", long, default_value = "indexer/config/targets.json")]
    pub targets_file: PathBuf,

    /// Run every stage sequentially, even the ones that normally run their tasks concurrently.
    #[arg(env = "INDEXER_SEQUENTIAL_STAGES", long, default_value_t = false)]
    pub sequential_stages: bool,

    /// Number of attempts a task gets before a transient failure aborts the stage.
    #[arg(
        env = "INDEXER_TASK_MAX_ATTEMPTS",
        long,
        default_value_t = DEFAULT_TASK_MAX_ATTEMPTS,
        value_parser = parse_positive_u32
    )]
    pub task_max_attempts: u32,

    /// Delay before the first retry, doubled on each following one.
    #[arg(env = "INDEXER_TASK_RETRY_BASE_DELAY_MS", long, default_value_t = DEFAULT_TASK_RETRY_BASE_DELAY_MS)]
    pub task_retry_base_delay_ms: u64,
}

/// Thresholds of the system event analyzer.
#[derive(Debug, Clone, Args)]
pub struct AnalyzerCliArgs {
    /// Number of historical validator sequences the missed block checks look at.
    #[arg(env = "INDEXER_MAX_VALIDATOR_SEQUENCES", long, default_value_t = DEFAULT_MAX_VALIDATOR_SEQUENCES)]
    pub max_validator_sequences: u64,

    /// Missed blocks within the window that raise a "missed N of M" event.
    #[arg(env = "INDEXER_MISSED_M_OF_N_THRESHOLD", long, default_value_t = DEFAULT_MISSED_M_OF_N_THRESHOLD)]
    pub missed_m_of_n_threshold: u64,

    /// Consecutive missed blocks that raise a "missed N consecutive" event.
    #[arg(env = "INDEXER_MISSED_IN_A_ROW_THRESHOLD", long, default_value_t = DEFAULT_MISSED_IN_A_ROW_THRESHOLD)]
    pub missed_in_a_row_threshold: u64,

    /// Longest run of consecutive misses that is counted.
    #[arg(env = "INDEXER_MISSED_IN_A_ROW_WINDOW", long, default_value_t = DEFAULT_MISSED_IN_A_ROW_WINDOW)]
    pub missed_in_a_row_window: u64,
}
