use crate::cli::pipeline::AnalyzerCliArgs;
use crate::types::constant::{
    DEFAULT_MAX_VALIDATOR_SEQUENCES, DEFAULT_MISSED_IN_A_ROW_THRESHOLD, DEFAULT_MISSED_IN_A_ROW_WINDOW,
    DEFAULT_MISSED_M_OF_N_THRESHOLD,
};

/// Thresholds of the missed block detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerParams {
    /// historical sequences fetched per validator, the current one comes on top
    pub max_validator_sequences: u64,
    pub missed_m_of_n_threshold: u64,
    pub missed_in_a_row_threshold: u64,
    pub missed_in_a_row_window: u64,
}

impl Default for AnalyzerParams {
    fn default() -> Self {
        Self {
            max_validator_sequences: DEFAULT_MAX_VALIDATOR_SEQUENCES,
            missed_m_of_n_threshold: DEFAULT_MISSED_M_OF_N_THRESHOLD,
            missed_in_a_row_threshold: DEFAULT_MISSED_IN_A_ROW_THRESHOLD,
            missed_in_a_row_window: DEFAULT_MISSED_IN_A_ROW_WINDOW,
        }
    }
}

impl From<AnalyzerCliArgs> for AnalyzerParams {
    fn from(args: AnalyzerCliArgs) -> Self {
        Self {
            max_validator_sequences: args.max_validator_sequences,
            missed_m_of_n_threshold: args.missed_m_of_n_threshold,
            missed_in_a_row_threshold: args.missed_in_a_row_threshold,
            missed_in_a_row_window: args.missed_in_a_row_window,
        }
    }
}
