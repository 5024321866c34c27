pub mod analyzer;
pub mod chain;
pub mod database;
pub mod pipeline;

pub use analyzer::AnalyzerParams;
pub use chain::ChainParams;
pub use database::DatabaseParams;
pub use pipeline::{PipelineOptions, RetryParams, RunMode};
