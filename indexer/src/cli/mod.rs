use clap::{Args, Parser, Subcommand};

use crate::types::constant::{DEFAULT_BATCH_SIZE, DEFAULT_FIRST_BLOCK_HEIGHT};
use crate::types::{Height, TargetId};

pub mod chain;
pub mod database;
pub mod pipeline;

#[derive(Parser, Debug)]
#[command(
    name = "indexer",
    version,
    about = "Chain indexer - turns raw chain state into historical records",
    long_about = "Pulls blocks, validators, staking state and transactions from a chain-data provider, one height \
    at a time, and derives per-height sequences, rollups and system events from them.\n\n\
    Run modes:\n  \
    • index     - process new heights up to the chain head\n  \
    • backfill  - re-run heights produced by an older index version\n  \
    • reindex   - replay an explicit height range",
    after_help = "Examples:\n  \
    indexer index --batch-size 500\n  \
    indexer backfill --target-ids 3\n  \
    indexer reindex --start-height 100 --end-height 200"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index heights that were not processed yet
    Index {
        #[command(flatten)]
        index_command: Box<IndexCmd>,
    },
    /// Re-run heights whose index version is older than the current one
    Backfill {
        #[command(flatten)]
        backfill_command: Box<BackfillCmd>,
    },
    /// Replay an explicit range of heights
    Reindex {
        #[command(flatten)]
        reindex_command: Box<ReindexCmd>,
    },
}

/// Arguments every run mode needs to build its configuration.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    #[clap(flatten)]
    pub pipeline_args: pipeline::PipelineCliArgs,

    #[clap(flatten)]
    pub analyzer_args: pipeline::AnalyzerCliArgs,

    #[clap(flatten)]
    pub database_args: database::DatabaseCliArgs,

    #[clap(flatten)]
    pub chain_args: chain::ChainCliArgs,
}

#[derive(Debug, Clone, Args)]
pub struct IndexCmd {
    #[clap(flatten)]
    pub common: CommonArgs,

    /// Height to start from when nothing was indexed yet.
    #[arg(env = "INDEXER_FIRST_BLOCK_HEIGHT", long, default_value_t = DEFAULT_FIRST_BLOCK_HEIGHT)]
    pub first_block_height: Height,

    /// Maximum number of heights processed by one run.
    #[arg(env = "INDEXER_BATCH_SIZE", long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: u64,

    /// Process the range even when it holds a single height.
    #[arg(env = "INDEXER_FORCE_SINGLE_HEIGHT", long, default_value_t = false)]
    pub force_single_height: bool,
}

#[derive(Debug, Clone, Args)]
pub struct BackfillCmd {
    #[clap(flatten)]
    pub common: CommonArgs,

    /// Only run the tasks of these targets instead of every task introduced since the stored version.
    #[arg(long, value_delimiter = ',')]
    pub target_ids: Vec<TargetId>,
}

#[derive(Debug, Clone, Args)]
pub struct ReindexCmd {
    #[clap(flatten)]
    pub common: CommonArgs,

    /// First height to replay, defaults to 1.
    #[arg(long)]
    pub start_height: Option<Height>,

    /// Last height to replay, defaults to the most recent indexed height.
    #[arg(long)]
    pub end_height: Option<Height>,

    /// Only run the tasks of these targets.
    #[arg(long, value_delimiter = ',')]
    pub target_ids: Vec<TargetId>,
}
