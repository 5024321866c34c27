use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser as _;
use dotenvy::dotenv;
use indexer::cli::{Cli, CommonArgs, Commands};
use indexer::core::config::Config;
use indexer::pipeline::Pipeline;
use indexer::types::params::PipelineOptions;
use indexer::utils::logging::init_logging;
use indexer::IndexerResult;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() -> ExitCode {
    dotenv().ok();
    if let Err(e) = init_logging() {
        // no subscriber to report through yet
        eprintln!("Failed to initialise logging: {e:?}");
        return ExitCode::FAILURE;
    }
    info!(version = indexer::types::constant::INDEXER_VERSION, "Starting indexer");
    let cli = Cli::parse();

    let (common, options) = match &cli.command {
        Commands::Index { index_command } => (&index_command.common, PipelineOptions::from(index_command.as_ref())),
        Commands::Backfill { backfill_command } => {
            (&backfill_command.common, PipelineOptions::from(backfill_command.as_ref()))
        }
        Commands::Reindex { reindex_command } => {
            (&reindex_command.common, PipelineOptions::from(reindex_command.as_ref()))
        }
    };
    info!(mode = ?options.mode, concurrent_stages = options.concurrent_stages, "Executing run");

    match run_indexer(common, options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_idle() => {
            info!(reason = %e, "Nothing to do");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(
                error = %e,
                error_chain = ?e,
                "Indexer run failed"
            );
            ExitCode::FAILURE
        }
    }
}

async fn run_indexer(common: &CommonArgs, options: PipelineOptions) -> IndexerResult<()> {
    let config = Arc::new(Config::setup(common).await?);
    debug!("Configuration initialized");

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received ctrl+c, finishing the current height");
                signal_token.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for ctrl+c"),
        }
    });

    let pipeline = Pipeline::new(config);
    let report = pipeline.start(cancel, options).await?;
    info!(
        report_id = %report.id,
        success_count = report.success_count,
        duration_ms = report.duration_ms,
        "Indexer run finished"
    );
    Ok(())
}
