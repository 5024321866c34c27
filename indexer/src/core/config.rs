use std::sync::Arc;

use tracing::info;

use crate::cli::CommonArgs;
use crate::core::client::{ChainClient, Database, HttpChainClient};
use crate::error::IndexerResult;
use crate::targets::Targets;
use crate::types::params::{AnalyzerParams, ChainParams, DatabaseParams, RetryParams};

/// Collaborators and parameters shared by every task of a run.
///
/// Built once at startup and handed to the pipeline behind an `Arc`.
pub struct Config {
    /// Source of raw chain data
    chain_client: Arc<dyn ChainClient>,
    /// Every repository the pipeline reads and writes
    database: Database,
    /// Declared targets and versions
    targets: Targets,
    retry_params: RetryParams,
    analyzer_params: AnalyzerParams,
}

impl Config {
    pub fn new(
        chain_client: Arc<dyn ChainClient>,
        database: Database,
        targets: Targets,
        retry_params: RetryParams,
        analyzer_params: AnalyzerParams,
    ) -> Self {
        Self { chain_client, database, targets, retry_params, analyzer_params }
    }

    /// Builds the configuration of a run from its command line arguments.
    pub async fn setup(common: &CommonArgs) -> IndexerResult<Self> {
        let targets = Targets::from_file(&common.pipeline_args.targets_file)?;
        info!(
            path = %common.pipeline_args.targets_file.display(),
            current_version = targets.current_version_id(),
            "Targets loaded"
        );

        let chain_params = ChainParams::from(common.chain_args.clone());
        let database_params = DatabaseParams::from(common.database_args.clone());

        let chain_client = Self::build_chain_client(&chain_params)?;
        let database = Self::build_database(&database_params).await?;

        Ok(Self::new(
            chain_client,
            database,
            targets,
            RetryParams::from(&common.pipeline_args),
            AnalyzerParams::from(common.analyzer_args.clone()),
        ))
    }

    fn build_chain_client(params: &ChainParams) -> IndexerResult<Arc<dyn ChainClient>> {
        Ok(Arc::new(HttpChainClient::new(params)?))
    }

    async fn build_database(params: &DatabaseParams) -> IndexerResult<Database> {
        match params {
            DatabaseParams::Memory => {
                info!("Using the in-memory store, nothing is persisted past this run");
                Ok(Database::in_memory())
            }
            DatabaseParams::MongoDb(mongo) => Ok(Database::mongodb(mongo).await?),
        }
    }

    /// Returns the chain client
    pub fn chain_client(&self) -> &Arc<dyn ChainClient> {
        &self.chain_client
    }

    /// Returns the repositories
    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    pub fn retry_params(&self) -> RetryParams {
        self.retry_params
    }

    pub fn analyzer_params(&self) -> AnalyzerParams {
        self.analyzer_params
    }
}
