use clap::Args;
use url::Url;

use crate::types::constant::DEFAULT_CHAIN_REQUEST_TIMEOUT_SECS;

/// Parameters of the chain-data provider.
#[derive(Debug, Clone, Args)]
pub struct ChainCliArgs {
    /// Base URL of the chain-data proxy.
    #[arg(env = "INDEXER_CHAIN_PROVIDER_URL", long, default_value = "http://localhost:8080")]
    pub chain_provider_url: Url,

    /// Timeout for a single request to the provider, in seconds.
    #[arg(env = "INDEXER_CHAIN_REQUEST_TIMEOUT_SECS", long, default_value_t = DEFAULT_CHAIN_REQUEST_TIMEOUT_SECS)]
    pub chain_request_timeout_secs: u64,
}
