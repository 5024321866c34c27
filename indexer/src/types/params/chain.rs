use std::time::Duration;

use url::Url;

use crate::cli::chain::ChainCliArgs;

#[derive(Debug, Clone)]
pub struct ChainParams {
    pub provider_url: Url,
    pub request_timeout: Duration,
}

impl From<ChainCliArgs> for ChainParams {
    fn from(args: ChainCliArgs) -> Self {
        Self {
            provider_url: args.chain_provider_url,
            request_timeout: Duration::from_secs(args.chain_request_timeout_secs),
        }
    }
}
