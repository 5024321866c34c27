pub mod error;
pub mod http;
pub mod types;

use async_trait::async_trait;

pub use error::ClientError;
pub use http::HttpChainClient;
use types::{Block, HeightMeta, StakingState, Transaction, Validator};

use crate::types::Height;

/// Height-indexed access to the chain-data provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Most recent height known to the provider.
    async fn get_head(&self) -> Result<Height, ClientError>;

    async fn get_meta_by_height(&self, height: Height) -> Result<HeightMeta, ClientError>;

    async fn get_block_by_height(&self, height: Height) -> Result<Block, ClientError>;

    async fn get_state_by_height(&self, height: Height) -> Result<StakingState, ClientError>;

    async fn get_validators_by_height(&self, height: Height) -> Result<Vec<Validator>, ClientError>;

    async fn get_transactions_by_height(&self, height: Height) -> Result<Vec<Transaction>, ClientError>;
}
