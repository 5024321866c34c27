use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, trace};
use url::Url;

use super::error::ClientError;
use super::types::{Block, HeightMeta, StakingState, Transaction, Validator};
use super::ChainClient;
use crate::types::params::ChainParams;
use crate::types::Height;

#[derive(Deserialize)]
struct HeadResponse {
    height: Height,
}

/// JSON client for the chain-data proxy.
///
/// Routes: `GET /head` and `GET /heights/{height}/{meta|block|state|validators|transactions}`.
pub struct HttpChainClient {
    client: Client,
    base_url: Url,
}

impl HttpChainClient {
    pub fn new(params: &ChainParams) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(params.request_timeout)
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;
        // `Url::join` drops the last path segment unless the base ends with a slash
        let mut base_url = params.provider_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    async fn get<T>(&self, path: &str, resource: &'static str, height: Option<Height>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        trace!(%url, resource, "Requesting chain data");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Transport { resource, message: e.to_string() })?;

        let status = response.status();
        match status {
            s if s.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| ClientError::Decode { resource, message: e.to_string() }),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound { resource, height: height.unwrap_or_default() }),
            StatusCode::TOO_MANY_REQUESTS => Err(ClientError::RateLimited { resource }),
            s if s.is_server_error() => {
                debug!(status = %s, resource, "Chain provider returned a server error");
                Err(ClientError::Transport { resource, message: format!("provider answered {}", s) })
            }
            s => Err(ClientError::Decode { resource, message: format!("unexpected status {}", s) }),
        }
    }

    async fn get_at<T>(&self, height: Height, route: &str, resource: &'static str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        self.get(&format!("heights/{}/{}", height, route), resource, Some(height)).await
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn get_head(&self) -> Result<Height, ClientError> {
        let head: HeadResponse = self.get("head", "head", None).await?;
        Ok(head.height)
    }

    async fn get_meta_by_height(&self, height: Height) -> Result<HeightMeta, ClientError> {
        self.get_at(height, "meta", "height meta").await
    }

    async fn get_block_by_height(&self, height: Height) -> Result<Block, ClientError> {
        self.get_at(height, "block", "block").await
    }

    async fn get_state_by_height(&self, height: Height) -> Result<StakingState, ClientError> {
        self.get_at(height, "state", "staking state").await
    }

    async fn get_validators_by_height(&self, height: Height) -> Result<Vec<Validator>, ClientError> {
        self.get_at(height, "validators", "validators").await
    }

    async fn get_transactions_by_height(&self, height: Height) -> Result<Vec<Transaction>, ClientError> {
        self.get_at(height, "transactions", "transactions").await
    }
}
