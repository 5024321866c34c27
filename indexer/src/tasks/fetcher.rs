use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::core::client::ChainClient;
use crate::error::TaskResult;
use crate::pipeline::payload::Payload;
use crate::pipeline::task::{Task, TaskId, TaskOutput};

pub struct BlockFetcher {
    client: Arc<dyn ChainClient>,
}

impl BlockFetcher {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Task for BlockFetcher {
    fn id(&self) -> TaskId {
        TaskId::BlockFetcher
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let block = self.client.get_block_by_height(payload.current_height).await?;
        trace!(height = payload.current_height, hash = %block.header.hash, "Block fetched");
        Ok(TaskOutput::Block(block))
    }
}

pub struct StateFetcher {
    client: Arc<dyn ChainClient>,
}

impl StateFetcher {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Task for StateFetcher {
    fn id(&self) -> TaskId {
        TaskId::StateFetcher
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let state = self.client.get_state_by_height(payload.current_height).await?;
        trace!(height = payload.current_height, accounts = state.ledger.len(), "Staking state fetched");
        Ok(TaskOutput::State(state))
    }
}

pub struct ValidatorFetcher {
    client: Arc<dyn ChainClient>,
}

impl ValidatorFetcher {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Task for ValidatorFetcher {
    fn id(&self) -> TaskId {
        TaskId::ValidatorFetcher
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let validators = self.client.get_validators_by_height(payload.current_height).await?;
        trace!(height = payload.current_height, validators = validators.len(), "Validators fetched");
        Ok(TaskOutput::Validators(validators))
    }
}

pub struct TransactionFetcher {
    client: Arc<dyn ChainClient>,
}

impl TransactionFetcher {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Task for TransactionFetcher {
    fn id(&self) -> TaskId {
        TaskId::TransactionFetcher
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let transactions = self.client.get_transactions_by_height(payload.current_height).await?;
        trace!(height = payload.current_height, transactions = transactions.len(), "Transactions fetched");
        Ok(TaskOutput::Transactions(transactions))
    }
}
