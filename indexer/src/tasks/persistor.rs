use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::client::database::repository::{AccountAggRepository, SystemEventRepository, ValidatorAggRepository};
use crate::error::TaskResult;
use crate::pipeline::payload::{required, Payload};
use crate::pipeline::task::{Task, TaskId, TaskOutput};

pub struct AccountAggPersistor {
    repository: Arc<dyn AccountAggRepository>,
}

impl AccountAggPersistor {
    pub fn new(repository: Arc<dyn AccountAggRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for AccountAggPersistor {
    fn id(&self) -> TaskId {
        TaskId::AccountAggPersistor
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let changes = required(&payload.account_aggregates, "account_aggregates")?;

        // a retried attempt may find some of these already stored
        for agg in &changes.new {
            self.repository.create_or_update(agg.clone()).await?;
        }
        for agg in &changes.updated {
            self.repository.save(agg.clone()).await?;
        }
        Ok(TaskOutput::Nothing)
    }
}

pub struct ValidatorAggPersistor {
    repository: Arc<dyn ValidatorAggRepository>,
}

impl ValidatorAggPersistor {
    pub fn new(repository: Arc<dyn ValidatorAggRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for ValidatorAggPersistor {
    fn id(&self) -> TaskId {
        TaskId::ValidatorAggPersistor
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let changes = required(&payload.validator_aggregates, "validator_aggregates")?;
        changes.new.iter().chain(changes.updated.iter()).try_for_each(|agg| agg.validate())?;

        // a retried attempt may find some of these already stored
        for agg in &changes.new {
            self.repository.create_or_update(agg.clone()).await?;
        }
        for agg in &changes.updated {
            self.repository.save(agg.clone()).await?;
        }
        Ok(TaskOutput::Nothing)
    }
}

/// Upserts the events of the height, so re-running a height rewrites them instead of duplicating them.
pub struct SystemEventPersistor {
    repository: Arc<dyn SystemEventRepository>,
}

impl SystemEventPersistor {
    pub fn new(repository: Arc<dyn SystemEventRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for SystemEventPersistor {
    fn id(&self) -> TaskId {
        TaskId::SystemEventPersistor
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        for event in &payload.system_events {
            self.repository.create_or_update(event.clone()).await?;
        }
        if !payload.system_events.is_empty() {
            debug!(height = payload.current_height, events = payload.system_events.len(), "System events stored");
        }
        Ok(TaskOutput::Nothing)
    }
}
