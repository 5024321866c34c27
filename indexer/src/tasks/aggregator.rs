use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::client::chain::types::{HeightMeta, StakingState};
use crate::core::client::database::repository::{AccountAggRepository, ValidatorAggRepository};
use crate::core::client::database::OptionalExt;
use crate::error::{TaskError, TaskResult};
use crate::pipeline::payload::{required, AggregateChanges, Payload};
use crate::pipeline::task::{Task, TaskId, TaskOutput};
use crate::types::aggregate::{AccountAgg, AccountSnapshot, ValidatorAgg};

pub fn account_snapshots(meta: &HeightMeta, state: &StakingState) -> Vec<AccountSnapshot> {
    state
        .ledger
        .iter()
        .map(|(public_key, account)| AccountSnapshot {
            public_key: public_key.clone(),
            height: meta.height,
            time: meta.time,
            general_balance: account.general.balance.clone(),
            nonce: account.general.nonce,
            escrow_active_balance: account.escrow.active.balance.clone(),
            escrow_active_total_shares: account.escrow.active.total_shares.clone(),
            escrow_debonding_balance: account.escrow.debonding.balance.clone(),
            escrow_debonding_total_shares: account.escrow.debonding.total_shares.clone(),
        })
        .collect()
}

/// Folds the ledger accounts of the height into their aggregates. Nothing is written here, the persistor
/// stores the changes.
pub struct AccountAggCreator {
    repository: Arc<dyn AccountAggRepository>,
}

impl AccountAggCreator {
    pub fn new(repository: Arc<dyn AccountAggRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for AccountAggCreator {
    fn id(&self) -> TaskId {
        TaskId::AccountAggCreator
    }

    async fn run(&self, cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let meta = payload.height_meta()?;
        let state = required(&payload.raw_state, "raw_state")?;

        let mut changes = AggregateChanges::default();
        for snapshot in account_snapshots(meta, state) {
            if cancel.is_cancelled() {
                return Err(TaskError::Cancelled);
            }
            match self.repository.find_by_public_key(&snapshot.public_key).await.optional()? {
                None => changes.new.push(AccountAgg::from_snapshot(&snapshot)),
                Some(mut agg) => {
                    if agg.update(&snapshot) {
                        changes.updated.push(agg);
                    }
                }
            }
        }

        debug!(
            height = payload.current_height,
            new = changes.new.len(),
            updated = changes.updated.len(),
            "Account aggregates folded"
        );
        Ok(TaskOutput::AccountAggregates(changes))
    }
}

/// Folds the validator sequences of the height into the validator aggregates.
pub struct ValidatorAggCreator {
    repository: Arc<dyn ValidatorAggRepository>,
}

impl ValidatorAggCreator {
    pub fn new(repository: Arc<dyn ValidatorAggRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for ValidatorAggCreator {
    fn id(&self) -> TaskId {
        TaskId::ValidatorAggCreator
    }

    async fn run(&self, cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let seqs = required(&payload.validator_sequences, "validator_sequences")?;

        let mut changes = AggregateChanges::default();
        for seq in seqs.all() {
            if cancel.is_cancelled() {
                return Err(TaskError::Cancelled);
            }
            match self.repository.find_by_entity_uid(&seq.entity_uid).await.optional()? {
                None => changes.new.push(ValidatorAgg::from_sequence(seq)),
                Some(mut agg) => {
                    if agg.update(seq) {
                        changes.updated.push(agg);
                    }
                }
            }
        }

        debug!(
            height = payload.current_height,
            new = changes.new.len(),
            updated = changes.updated.len(),
            "Validator aggregates folded"
        );
        Ok(TaskOutput::ValidatorAggregates(changes))
    }
}
