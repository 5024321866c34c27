//! Sequence creators.
//!
//! Each creator computes the facts of its kind for the height, compares them with the rows already stored for
//! that height and only writes the difference. Running a height twice therefore never duplicates a row.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::client::chain::types::{Block, HeightMeta, StakingState, Transaction, Validator};
use crate::core::client::database::repository::{SequenceRepository, ValidatorSeqRepository};
use crate::error::{TaskError, TaskResult};
use crate::pipeline::payload::{required, ParsedBlock, ParsedValidators, Payload};
use crate::pipeline::task::{Task, TaskId, TaskOutput};
use crate::types::sequence::{
    BlockSeq, DebondingDelegationSeq, DelegationSeq, Reconciled, Sequence, StakingSeq, TransactionSeq, ValidatorSeq,
};
use crate::types::Height;

/// Validates the rows that need a write, then creates the missing ones and saves the changed ones.
async fn reconcile<T, R>(repository: &R, height: Height, computed: Vec<T>) -> TaskResult<Reconciled<T>>
where
    T: Sequence,
    R: SequenceRepository<T> + ?Sized,
{
    let persisted = repository.find_by_height(height).await?;
    let reconciled = Reconciled::from_rows(computed, &persisted);
    reconciled.validate()?;

    if !reconciled.new.is_empty() {
        repository.create_many(reconciled.new.clone()).await?;
    }
    for row in &reconciled.updated {
        repository.save(row.clone()).await?;
    }

    debug!(
        height,
        sequence = T::NAME,
        new = reconciled.new.len(),
        updated = reconciled.updated.len(),
        unchanged = reconciled.unchanged.len(),
        "Sequences reconciled"
    );
    Ok(reconciled)
}

pub fn block_sequence(meta: &HeightMeta, block: &Block, parsed: &ParsedBlock) -> BlockSeq {
    BlockSeq {
        height: meta.height,
        time: meta.time,
        app_version: meta.app_version,
        hash: block.header.hash.clone(),
        proposer_entity_uid: parsed.proposer_entity_uid.clone(),
        transactions_count: parsed.transactions_count,
    }
}

/// Fails when a validator has no parsed counterpart.
pub fn validator_sequences(
    meta: &HeightMeta,
    validators: &[Validator],
    parsed: &ParsedValidators,
) -> TaskResult<Vec<ValidatorSeq>> {
    validators
        .iter()
        .map(|validator| {
            let parsed = parsed.get(&validator.entity_id).ok_or(TaskError::MissingPayload("parsed_validators"))?;
            Ok(ValidatorSeq {
                height: meta.height,
                time: meta.time,
                entity_uid: validator.entity_id.clone(),
                node_uid: validator.node_id.clone(),
                address: validator.address.clone(),
                voting_power: validator.voting_power,
                total_shares: parsed.total_shares.clone(),
                active_escrow_balance: parsed.active_escrow_balance.clone(),
                commission: validator.commission.clone(),
                precommit_validated: parsed.precommit_validated,
                proposed: parsed.proposed,
            })
        })
        .collect()
}

pub fn transaction_sequences(meta: &HeightMeta, transactions: &[Transaction]) -> Vec<TransactionSeq> {
    transactions
        .iter()
        .map(|tx| TransactionSeq {
            height: meta.height,
            time: meta.time,
            hash: tx.hash.clone(),
            public_key: tx.public_key.clone(),
            nonce: tx.nonce,
            fee: tx.fee.clone(),
            gas_limit: tx.gas_limit,
            gas_price: tx.gas_price.clone(),
            method: tx.method.clone(),
        })
        .collect()
}

pub fn staking_sequence(meta: &HeightMeta, state: &StakingState) -> StakingSeq {
    StakingSeq {
        height: meta.height,
        time: meta.time,
        total_supply: state.total_supply.clone(),
        common_pool: state.common_pool.clone(),
        debonding_interval: state.parameters.debonding_interval,
        min_delegation_amount: state.parameters.min_delegation.clone(),
    }
}

pub fn delegation_sequences(meta: &HeightMeta, state: &StakingState) -> Vec<DelegationSeq> {
    state
        .delegations
        .iter()
        .flat_map(|(validator, delegators)| {
            delegators.iter().map(move |(delegator, delegation)| (validator, delegator, delegation))
        })
        .map(|(validator, delegator, delegation)| DelegationSeq {
            height: meta.height,
            time: meta.time,
            validator_uid: validator.clone(),
            delegator_uid: delegator.clone(),
            shares: delegation.shares.clone(),
        })
        .collect()
}

pub fn debonding_delegation_sequences(meta: &HeightMeta, state: &StakingState) -> Vec<DebondingDelegationSeq> {
    let mut rows = Vec::new();
    for (validator, delegators) in &state.debonding_delegations {
        for (delegator, debondings) in delegators {
            for debonding in debondings {
                rows.push(DebondingDelegationSeq {
                    height: meta.height,
                    time: meta.time,
                    validator_uid: validator.clone(),
                    delegator_uid: delegator.clone(),
                    shares: debonding.shares.clone(),
                    debond_end: debonding.debond_end,
                });
            }
        }
    }
    rows
}

pub struct BlockSeqCreator {
    repository: Arc<dyn SequenceRepository<BlockSeq>>,
}

impl BlockSeqCreator {
    pub fn new(repository: Arc<dyn SequenceRepository<BlockSeq>>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for BlockSeqCreator {
    fn id(&self) -> TaskId {
        TaskId::BlockSeqCreator
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let meta = payload.height_meta()?;
        let block = required(&payload.raw_block, "raw_block")?;
        let parsed = required(&payload.parsed_block, "parsed_block")?;

        let seq = block_sequence(meta, block, parsed);
        let reconciled = reconcile(self.repository.as_ref(), payload.current_height, vec![seq]).await?;
        Ok(TaskOutput::BlockSequence(reconciled))
    }
}

pub struct ValidatorSeqCreator {
    repository: Arc<dyn ValidatorSeqRepository>,
}

impl ValidatorSeqCreator {
    pub fn new(repository: Arc<dyn ValidatorSeqRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for ValidatorSeqCreator {
    fn id(&self) -> TaskId {
        TaskId::ValidatorSeqCreator
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let meta = payload.height_meta()?;
        let validators = required(&payload.raw_validators, "raw_validators")?;
        let parsed = required(&payload.parsed_validators, "parsed_validators")?;

        let seqs = validator_sequences(meta, validators, parsed)?;
        let reconciled = reconcile(self.repository.as_ref(), payload.current_height, seqs).await?;
        Ok(TaskOutput::ValidatorSequences(reconciled))
    }
}

pub struct TransactionSeqCreator {
    repository: Arc<dyn SequenceRepository<TransactionSeq>>,
}

impl TransactionSeqCreator {
    pub fn new(repository: Arc<dyn SequenceRepository<TransactionSeq>>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for TransactionSeqCreator {
    fn id(&self) -> TaskId {
        TaskId::TransactionSeqCreator
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let meta = payload.height_meta()?;
        let transactions = required(&payload.raw_transactions, "raw_transactions")?;

        let seqs = transaction_sequences(meta, transactions);
        let reconciled = reconcile(self.repository.as_ref(), payload.current_height, seqs).await?;
        Ok(TaskOutput::TransactionSequences(reconciled))
    }
}

pub struct StakingSeqCreator {
    repository: Arc<dyn SequenceRepository<StakingSeq>>,
}

impl StakingSeqCreator {
    pub fn new(repository: Arc<dyn SequenceRepository<StakingSeq>>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for StakingSeqCreator {
    fn id(&self) -> TaskId {
        TaskId::StakingSeqCreator
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let meta = payload.height_meta()?;
        let state = required(&payload.raw_state, "raw_state")?;

        let seq = staking_sequence(meta, state);
        let reconciled = reconcile(self.repository.as_ref(), payload.current_height, vec![seq]).await?;
        Ok(TaskOutput::StakingSequence(reconciled))
    }
}

pub struct DelegationsSeqCreator {
    repository: Arc<dyn SequenceRepository<DelegationSeq>>,
}

impl DelegationsSeqCreator {
    pub fn new(repository: Arc<dyn SequenceRepository<DelegationSeq>>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for DelegationsSeqCreator {
    fn id(&self) -> TaskId {
        TaskId::DelegationsSeqCreator
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let meta = payload.height_meta()?;
        let state = required(&payload.raw_state, "raw_state")?;

        let seqs = delegation_sequences(meta, state);
        let reconciled = reconcile(self.repository.as_ref(), payload.current_height, seqs).await?;
        Ok(TaskOutput::DelegationSequences(reconciled))
    }
}

pub struct DebondingDelegationsSeqCreator {
    repository: Arc<dyn SequenceRepository<DebondingDelegationSeq>>,
}

impl DebondingDelegationsSeqCreator {
    pub fn new(repository: Arc<dyn SequenceRepository<DebondingDelegationSeq>>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Task for DebondingDelegationsSeqCreator {
    fn id(&self) -> TaskId {
        TaskId::DebondingDelegationsSeqCreator
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let meta = payload.height_meta()?;
        let state = required(&payload.raw_state, "raw_state")?;

        let seqs = debonding_delegation_sequences(meta, state);
        let reconciled = reconcile(self.repository.as_ref(), payload.current_height, seqs).await?;
        Ok(TaskOutput::DebondingDelegationSequences(reconciled))
    }
}
