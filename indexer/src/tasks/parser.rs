use std::collections::HashMap;

use async_trait::async_trait;
use num_bigint::BigInt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::client::chain::types::{Block, BlockIdFlag, StakingState, Transaction, Validator};
use crate::error::TaskResult;
use crate::pipeline::payload::{required, ParsedBlock, ParsedValidator, ParsedValidators, Payload};
use crate::pipeline::task::{Task, TaskId, TaskOutput};

/// Counts transactions and resolves the proposer's entity from its consensus address.
///
/// A proposer missing from the validator list keeps its consensus address as identity.
pub fn parse_block(block: &Block, validators: &[Validator], transactions: &[Transaction]) -> ParsedBlock {
    let proposer = &block.header.proposer_address;
    let proposer_entity_uid = match validators.iter().find(|v| &v.address == proposer) {
        Some(validator) => validator.entity_id.clone(),
        None => {
            warn!(height = block.header.height, proposer = %proposer, "Proposer is not in the validator set");
            proposer.clone()
        }
    };
    ParsedBlock { transactions_count: transactions.len() as u64, proposer_entity_uid }
}

/// Precommit classification, proposer flag and escrow figures of every validator.
///
/// A validator without a vote slot in the last commit, or a block without last commit, gets `None`: it had no
/// chance to vote, which is not a miss.
pub fn parse_validators(block: &Block, validators: &[Validator], state: &StakingState) -> ParsedValidators {
    let votes: HashMap<&str, BlockIdFlag> = block
        .last_commit
        .iter()
        .flat_map(|commit| commit.votes.iter())
        .map(|vote| (vote.validator_address.as_str(), vote.block_id_flag))
        .collect();

    validators
        .iter()
        .map(|validator| {
            let precommit_validated = votes.get(validator.address.as_str()).map(|flag| *flag == BlockIdFlag::Commit);
            let (total_shares, active_escrow_balance) = state
                .ledger
                .get(&validator.entity_id)
                .map(|account| (account.escrow.active.total_shares.clone(), account.escrow.active.balance.clone()))
                .unwrap_or_else(|| (BigInt::default(), BigInt::default()));

            let parsed = ParsedValidator {
                precommit_validated,
                proposed: block.header.proposer_address == validator.address,
                total_shares,
                active_escrow_balance,
            };
            (validator.entity_id.clone(), parsed)
        })
        .collect()
}

pub struct BlockParser;

#[async_trait]
impl Task for BlockParser {
    fn id(&self) -> TaskId {
        TaskId::BlockParser
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let block = required(&payload.raw_block, "raw_block")?;
        let validators = required(&payload.raw_validators, "raw_validators")?;
        let transactions = required(&payload.raw_transactions, "raw_transactions")?;

        Ok(TaskOutput::ParsedBlock(parse_block(block, validators, transactions)))
    }
}

pub struct ValidatorsParser;

#[async_trait]
impl Task for ValidatorsParser {
    fn id(&self) -> TaskId {
        TaskId::ValidatorsParser
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let block = required(&payload.raw_block, "raw_block")?;
        let validators = required(&payload.raw_validators, "raw_validators")?;
        let state = required(&payload.raw_state, "raw_state")?;

        Ok(TaskOutput::ParsedValidators(parse_validators(block, validators, state)))
    }
}
