use std::collections::BTreeMap;

use num_bigint::BigInt;
use uuid::Uuid;

use crate::core::client::chain::types::{Block, HeightMeta, StakingState, Transaction, Validator};
use crate::error::{TaskError, TaskResult};
use crate::types::aggregate::{AccountAgg, ValidatorAgg};
use crate::types::event::SystemEvent;
use crate::types::sequence::{
    BlockSeq, DebondingDelegationSeq, DelegationSeq, Reconciled, StakingSeq, TransactionSeq, ValidatorSeq,
};
use crate::types::syncable::Syncable;
use crate::types::{Height, VersionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    pub transactions_count: u64,
    pub proposer_entity_uid: String,
}

/// Per-validator values derived from the block and the staking ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedValidator {
    pub precommit_validated: Option<bool>,
    pub proposed: bool,
    pub total_shares: BigInt,
    pub active_escrow_balance: BigInt,
}

/// Keyed by entity id.
pub type ParsedValidators = BTreeMap<String, ParsedValidator>;

/// Aggregates touched by one height, split by the write they need.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateChanges<T> {
    pub new: Vec<T>,
    pub updated: Vec<T>,
}

impl<T> Default for AggregateChanges<T> {
    fn default() -> Self {
        Self { new: Vec::new(), updated: Vec::new() }
    }
}

/// Work record of one height.
///
/// Fields are grouped by the stage that fills them. A task reading a field its stage depends on uses
/// [`required`], which turns a missing value into [`TaskError::MissingPayload`].
#[derive(Debug, Default)]
pub struct Payload {
    pub current_height: Height,
    /// run that processes the height
    pub report_id: Uuid,
    /// version of the task set running
    pub index_version: VersionId,

    // setup
    pub height_meta: Option<HeightMeta>,

    // syncer
    pub syncable: Option<Syncable>,

    // fetcher
    pub raw_block: Option<Block>,
    pub raw_state: Option<StakingState>,
    pub raw_validators: Option<Vec<Validator>>,
    pub raw_transactions: Option<Vec<Transaction>>,

    // parser
    pub parsed_block: Option<ParsedBlock>,
    pub parsed_validators: Option<ParsedValidators>,

    // sequencer
    pub block_sequence: Option<Reconciled<BlockSeq>>,
    pub validator_sequences: Option<Reconciled<ValidatorSeq>>,
    pub transaction_sequences: Option<Reconciled<TransactionSeq>>,
    pub staking_sequence: Option<Reconciled<StakingSeq>>,
    pub delegation_sequences: Option<Reconciled<DelegationSeq>>,
    pub debonding_delegation_sequences: Option<Reconciled<DebondingDelegationSeq>>,

    // aggregator
    pub account_aggregates: Option<AggregateChanges<AccountAgg>>,
    pub validator_aggregates: Option<AggregateChanges<ValidatorAgg>>,

    // analyzer
    pub system_events: Vec<SystemEvent>,
}

impl Payload {
    pub fn new(height: Height, report_id: Uuid, index_version: VersionId) -> Self {
        Self { current_height: height, report_id, index_version, ..Default::default() }
    }

    /// Clears every field so the payload can carry another height.
    pub fn reset(&mut self) {
        // destructured so that a new field cannot be forgotten here
        let Payload {
            current_height,
            report_id,
            index_version,
            height_meta,
            syncable,
            raw_block,
            raw_state,
            raw_validators,
            raw_transactions,
            parsed_block,
            parsed_validators,
            block_sequence,
            validator_sequences,
            transaction_sequences,
            staking_sequence,
            delegation_sequences,
            debonding_delegation_sequences,
            account_aggregates,
            validator_aggregates,
            system_events,
        } = self;

        *current_height = 0;
        *report_id = Uuid::nil();
        *index_version = 0;
        *height_meta = None;
        *syncable = None;
        *raw_block = None;
        *raw_state = None;
        *raw_validators = None;
        *raw_transactions = None;
        *parsed_block = None;
        *parsed_validators = None;
        *block_sequence = None;
        *validator_sequences = None;
        *transaction_sequences = None;
        *staking_sequence = None;
        *delegation_sequences = None;
        *debonding_delegation_sequences = None;
        *account_aggregates = None;
        *validator_aggregates = None;
        system_events.clear();
    }

    pub fn height_meta(&self) -> TaskResult<&HeightMeta> {
        required(&self.height_meta, "height_meta")
    }
}

pub fn required<'a, T>(field: &'a Option<T>, name: &'static str) -> TaskResult<&'a T> {
    field.as_ref().ok_or(TaskError::MissingPayload(name))
}

/// Reuses payloads across heights. Every payload handed out is reset first, so nothing leaks from the
/// previous height.
#[derive(Debug, Default)]
pub struct PayloadPool {
    free: Vec<Payload>,
}

impl PayloadPool {
    pub fn acquire(&mut self, height: Height, report_id: Uuid, index_version: VersionId) -> Payload {
        match self.free.pop() {
            Some(mut payload) => {
                payload.reset();
                payload.current_height = height;
                payload.report_id = report_id;
                payload.index_version = index_version;
                payload
            }
            None => Payload::new(height, report_id, index_version),
        }
    }

    pub fn release(&mut self, mut payload: Payload) {
        payload.reset();
        self.free.push(payload);
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }
}
