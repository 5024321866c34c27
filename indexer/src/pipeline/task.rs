use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::client::chain::types::{Block, HeightMeta, StakingState, Transaction, Validator};
use crate::error::{TaskError, TaskResult};
use crate::pipeline::payload::{AggregateChanges, ParsedBlock, ParsedValidators, Payload};
use crate::pipeline::stage::StageName;
use crate::types::aggregate::{AccountAgg, ValidatorAgg};
use crate::types::constant::MAX_BACKOFF_EXPONENT;
use crate::types::event::SystemEvent;
use crate::types::params::RetryParams;
use crate::types::sequence::{
    BlockSeq, DebondingDelegationSeq, DelegationSeq, Reconciled, StakingSeq, TransactionSeq, ValidatorSeq,
};
use crate::types::syncable::Syncable;

/// Every task the indexer knows. Targets declarations refer to tasks by these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, AsRefStr)]
pub enum TaskId {
    HeightMetaRetriever,
    MainSyncer,
    BlockFetcher,
    StateFetcher,
    ValidatorFetcher,
    TransactionFetcher,
    BlockParser,
    ValidatorsParser,
    BlockSeqCreator,
    ValidatorSeqCreator,
    TransactionSeqCreator,
    StakingSeqCreator,
    DelegationsSeqCreator,
    DebondingDelegationsSeqCreator,
    AccountAggCreator,
    ValidatorAggCreator,
    SystemEventCreator,
    AccountAggPersistor,
    ValidatorAggPersistor,
    SystemEventPersistor,
}

impl TaskId {
    pub fn stage(self) -> StageName {
        match self {
            TaskId::HeightMetaRetriever => StageName::Setup,
            TaskId::MainSyncer => StageName::Syncer,
            TaskId::BlockFetcher | TaskId::StateFetcher | TaskId::ValidatorFetcher | TaskId::TransactionFetcher => {
                StageName::Fetcher
            }
            TaskId::BlockParser | TaskId::ValidatorsParser => StageName::Parser,
            TaskId::BlockSeqCreator
            | TaskId::ValidatorSeqCreator
            | TaskId::TransactionSeqCreator
            | TaskId::StakingSeqCreator
            | TaskId::DelegationsSeqCreator
            | TaskId::DebondingDelegationsSeqCreator => StageName::Sequencer,
            TaskId::AccountAggCreator | TaskId::ValidatorAggCreator => StageName::Aggregator,
            TaskId::SystemEventCreator => StageName::Analyzer,
            TaskId::AccountAggPersistor | TaskId::ValidatorAggPersistor | TaskId::SystemEventPersistor => {
                StageName::Persistor
            }
        }
    }

    /// Tasks every run executes whatever the selected targets: without them a height cannot be tracked.
    pub fn is_required(self) -> bool {
        matches!(self, TaskId::HeightMetaRetriever | TaskId::MainSyncer)
    }
}

/// Payload fields filled by one task invocation.
///
/// Tasks only read the payload; the stage runner applies their outputs once it is safe to do so.
#[derive(Debug)]
pub enum TaskOutput {
    Nothing,
    HeightMeta(HeightMeta),
    Syncable(Syncable),
    Block(Block),
    State(StakingState),
    Validators(Vec<Validator>),
    Transactions(Vec<Transaction>),
    ParsedBlock(ParsedBlock),
    ParsedValidators(ParsedValidators),
    BlockSequence(Reconciled<BlockSeq>),
    ValidatorSequences(Reconciled<ValidatorSeq>),
    TransactionSequences(Reconciled<TransactionSeq>),
    StakingSequence(Reconciled<StakingSeq>),
    DelegationSequences(Reconciled<DelegationSeq>),
    DebondingDelegationSequences(Reconciled<DebondingDelegationSeq>),
    AccountAggregates(AggregateChanges<AccountAgg>),
    ValidatorAggregates(AggregateChanges<ValidatorAgg>),
    SystemEvents(Vec<SystemEvent>),
}

impl TaskOutput {
    pub fn apply(self, payload: &mut Payload) {
        match self {
            TaskOutput::Nothing => {}
            TaskOutput::HeightMeta(meta) => payload.height_meta = Some(meta),
            TaskOutput::Syncable(syncable) => payload.syncable = Some(syncable),
            TaskOutput::Block(block) => payload.raw_block = Some(block),
            TaskOutput::State(state) => payload.raw_state = Some(state),
            TaskOutput::Validators(validators) => payload.raw_validators = Some(validators),
            TaskOutput::Transactions(transactions) => payload.raw_transactions = Some(transactions),
            TaskOutput::ParsedBlock(parsed) => payload.parsed_block = Some(parsed),
            TaskOutput::ParsedValidators(parsed) => payload.parsed_validators = Some(parsed),
            TaskOutput::BlockSequence(seq) => payload.block_sequence = Some(seq),
            TaskOutput::ValidatorSequences(seqs) => payload.validator_sequences = Some(seqs),
            TaskOutput::TransactionSequences(seqs) => payload.transaction_sequences = Some(seqs),
            TaskOutput::StakingSequence(seq) => payload.staking_sequence = Some(seq),
            TaskOutput::DelegationSequences(seqs) => payload.delegation_sequences = Some(seqs),
            TaskOutput::DebondingDelegationSequences(seqs) => payload.debonding_delegation_sequences = Some(seqs),
            TaskOutput::AccountAggregates(changes) => payload.account_aggregates = Some(changes),
            TaskOutput::ValidatorAggregates(changes) => payload.validator_aggregates = Some(changes),
            TaskOutput::SystemEvents(events) => payload.system_events.extend(events),
        }
    }
}

/// A single unit of work bound to one stage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Task: Send + Sync {
    fn id(&self) -> TaskId;

    async fn run(&self, cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput>;
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`, the exponent capped at
/// [`MAX_BACKOFF_EXPONENT`].
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    base.saturating_mul(2_u32.saturating_pow(exponent))
}

/// Re-invokes the wrapped task while it fails with an error the predicate classifies as transient and
/// attempts remain. Any other failure propagates right away.
pub struct RetryingTask {
    inner: Arc<dyn Task>,
    max_attempts: u32,
    base_delay: Duration,
    is_transient: fn(&TaskError) -> bool,
}

impl RetryingTask {
    pub fn new(inner: Arc<dyn Task>, params: RetryParams) -> Self {
        Self {
            inner,
            max_attempts: params.max_attempts.max(1),
            base_delay: params.base_delay,
            is_transient: TaskError::is_transient,
        }
    }

    pub fn with_predicate(mut self, is_transient: fn(&TaskError) -> bool) -> Self {
        self.is_transient = is_transient;
        self
    }
}

#[async_trait]
impl Task for RetryingTask {
    fn id(&self) -> TaskId {
        self.inner.id()
    }

    async fn run(&self, cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(TaskError::Cancelled);
            }

            match self.inner.run(cancel, payload).await {
                Ok(output) => {
                    if attempt > 1 {
                        debug!(task = %self.id(), height = payload.current_height, attempt, "Task succeeded on retry");
                    }
                    return Ok(output);
                }
                Err(err) if attempt < self.max_attempts && (self.is_transient)(&err) => {
                    let delay = backoff_delay(self.base_delay, attempt);
                    warn!(
                        task = %self.id(),
                        height = payload.current_height,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Task failed with a transient error, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(TaskError::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
