//! Task implementations, grouped by the stage they belong to.

pub mod aggregator;
pub mod analyzer;
pub mod fetcher;
pub mod parser;
pub mod persistor;
pub mod sequencer;
pub mod setup;
pub mod syncer;

use std::sync::Arc;

use crate::core::config::Config;
use crate::pipeline::registry::TaskRegistry;
use aggregator::{AccountAggCreator, ValidatorAggCreator};
use analyzer::SystemEventCreator;
use fetcher::{BlockFetcher, StateFetcher, TransactionFetcher, ValidatorFetcher};
use parser::{BlockParser, ValidatorsParser};
use persistor::{AccountAggPersistor, SystemEventPersistor, ValidatorAggPersistor};
use sequencer::{
    BlockSeqCreator, DebondingDelegationsSeqCreator, DelegationsSeqCreator, StakingSeqCreator, TransactionSeqCreator,
    ValidatorSeqCreator,
};
use setup::HeightMetaRetriever;
use syncer::MainSyncer;

/// Registry holding every task, wired to the collaborators of `config`.
pub fn standard_registry(config: &Config) -> TaskRegistry {
    let client = config.chain_client().clone();
    let db = config.database();

    let mut registry = TaskRegistry::new();
    registry
        .register(Arc::new(HeightMetaRetriever::new(client.clone())))
        .register(Arc::new(MainSyncer::new(db.syncables.clone())))
        .register(Arc::new(BlockFetcher::new(client.clone())))
        .register(Arc::new(StateFetcher::new(client.clone())))
        .register(Arc::new(ValidatorFetcher::new(client.clone())))
        .register(Arc::new(TransactionFetcher::new(client)))
        .register(Arc::new(BlockParser))
        .register(Arc::new(ValidatorsParser))
        .register(Arc::new(BlockSeqCreator::new(db.block_seqs.clone())))
        .register(Arc::new(ValidatorSeqCreator::new(db.validator_seqs.clone())))
        .register(Arc::new(TransactionSeqCreator::new(db.transaction_seqs.clone())))
        .register(Arc::new(StakingSeqCreator::new(db.staking_seqs.clone())))
        .register(Arc::new(DelegationsSeqCreator::new(db.delegation_seqs.clone())))
        .register(Arc::new(DebondingDelegationsSeqCreator::new(db.debonding_delegation_seqs.clone())))
        .register(Arc::new(AccountAggCreator::new(db.account_aggs.clone())))
        .register(Arc::new(ValidatorAggCreator::new(db.validator_aggs.clone())))
        .register(Arc::new(SystemEventCreator::new(db.validator_seqs.clone(), config.analyzer_params())))
        .register(Arc::new(AccountAggPersistor::new(db.account_aggs.clone())))
        .register(Arc::new(ValidatorAggPersistor::new(db.validator_aggs.clone())))
        .register(Arc::new(SystemEventPersistor::new(db.system_events.clone())));
    registry
}
