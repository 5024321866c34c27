pub mod constant;
pub mod error;
pub mod memory;
pub mod mongo;
pub mod mongo_client;
pub mod repository;

use std::sync::Arc;

pub use error::{DatabaseError, OptionalExt};
use memory::{
    MemoryAccountAggRepository, MemoryReportRepository, MemorySequenceRepository, MemorySyncableRepository,
    MemorySystemEventRepository, MemoryValidatorAggRepository,
};
use mongo::{
    MongoAccountAggRepository, MongoReportRepository, MongoSequenceRepository, MongoSyncableRepository,
    MongoSystemEventRepository, MongoValidatorAggRepository,
};
use mongo_client::MongoClient;
use repository::{
    AccountAggRepository, ReportRepository, SequenceRepository, SyncableRepository, SystemEventRepository,
    ValidatorAggRepository, ValidatorSeqRepository,
};
use tracing::info;

use crate::types::params::database::MongoConfig;
use crate::types::sequence::{
    BlockSeq, DebondingDelegationSeq, DelegationSeq, StakingSeq, TransactionSeq, ValidatorSeq,
};

/// Every repository the pipeline writes to or reads from, shared by all tasks of a run.
#[derive(Clone)]
pub struct Database {
    pub syncables: Arc<dyn SyncableRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub block_seqs: Arc<dyn SequenceRepository<BlockSeq>>,
    pub validator_seqs: Arc<dyn ValidatorSeqRepository>,
    pub transaction_seqs: Arc<dyn SequenceRepository<TransactionSeq>>,
    pub staking_seqs: Arc<dyn SequenceRepository<StakingSeq>>,
    pub delegation_seqs: Arc<dyn SequenceRepository<DelegationSeq>>,
    pub debonding_delegation_seqs: Arc<dyn SequenceRepository<DebondingDelegationSeq>>,
    pub account_aggs: Arc<dyn AccountAggRepository>,
    pub validator_aggs: Arc<dyn ValidatorAggRepository>,
    pub system_events: Arc<dyn SystemEventRepository>,
}

impl Database {
    pub fn in_memory() -> Self {
        Self {
            syncables: Arc::new(MemorySyncableRepository::default()),
            reports: Arc::new(MemoryReportRepository::default()),
            block_seqs: Arc::new(MemorySequenceRepository::<BlockSeq>::default()),
            validator_seqs: Arc::new(MemorySequenceRepository::<ValidatorSeq>::default()),
            transaction_seqs: Arc::new(MemorySequenceRepository::<TransactionSeq>::default()),
            staking_seqs: Arc::new(MemorySequenceRepository::<StakingSeq>::default()),
            delegation_seqs: Arc::new(MemorySequenceRepository::<DelegationSeq>::default()),
            debonding_delegation_seqs: Arc::new(MemorySequenceRepository::<DebondingDelegationSeq>::default()),
            account_aggs: Arc::new(MemoryAccountAggRepository::default()),
            validator_aggs: Arc::new(MemoryValidatorAggRepository::default()),
            system_events: Arc::new(MemorySystemEventRepository::default()),
        }
    }

    /// Connects to MongoDB and makes sure every natural key is backed by a unique index.
    pub async fn mongodb(config: &MongoConfig) -> Result<Self, DatabaseError> {
        let client = Arc::new(MongoClient::new(&config.connection_url, &config.database_name).await?);
        client.health_check().await?;

        let syncables = MongoSyncableRepository::new(client.clone());
        let reports = MongoReportRepository::new(client.clone());
        let block_seqs = MongoSequenceRepository::<BlockSeq>::new(client.clone());
        let validator_seqs = MongoSequenceRepository::<ValidatorSeq>::new(client.clone());
        let transaction_seqs = MongoSequenceRepository::<TransactionSeq>::new(client.clone());
        let staking_seqs = MongoSequenceRepository::<StakingSeq>::new(client.clone());
        let delegation_seqs = MongoSequenceRepository::<DelegationSeq>::new(client.clone());
        let debonding_delegation_seqs = MongoSequenceRepository::<DebondingDelegationSeq>::new(client.clone());
        let account_aggs = MongoAccountAggRepository::new(client.clone());
        let validator_aggs = MongoValidatorAggRepository::new(client.clone());
        let system_events = MongoSystemEventRepository::new(client);

        syncables.create_indexes().await?;
        reports.create_indexes().await?;
        block_seqs.create_indexes().await?;
        validator_seqs.create_indexes().await?;
        transaction_seqs.create_indexes().await?;
        staking_seqs.create_indexes().await?;
        delegation_seqs.create_indexes().await?;
        debonding_delegation_seqs.create_indexes().await?;
        account_aggs.create_indexes().await?;
        validator_aggs.create_indexes().await?;
        system_events.create_indexes().await?;
        info!(database = %config.database_name, "MongoDB indexes ensured");

        Ok(Self {
            syncables: Arc::new(syncables),
            reports: Arc::new(reports),
            block_seqs: Arc::new(block_seqs),
            validator_seqs: Arc::new(validator_seqs),
            transaction_seqs: Arc::new(transaction_seqs),
            staking_seqs: Arc::new(staking_seqs),
            delegation_seqs: Arc::new(delegation_seqs),
            debonding_delegation_seqs: Arc::new(debonding_delegation_seqs),
            account_aggs: Arc::new(account_aggs),
            validator_aggs: Arc::new(validator_aggs),
            system_events: Arc::new(system_events),
        })
    }
}
