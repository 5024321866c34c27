use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{self, doc, Document};
use mongodb::options::FindOptions;
use tracing::debug;
use uuid::Uuid;

use super::constant::{
    ACCOUNT_AGGS_COLLECTION, BLOCK_SEQS_COLLECTION, DEBONDING_DELEGATION_SEQS_COLLECTION, DELEGATION_SEQS_COLLECTION,
    REPORTS_COLLECTION, STAKING_SEQS_COLLECTION, SYNCABLES_COLLECTION, SYSTEM_EVENTS_COLLECTION,
    TRANSACTION_SEQS_COLLECTION, VALIDATOR_AGGS_COLLECTION, VALIDATOR_SEQS_COLLECTION,
};
use super::error::DatabaseError;
use super::mongo_client::MongoClient;
use super::repository::{
    AccountAggRepository, ReportRepository, SequenceRepository, SyncableRepository, SystemEventRepository,
    ValidatorAggRepository, ValidatorSeqRepository,
};
use crate::types::aggregate::{AccountAgg, ValidatorAgg};
use crate::types::event::SystemEvent;
use crate::types::report::{Report, ReportKind};
use crate::types::sequence::{
    BlockSeq, DebondingDelegationSeq, DelegationSeq, Sequence, StakingSeq, TransactionSeq, ValidatorSeq,
};
use crate::types::syncable::Syncable;
use crate::types::{Height, VersionId};

pub struct MongoSyncableRepository {
    client: Arc<MongoClient>,
}

impl MongoSyncableRepository {
    pub fn new(client: Arc<MongoClient>) -> Self {
        Self { client }
    }

    pub async fn create_indexes(&self) -> Result<(), DatabaseError> {
        self.client.create_unique_index(SYNCABLES_COLLECTION, doc! { "height": 1 }).await?;
        self.client.create_index(SYNCABLES_COLLECTION, doc! { "index_version": 1, "height": 1 }).await
    }

    async fn find_sorted(&self, filter: Document, sort: Document, what: &str) -> Result<Syncable, DatabaseError> {
        self.client
            .find_first::<Syncable>(SYNCABLES_COLLECTION, filter, sort)
            .await?
            .ok_or_else(|| DatabaseError::not_found(what))
    }
}

#[async_trait]
impl SyncableRepository for MongoSyncableRepository {
    async fn find_by_height(&self, height: Height) -> Result<Syncable, DatabaseError> {
        self.client
            .find_one::<Syncable>(SYNCABLES_COLLECTION, doc! { "height": bson::to_bson(&height)? }, None)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("syncable at height {}", height)))
    }

    async fn find_most_recent(&self) -> Result<Syncable, DatabaseError> {
        self.find_sorted(doc! {}, doc! { "height": -1 }, "most recent syncable").await
    }

    async fn find_smallest_index_version(&self) -> Result<VersionId, DatabaseError> {
        let syncable = self.find_sorted(doc! {}, doc! { "index_version": 1 }, "smallest index version").await?;
        Ok(syncable.index_version)
    }

    async fn find_first_by_different_index_version(
        &self,
        index_version: VersionId,
    ) -> Result<Syncable, DatabaseError> {
        let filter = doc! { "index_version": { "$ne": bson::to_bson(&index_version)? } };
        self.find_sorted(filter, doc! { "height": 1 }, "syncable with a different index version").await
    }

    async fn find_most_recent_by_different_index_version(
        &self,
        index_version: VersionId,
    ) -> Result<Syncable, DatabaseError> {
        let filter = doc! { "index_version": { "$ne": bson::to_bson(&index_version)? } };
        self.find_sorted(filter, doc! { "height": -1 }, "syncable with a different index version").await
    }

    async fn create(&self, syncable: Syncable) -> Result<Syncable, DatabaseError> {
        self.client.insert_one(SYNCABLES_COLLECTION, &syncable).await?;
        debug!(height = syncable.height, "Syncable created");
        Ok(syncable)
    }

    async fn save(&self, syncable: Syncable) -> Result<Syncable, DatabaseError> {
        let filter = doc! { "height": bson::to_bson(&syncable.height)? };
        let matched = self.client.replace_one(SYNCABLES_COLLECTION, filter, &syncable, false).await?;
        if matched == 0 {
            return Err(DatabaseError::not_found(format!("syncable at height {}", syncable.height)));
        }
        Ok(syncable)
    }

    async fn create_or_update(&self, syncable: Syncable) -> Result<Syncable, DatabaseError> {
        let filter = doc! { "height": bson::to_bson(&syncable.height)? };
        self.client.replace_one(SYNCABLES_COLLECTION, filter, &syncable, true).await?;
        Ok(syncable)
    }
}

pub struct MongoReportRepository {
    client: Arc<MongoClient>,
}

impl MongoReportRepository {
    pub fn new(client: Arc<MongoClient>) -> Self {
        Self { client }
    }

    pub async fn create_indexes(&self) -> Result<(), DatabaseError> {
        self.client.create_unique_index(REPORTS_COLLECTION, doc! { "id": 1 }).await?;
        self.client.create_index(REPORTS_COLLECTION, doc! { "kind": 1, "completed_at": 1 }).await
    }

    fn id_filter(id: &Uuid) -> Result<Document, DatabaseError> {
        Ok(doc! { "id": bson::to_bson(id)? })
    }
}

#[async_trait]
impl ReportRepository for MongoReportRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Report, DatabaseError> {
        self.client
            .find_one::<Report>(REPORTS_COLLECTION, Self::id_filter(&id)?, None)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("report {}", id)))
    }

    async fn find_not_completed(&self, kind: ReportKind) -> Result<Vec<Report>, DatabaseError> {
        let filter = doc! { "kind": bson::to_bson(&kind)?, "completed_at": null };
        let options = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        self.client.find_many(REPORTS_COLLECTION, filter, Some(options)).await
    }

    async fn create(&self, report: Report) -> Result<Report, DatabaseError> {
        self.client.insert_one(REPORTS_COLLECTION, &report).await?;
        debug!(report_id = %report.id, kind = %report.kind, "Report created");
        Ok(report)
    }

    async fn save(&self, report: Report) -> Result<Report, DatabaseError> {
        let matched = self.client.replace_one(REPORTS_COLLECTION, Self::id_filter(&report.id)?, &report, false).await?;
        if matched == 0 {
            return Err(DatabaseError::not_found(format!("report {}", report.id)));
        }
        Ok(report)
    }
}

/// Storage layout of a sequence: its collection and the fields forming its natural key.
pub trait MongoSequence: Sequence {
    const COLLECTION: &'static str;

    /// Key fields besides `height`.
    const KEY_FIELDS: &'static [&'static str];

    fn key_filter(&self) -> Result<Document, DatabaseError>;
}

fn key_filter(height: Height, fields: &[(&str, bson::Bson)]) -> Result<Document, DatabaseError> {
    let mut filter = doc! { "height": bson::to_bson(&height)? };
    for (name, value) in fields {
        filter.insert(*name, value.clone());
    }
    Ok(filter)
}

impl MongoSequence for BlockSeq {
    const COLLECTION: &'static str = BLOCK_SEQS_COLLECTION;
    const KEY_FIELDS: &'static [&'static str] = &[];

    fn key_filter(&self) -> Result<Document, DatabaseError> {
        key_filter(self.height, &[])
    }
}

impl MongoSequence for ValidatorSeq {
    const COLLECTION: &'static str = VALIDATOR_SEQS_COLLECTION;
    const KEY_FIELDS: &'static [&'static str] = &["entity_uid"];

    fn key_filter(&self) -> Result<Document, DatabaseError> {
        key_filter(self.height, &[("entity_uid", self.entity_uid.clone().into())])
    }
}

impl MongoSequence for TransactionSeq {
    const COLLECTION: &'static str = TRANSACTION_SEQS_COLLECTION;
    const KEY_FIELDS: &'static [&'static str] = &["hash"];

    fn key_filter(&self) -> Result<Document, DatabaseError> {
        key_filter(self.height, &[("hash", self.hash.clone().into())])
    }
}

impl MongoSequence for StakingSeq {
    const COLLECTION: &'static str = STAKING_SEQS_COLLECTION;
    const KEY_FIELDS: &'static [&'static str] = &[];

    fn key_filter(&self) -> Result<Document, DatabaseError> {
        key_filter(self.height, &[])
    }
}

impl MongoSequence for DelegationSeq {
    const COLLECTION: &'static str = DELEGATION_SEQS_COLLECTION;
    const KEY_FIELDS: &'static [&'static str] = &["validator_uid", "delegator_uid"];

    fn key_filter(&self) -> Result<Document, DatabaseError> {
        key_filter(
            self.height,
            &[
                ("validator_uid", self.validator_uid.clone().into()),
                ("delegator_uid", self.delegator_uid.clone().into()),
            ],
        )
    }
}

impl MongoSequence for DebondingDelegationSeq {
    const COLLECTION: &'static str = DEBONDING_DELEGATION_SEQS_COLLECTION;
    const KEY_FIELDS: &'static [&'static str] = &["validator_uid", "delegator_uid", "debond_end"];

    fn key_filter(&self) -> Result<Document, DatabaseError> {
        key_filter(
            self.height,
            &[
                ("validator_uid", self.validator_uid.clone().into()),
                ("delegator_uid", self.delegator_uid.clone().into()),
                ("debond_end", bson::to_bson(&self.debond_end)?),
            ],
        )
    }
}

pub struct MongoSequenceRepository<T> {
    client: Arc<MongoClient>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: MongoSequence> MongoSequenceRepository<T> {
    pub fn new(client: Arc<MongoClient>) -> Self {
        Self { client, _marker: PhantomData }
    }

    pub async fn create_indexes(&self) -> Result<(), DatabaseError> {
        let mut keys = doc! { "height": 1 };
        for field in T::KEY_FIELDS {
            keys.insert(*field, 1);
        }
        self.client.create_unique_index(T::COLLECTION, keys).await
    }
}

#[async_trait]
impl<T: MongoSequence> SequenceRepository<T> for MongoSequenceRepository<T> {
    async fn find_by_height(&self, height: Height) -> Result<Vec<T>, DatabaseError> {
        let mut sort = doc! {};
        for field in T::KEY_FIELDS {
            sort.insert(*field, 1);
        }
        let options = FindOptions::builder().sort(sort).build();
        self.client.find_many(T::COLLECTION, doc! { "height": bson::to_bson(&height)? }, Some(options)).await
    }

    async fn create_many(&self, rows: Vec<T>) -> Result<(), DatabaseError> {
        self.client.insert_many(T::COLLECTION, &rows).await?;
        debug!(collection = T::COLLECTION, count = rows.len(), "Sequences created");
        Ok(())
    }

    async fn save(&self, row: T) -> Result<(), DatabaseError> {
        let matched = self.client.replace_one(T::COLLECTION, row.key_filter()?, &row, false).await?;
        if matched == 0 {
            return Err(DatabaseError::not_found(format!("{} at height {}", T::NAME, row.height())));
        }
        Ok(())
    }
}

#[async_trait]
impl ValidatorSeqRepository for MongoSequenceRepository<ValidatorSeq> {
    async fn find_last_by_address(
        &self,
        address: &str,
        before_height: Height,
        limit: u64,
    ) -> Result<Vec<ValidatorSeq>, DatabaseError> {
        let filter = doc! { "address": address, "height": { "$lt": bson::to_bson(&before_height)? } };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let options = FindOptions::builder().sort(doc! { "height": -1 }).limit(limit).build();
        self.client.find_many(VALIDATOR_SEQS_COLLECTION, filter, Some(options)).await
    }
}

pub struct MongoAccountAggRepository {
    client: Arc<MongoClient>,
}

impl MongoAccountAggRepository {
    pub fn new(client: Arc<MongoClient>) -> Self {
        Self { client }
    }

    pub async fn create_indexes(&self) -> Result<(), DatabaseError> {
        self.client.create_unique_index(ACCOUNT_AGGS_COLLECTION, doc! { "public_key": 1 }).await
    }
}

#[async_trait]
impl AccountAggRepository for MongoAccountAggRepository {
    async fn find_by_public_key(&self, public_key: &str) -> Result<AccountAgg, DatabaseError> {
        self.client
            .find_one::<AccountAgg>(ACCOUNT_AGGS_COLLECTION, doc! { "public_key": public_key }, None)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("account agg {}", public_key)))
    }

    async fn create_or_update(&self, agg: AccountAgg) -> Result<AccountAgg, DatabaseError> {
        let filter = doc! { "public_key": agg.public_key.as_str() };
        self.client.replace_one(ACCOUNT_AGGS_COLLECTION, filter, &agg, true).await?;
        Ok(agg)
    }

    async fn save(&self, agg: AccountAgg) -> Result<AccountAgg, DatabaseError> {
        let filter = doc! { "public_key": agg.public_key.as_str() };
        let matched = self.client.replace_one(ACCOUNT_AGGS_COLLECTION, filter, &agg, false).await?;
        if matched == 0 {
            return Err(DatabaseError::not_found(format!("account agg {}", agg.public_key)));
        }
        Ok(agg)
    }
}

pub struct MongoValidatorAggRepository {
    client: Arc<MongoClient>,
}

impl MongoValidatorAggRepository {
    pub fn new(client: Arc<MongoClient>) -> Self {
        Self { client }
    }

    pub async fn create_indexes(&self) -> Result<(), DatabaseError> {
        self.client.create_unique_index(VALIDATOR_AGGS_COLLECTION, doc! { "entity_uid": 1 }).await
    }
}

#[async_trait]
impl ValidatorAggRepository for MongoValidatorAggRepository {
    async fn find_by_entity_uid(&self, entity_uid: &str) -> Result<ValidatorAgg, DatabaseError> {
        self.client
            .find_one::<ValidatorAgg>(VALIDATOR_AGGS_COLLECTION, doc! { "entity_uid": entity_uid }, None)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("validator agg {}", entity_uid)))
    }

    async fn create_or_update(&self, agg: ValidatorAgg) -> Result<ValidatorAgg, DatabaseError> {
        let filter = doc! { "entity_uid": agg.entity_uid.as_str() };
        self.client.replace_one(VALIDATOR_AGGS_COLLECTION, filter, &agg, true).await?;
        Ok(agg)
    }

    async fn save(&self, agg: ValidatorAgg) -> Result<ValidatorAgg, DatabaseError> {
        let filter = doc! { "entity_uid": agg.entity_uid.as_str() };
        let matched = self.client.replace_one(VALIDATOR_AGGS_COLLECTION, filter, &agg, false).await?;
        if matched == 0 {
            return Err(DatabaseError::not_found(format!("validator agg {}", agg.entity_uid)));
        }
        Ok(agg)
    }
}

pub struct MongoSystemEventRepository {
    client: Arc<MongoClient>,
}

impl MongoSystemEventRepository {
    pub fn new(client: Arc<MongoClient>) -> Self {
        Self { client }
    }

    pub async fn create_indexes(&self) -> Result<(), DatabaseError> {
        self.client.create_unique_index(SYSTEM_EVENTS_COLLECTION, doc! { "height": 1, "actor": 1, "kind": 1 }).await?;
        self.client.create_index(SYSTEM_EVENTS_COLLECTION, doc! { "actor": 1, "height": -1 }).await
    }
}

#[async_trait]
impl SystemEventRepository for MongoSystemEventRepository {
    async fn find_by_height(&self, height: Height) -> Result<Vec<SystemEvent>, DatabaseError> {
        self.client.find_many(SYSTEM_EVENTS_COLLECTION, doc! { "height": bson::to_bson(&height)? }, None).await
    }

    async fn find_by_actor(&self, actor: &str) -> Result<Vec<SystemEvent>, DatabaseError> {
        let options = FindOptions::builder().sort(doc! { "height": -1 }).build();
        self.client.find_many(SYSTEM_EVENTS_COLLECTION, doc! { "actor": actor }, Some(options)).await
    }

    async fn create_or_update(&self, event: SystemEvent) -> Result<SystemEvent, DatabaseError> {
        let filter = doc! {
            "height": bson::to_bson(&event.height)?,
            "actor": event.actor.as_str(),
            "kind": bson::to_bson(&event.kind)?,
        };
        self.client.replace_one(SYSTEM_EVENTS_COLLECTION, filter, &event, true).await?;
        Ok(event)
    }
}
