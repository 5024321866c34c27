use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::DatabaseError;
use super::repository::{
    AccountAggRepository, ReportRepository, SequenceRepository, SyncableRepository, SystemEventRepository,
    ValidatorAggRepository, ValidatorSeqRepository,
};
use crate::types::aggregate::{AccountAgg, ValidatorAgg};
use crate::types::event::{SystemEvent, SystemEventKind};
use crate::types::report::{Report, ReportKind};
use crate::types::sequence::{Sequence, ValidatorSeq};
use crate::types::syncable::Syncable;
use crate::types::{Height, VersionId};

/// Process-local store backing `--database memory` runs and the test suite.
///
/// Each repository guards its rows with a single lock, so create-or-update is atomic per key.
#[derive(Default)]
pub struct MemorySyncableRepository {
    rows: RwLock<BTreeMap<Height, Syncable>>,
}

#[async_trait]
impl SyncableRepository for MemorySyncableRepository {
    async fn find_by_height(&self, height: Height) -> Result<Syncable, DatabaseError> {
        self.rows
            .read()
            .await
            .get(&height)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found(format!("syncable at height {}", height)))
    }

    async fn find_most_recent(&self) -> Result<Syncable, DatabaseError> {
        self.rows
            .read()
            .await
            .values()
            .next_back()
            .cloned()
            .ok_or_else(|| DatabaseError::not_found("most recent syncable"))
    }

    async fn find_smallest_index_version(&self) -> Result<VersionId, DatabaseError> {
        self.rows
            .read()
            .await
            .values()
            .map(|s| s.index_version)
            .min()
            .ok_or_else(|| DatabaseError::not_found("smallest index version"))
    }

    async fn find_first_by_different_index_version(
        &self,
        index_version: VersionId,
    ) -> Result<Syncable, DatabaseError> {
        self.rows
            .read()
            .await
            .values()
            .find(|s| s.index_version != index_version)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found(format!("syncable with index version other than {index_version}")))
    }

    async fn find_most_recent_by_different_index_version(
        &self,
        index_version: VersionId,
    ) -> Result<Syncable, DatabaseError> {
        self.rows
            .read()
            .await
            .values()
            .rev()
            .find(|s| s.index_version != index_version)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found(format!("syncable with index version other than {index_version}")))
    }

    async fn create(&self, syncable: Syncable) -> Result<Syncable, DatabaseError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&syncable.height) {
            return Err(DatabaseError::ItemAlreadyExists(format!("syncable at height {}", syncable.height)));
        }
        rows.insert(syncable.height, syncable.clone());
        Ok(syncable)
    }

    async fn save(&self, syncable: Syncable) -> Result<Syncable, DatabaseError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&syncable.height) {
            Some(row) => {
                *row = syncable.clone();
                Ok(syncable)
            }
            None => Err(DatabaseError::not_found(format!("syncable at height {}", syncable.height))),
        }
    }

    async fn create_or_update(&self, syncable: Syncable) -> Result<Syncable, DatabaseError> {
        self.rows.write().await.insert(syncable.height, syncable.clone());
        Ok(syncable)
    }
}

#[derive(Default)]
pub struct MemoryReportRepository {
    rows: RwLock<HashMap<Uuid, Report>>,
}

#[async_trait]
impl ReportRepository for MemoryReportRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Report, DatabaseError> {
        self.rows.read().await.get(&id).cloned().ok_or_else(|| DatabaseError::not_found(format!("report {}", id)))
    }

    async fn find_not_completed(&self, kind: ReportKind) -> Result<Vec<Report>, DatabaseError> {
        let mut reports: Vec<Report> =
            self.rows.read().await.values().filter(|r| r.kind == kind && !r.is_completed()).cloned().collect();
        reports.sort_by_key(|r| r.created_at);
        Ok(reports)
    }

    async fn create(&self, report: Report) -> Result<Report, DatabaseError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&report.id) {
            return Err(DatabaseError::ItemAlreadyExists(format!("report {}", report.id)));
        }
        rows.insert(report.id, report.clone());
        Ok(report)
    }

    async fn save(&self, report: Report) -> Result<Report, DatabaseError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&report.id) {
            Some(row) => {
                *row = report.clone();
                Ok(report)
            }
            None => Err(DatabaseError::not_found(format!("report {}", report.id))),
        }
    }
}

/// Rows grouped by height, then by natural key.
pub struct MemorySequenceRepository<T: Sequence> {
    rows: RwLock<BTreeMap<Height, BTreeMap<T::Key, T>>>,
}

impl<T: Sequence> Default for MemorySequenceRepository<T> {
    fn default() -> Self {
        Self { rows: RwLock::new(BTreeMap::new()) }
    }
}

#[async_trait]
impl<T: Sequence> SequenceRepository<T> for MemorySequenceRepository<T> {
    async fn find_by_height(&self, height: Height) -> Result<Vec<T>, DatabaseError> {
        Ok(self.rows.read().await.get(&height).map(|rows| rows.values().cloned().collect()).unwrap_or_default())
    }

    async fn create_many(&self, rows: Vec<T>) -> Result<(), DatabaseError> {
        let mut stored = self.rows.write().await;
        for row in &rows {
            let exists = stored.get(&row.height()).is_some_and(|r| r.contains_key(&row.key()));
            if exists {
                return Err(DatabaseError::ItemAlreadyExists(format!(
                    "{} at height {} with key {:?}",
                    T::NAME,
                    row.height(),
                    row.key()
                )));
            }
        }
        for row in rows {
            stored.entry(row.height()).or_default().insert(row.key(), row);
        }
        Ok(())
    }

    async fn save(&self, row: T) -> Result<(), DatabaseError> {
        let mut stored = self.rows.write().await;
        match stored.get_mut(&row.height()).and_then(|r| r.get_mut(&row.key())) {
            Some(existing) => {
                *existing = row;
                Ok(())
            }
            None => Err(DatabaseError::not_found(format!("{} at height {} {:?}", T::NAME, row.height(), row.key()))),
        }
    }
}

#[async_trait]
impl ValidatorSeqRepository for MemorySequenceRepository<ValidatorSeq> {
    async fn find_last_by_address(
        &self,
        address: &str,
        before_height: Height,
        limit: u64,
    ) -> Result<Vec<ValidatorSeq>, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(rows
            .range(..before_height)
            .rev()
            .flat_map(|(_, by_key)| by_key.values().filter(|s| s.address == address))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryAccountAggRepository {
    rows: RwLock<HashMap<String, AccountAgg>>,
}

#[async_trait]
impl AccountAggRepository for MemoryAccountAggRepository {
    async fn find_by_public_key(&self, public_key: &str) -> Result<AccountAgg, DatabaseError> {
        self.rows
            .read()
            .await
            .get(public_key)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found(format!("account agg {}", public_key)))
    }

    async fn create_or_update(&self, agg: AccountAgg) -> Result<AccountAgg, DatabaseError> {
        self.rows.write().await.insert(agg.public_key.clone(), agg.clone());
        Ok(agg)
    }

    async fn save(&self, agg: AccountAgg) -> Result<AccountAgg, DatabaseError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&agg.public_key) {
            Some(row) => {
                *row = agg.clone();
                Ok(agg)
            }
            None => Err(DatabaseError::not_found(format!("account agg {}", agg.public_key))),
        }
    }
}

#[derive(Default)]
pub struct MemoryValidatorAggRepository {
    rows: RwLock<HashMap<String, ValidatorAgg>>,
}

#[async_trait]
impl ValidatorAggRepository for MemoryValidatorAggRepository {
    async fn find_by_entity_uid(&self, entity_uid: &str) -> Result<ValidatorAgg, DatabaseError> {
        self.rows
            .read()
            .await
            .get(entity_uid)
            .cloned()
            .ok_or_else(|| DatabaseError::not_found(format!("validator agg {}", entity_uid)))
    }

    async fn create_or_update(&self, agg: ValidatorAgg) -> Result<ValidatorAgg, DatabaseError> {
        self.rows.write().await.insert(agg.entity_uid.clone(), agg.clone());
        Ok(agg)
    }

    async fn save(&self, agg: ValidatorAgg) -> Result<ValidatorAgg, DatabaseError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&agg.entity_uid) {
            Some(row) => {
                *row = agg.clone();
                Ok(agg)
            }
            None => Err(DatabaseError::not_found(format!("validator agg {}", agg.entity_uid))),
        }
    }
}

#[derive(Default)]
pub struct MemorySystemEventRepository {
    rows: RwLock<BTreeMap<(Height, String, SystemEventKind), SystemEvent>>,
}

#[async_trait]
impl SystemEventRepository for MemorySystemEventRepository {
    async fn find_by_height(&self, height: Height) -> Result<Vec<SystemEvent>, DatabaseError> {
        Ok(self.rows.read().await.values().filter(|e| e.height == height).cloned().collect())
    }

    async fn find_by_actor(&self, actor: &str) -> Result<Vec<SystemEvent>, DatabaseError> {
        Ok(self.rows.read().await.values().rev().filter(|e| e.actor == actor).cloned().collect())
    }

    async fn create_or_update(&self, event: SystemEvent) -> Result<SystemEvent, DatabaseError> {
        self.rows.write().await.insert(event.key(), event.clone());
        Ok(event)
    }
}
