use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Height, VersionId};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SyncableStatus {
    /// A pipeline run picked the height up and has not finished it yet
    Running,
    /// Every stage succeeded and the sink committed the height
    Processed,
}

/// Per-height processing record.
///
/// `processed_at` stays `None` while a run works on the height and is set by the sink once every stage
/// succeeded. A most-recent syncable with `processed_at == None` is how a crashed run is detected.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Syncable {
    pub height: Height,
    /// block time of the height
    pub time: DateTime<Utc>,
    pub app_version: u64,
    /// version of the task set that produced the derived facts of this height
    pub index_version: VersionId,
    pub status: SyncableStatus,
    /// report of the run that last touched this height
    pub report_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Syncable {
    pub fn new(
        height: Height,
        time: DateTime<Utc>,
        app_version: u64,
        index_version: VersionId,
        report_id: Uuid,
    ) -> Self {
        Self {
            height,
            time,
            app_version,
            index_version,
            status: SyncableStatus::Running,
            report_id,
            started_at: Utc::now().round_subsecs(0),
            processed_at: None,
        }
    }

    /// Hands an existing syncable to a new run. The previous processed marker is cleared so that an
    /// interrupted re-run is still visible as unprocessed.
    pub fn restart(&mut self, report_id: Uuid, time: DateTime<Utc>, app_version: u64) {
        self.report_id = report_id;
        self.time = time;
        self.app_version = app_version;
        self.status = SyncableStatus::Running;
        self.started_at = Utc::now().round_subsecs(0);
        self.processed_at = None;
    }

    pub fn mark_processed(&mut self, index_version: VersionId) {
        self.index_version = index_version;
        self.status = SyncableStatus::Processed;
        self.processed_at = Some(Utc::now().round_subsecs(0));
    }

    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }
}
