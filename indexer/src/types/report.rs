use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Height, VersionId};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum ReportKind {
    /// Live indexing of new heights
    Index,
    /// Re-running heights whose index version is older than the current one
    Backfill,
    /// Operator triggered replay of an explicit range
    Reindex,
}

/// Metadata of one pipeline run.
///
/// Created before the first height is processed and completed after the loop ends, whether it ended
/// successfully or not. `error_count` is the number of heights of the planned range that were not
/// committed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub id: Uuid,
    pub kind: ReportKind,
    pub index_version: VersionId,
    pub start_height: Height,
    pub end_height: Height,
    pub success_count: u64,
    pub error_count: u64,
    pub error_msg: Option<String>,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn new(kind: ReportKind, index_version: VersionId, start_height: Height, end_height: Height) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            index_version,
            start_height,
            end_height,
            success_count: 0,
            error_count: 0,
            error_msg: None,
            duration_ms: 0,
            created_at: Utc::now().round_subsecs(0),
            completed_at: None,
        }
    }

    /// Number of heights the run planned to process.
    pub fn total(&self) -> u64 {
        if self.end_height < self.start_height {
            return 0;
        }
        self.end_height - self.start_height + 1
    }

    pub fn complete(&mut self, success_count: u64, error_msg: Option<String>, duration_ms: u64) {
        self.success_count = success_count;
        self.error_count = self.total().saturating_sub(success_count);
        self.error_msg = error_msg;
        self.duration_ms = duration_ms;
        self.completed_at = Some(Utc::now().round_subsecs(0));
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_successful(&self) -> bool {
        self.is_completed() && self.error_msg.is_none()
    }
}
