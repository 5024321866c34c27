use async_trait::async_trait;
use uuid::Uuid;

use crate::core::client::database::error::DatabaseError;
use crate::types::report::{Report, ReportKind};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Report, DatabaseError>;

    /// Reports of runs that never completed, oldest first.
    async fn find_not_completed(&self, kind: ReportKind) -> Result<Vec<Report>, DatabaseError>;

    async fn create(&self, report: Report) -> Result<Report, DatabaseError>;

    async fn save(&self, report: Report) -> Result<Report, DatabaseError>;
}
