use async_trait::async_trait;

use crate::core::client::database::error::DatabaseError;
use crate::types::syncable::Syncable;
use crate::types::{Height, VersionId};

/// Store contract of the per-height processing records.
///
/// Every `find_*` returns [`DatabaseError::NotFound`] when no row matches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncableRepository: Send + Sync {
    async fn find_by_height(&self, height: Height) -> Result<Syncable, DatabaseError>;

    /// Syncable with the highest height.
    async fn find_most_recent(&self) -> Result<Syncable, DatabaseError>;

    /// Lowest index version among stored syncables.
    async fn find_smallest_index_version(&self) -> Result<VersionId, DatabaseError>;

    /// Lowest height whose index version differs from `index_version`.
    async fn find_first_by_different_index_version(&self, index_version: VersionId)
        -> Result<Syncable, DatabaseError>;

    /// Highest height whose index version differs from `index_version`.
    async fn find_most_recent_by_different_index_version(
        &self,
        index_version: VersionId,
    ) -> Result<Syncable, DatabaseError>;

    /// Fails with [`DatabaseError::ItemAlreadyExists`] if the height is already stored.
    async fn create(&self, syncable: Syncable) -> Result<Syncable, DatabaseError>;

    /// Fails with [`DatabaseError::NotFound`] if the height is not stored yet.
    async fn save(&self, syncable: Syncable) -> Result<Syncable, DatabaseError>;

    /// Atomic per height.
    async fn create_or_update(&self, syncable: Syncable) -> Result<Syncable, DatabaseError>;
}
