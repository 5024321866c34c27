use std::sync::Arc;

use tracing::debug;

use crate::core::client::database::repository::SyncableRepository;
use crate::error::{IndexerError, IndexerResult};
use crate::pipeline::payload::Payload;
use crate::types::VersionId;

/// Commits a height once every stage succeeded by marking its syncable processed.
pub struct Sink {
    syncables: Arc<dyn SyncableRepository>,
    /// version written on committed heights; `None` keeps the version already stored
    index_version: Option<VersionId>,
}

impl Sink {
    pub fn new(syncables: Arc<dyn SyncableRepository>, index_version: Option<VersionId>) -> Self {
        Self { syncables, index_version }
    }

    pub async fn consume(&self, payload: &Payload) -> IndexerResult<()> {
        let Some(mut syncable) = payload.syncable.clone() else {
            return Err(IndexerError::MissingSyncable(payload.current_height));
        };
        let version = self.index_version.unwrap_or(syncable.index_version);
        syncable.mark_processed(version);

        self.syncables.save(syncable).await?;
        debug!(height = payload.current_height, index_version = version, "Height committed");
        Ok(())
    }
}
