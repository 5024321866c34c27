use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::client::database::repository::SyncableRepository;
use crate::core::client::database::OptionalExt;
use crate::error::TaskResult;
use crate::pipeline::payload::Payload;
use crate::pipeline::task::{Task, TaskId, TaskOutput};
use crate::types::syncable::Syncable;

/// Creates the syncable of the height, or hands the existing one to the current run.
///
/// Either way the stored syncable is left unprocessed until the sink commits the height.
pub struct MainSyncer {
    syncables: Arc<dyn SyncableRepository>,
}

impl MainSyncer {
    pub fn new(syncables: Arc<dyn SyncableRepository>) -> Self {
        Self { syncables }
    }
}

#[async_trait]
impl Task for MainSyncer {
    fn id(&self) -> TaskId {
        TaskId::MainSyncer
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let meta = payload.height_meta()?;
        let height = payload.current_height;

        let syncable = match self.syncables.find_by_height(height).await.optional()? {
            None => {
                let syncable =
                    Syncable::new(height, meta.time, meta.app_version, payload.index_version, payload.report_id);
                debug!(height, "Creating syncable");
                self.syncables.create(syncable).await?
            }
            Some(mut syncable) => {
                debug!(height, previous_report_id = %syncable.report_id, "Restarting syncable");
                syncable.restart(payload.report_id, meta.time, meta.app_version);
                self.syncables.save(syncable).await?
            }
        };
        Ok(TaskOutput::Syncable(syncable))
    }
}
