use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::client::ChainClient;
use crate::error::TaskResult;
use crate::pipeline::payload::Payload;
use crate::pipeline::task::{Task, TaskId, TaskOutput};

/// Fetches the time and app version of the height, which every later stage stamps its records with.
pub struct HeightMetaRetriever {
    client: Arc<dyn ChainClient>,
}

impl HeightMetaRetriever {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Task for HeightMetaRetriever {
    fn id(&self) -> TaskId {
        TaskId::HeightMetaRetriever
    }

    async fn run(&self, _cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let meta = self.client.get_meta_by_height(payload.current_height).await?;
        Ok(TaskOutput::HeightMeta(meta))
    }
}
