use async_trait::async_trait;

use crate::core::client::database::error::DatabaseError;
use crate::types::event::SystemEvent;
use crate::types::Height;

#[async_trait]
pub trait SystemEventRepository: Send + Sync {
    async fn find_by_height(&self, height: Height) -> Result<Vec<SystemEvent>, DatabaseError>;

    /// Every event of the actor, most recent height first.
    async fn find_by_actor(&self, actor: &str) -> Result<Vec<SystemEvent>, DatabaseError>;

    /// Upsert keyed by `(height, actor, kind)`.
    async fn create_or_update(&self, event: SystemEvent) -> Result<SystemEvent, DatabaseError>;
}
