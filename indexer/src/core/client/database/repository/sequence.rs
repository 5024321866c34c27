use async_trait::async_trait;

use crate::core::client::database::error::DatabaseError;
use crate::types::sequence::{Sequence, ValidatorSeq};
use crate::types::Height;

/// Store contract shared by every per-height fact.
#[async_trait]
pub trait SequenceRepository<T: Sequence>: Send + Sync {
    /// Every row of the height, ordered by natural key. Empty when the height has none.
    async fn find_by_height(&self, height: Height) -> Result<Vec<T>, DatabaseError>;

    /// Inserts all rows or none. Fails with [`DatabaseError::ItemAlreadyExists`] when one of the
    /// `(height, key)` pairs is already stored.
    async fn create_many(&self, rows: Vec<T>) -> Result<(), DatabaseError>;

    /// Replaces the stored row with the same `(height, key)`.
    async fn save(&self, row: T) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait ValidatorSeqRepository: SequenceRepository<ValidatorSeq> {
    /// Up to `limit` sequences of the validator strictly below `before_height`, most recent first.
    async fn find_last_by_address(
        &self,
        address: &str,
        before_height: Height,
        limit: u64,
    ) -> Result<Vec<ValidatorSeq>, DatabaseError>;
}
