use async_trait::async_trait;

use crate::core::client::database::error::DatabaseError;
use crate::types::aggregate::{AccountAgg, ValidatorAgg};

#[async_trait]
pub trait AccountAggRepository: Send + Sync {
    async fn find_by_public_key(&self, public_key: &str) -> Result<AccountAgg, DatabaseError>;

    /// Inserts or replaces the aggregate of `agg.public_key`.
    async fn create_or_update(&self, agg: AccountAgg) -> Result<AccountAgg, DatabaseError>;

    async fn save(&self, agg: AccountAgg) -> Result<AccountAgg, DatabaseError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ValidatorAggRepository: Send + Sync {
    async fn find_by_entity_uid(&self, entity_uid: &str) -> Result<ValidatorAgg, DatabaseError>;

    /// Inserts or replaces the aggregate of `agg.entity_uid`.
    async fn create_or_update(&self, agg: ValidatorAgg) -> Result<ValidatorAgg, DatabaseError>;

    async fn save(&self, agg: ValidatorAgg) -> Result<ValidatorAgg, DatabaseError>;
}
