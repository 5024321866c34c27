use std::fmt::Debug;

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use num_traits::Signed;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::types::error::ValidationError;
use crate::types::Height;

/// A per-height fact. `(height, key)` is unique in the store.
pub trait Sequence: Serialize + DeserializeOwned + Debug + Clone + PartialEq + Send + Sync + Unpin + 'static {
    /// Natural key of the fact within one height.
    type Key: Ord + Clone + Debug + Send + Sync;

    const NAME: &'static str;

    fn height(&self) -> Height;
    fn key(&self) -> Self::Key;
    fn validate(&self) -> Result<(), ValidationError>;
}

fn non_empty(record: &'static str, height: Height, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField { record, height, field });
    }
    Ok(())
}

fn non_negative(
    record: &'static str,
    height: Height,
    field: &'static str,
    value: &BigInt,
) -> Result<(), ValidationError> {
    if value.is_negative() {
        return Err(ValidationError::NegativeAmount { record, height, field, value: value.to_string() });
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockSeq {
    pub height: Height,
    pub time: DateTime<Utc>,
    pub app_version: u64,
    pub hash: String,
    pub proposer_entity_uid: String,
    pub transactions_count: u64,
}

impl Sequence for BlockSeq {
    type Key = ();
    const NAME: &'static str = "block_seq";

    fn height(&self) -> Height {
        self.height
    }

    fn key(&self) -> Self::Key {}

    fn validate(&self) -> Result<(), ValidationError> {
        non_empty(Self::NAME, self.height, "hash", &self.hash)?;
        non_empty(Self::NAME, self.height, "proposer_entity_uid", &self.proposer_entity_uid)
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSeq {
    pub height: Height,
    pub time: DateTime<Utc>,
    pub entity_uid: String,
    pub node_uid: String,
    /// consensus address, used to match the validator against commit votes and across heights
    pub address: String,
    pub voting_power: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub total_shares: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub active_escrow_balance: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub commission: BigInt,
    /// `None` when the validator had no slot in the last commit
    pub precommit_validated: Option<bool>,
    pub proposed: bool,
}

impl ValidatorSeq {
    /// Only an explicit absent or nil vote is a miss.
    pub fn missed(&self) -> bool {
        self.precommit_validated == Some(false)
    }
}

impl Sequence for ValidatorSeq {
    type Key = String;
    const NAME: &'static str = "validator_seq";

    fn height(&self) -> Height {
        self.height
    }

    fn key(&self) -> Self::Key {
        self.entity_uid.clone()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        non_empty(Self::NAME, self.height, "entity_uid", &self.entity_uid)?;
        non_empty(Self::NAME, self.height, "address", &self.address)?;
        non_negative(Self::NAME, self.height, "total_shares", &self.total_shares)?;
        non_negative(Self::NAME, self.height, "active_escrow_balance", &self.active_escrow_balance)?;
        non_negative(Self::NAME, self.height, "commission", &self.commission)
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransactionSeq {
    pub height: Height,
    pub time: DateTime<Utc>,
    pub hash: String,
    pub public_key: String,
    pub nonce: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub fee: BigInt,
    pub gas_limit: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub gas_price: BigInt,
    pub method: String,
}

impl Sequence for TransactionSeq {
    type Key = String;
    const NAME: &'static str = "transaction_seq";

    fn height(&self) -> Height {
        self.height
    }

    fn key(&self) -> Self::Key {
        self.hash.clone()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        non_empty(Self::NAME, self.height, "hash", &self.hash)?;
        non_empty(Self::NAME, self.height, "public_key", &self.public_key)?;
        non_negative(Self::NAME, self.height, "fee", &self.fee)?;
        non_negative(Self::NAME, self.height, "gas_price", &self.gas_price)
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StakingSeq {
    pub height: Height,
    pub time: DateTime<Utc>,
    #[serde_as(as = "DisplayFromStr")]
    pub total_supply: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub common_pool: BigInt,
    pub debonding_interval: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub min_delegation_amount: BigInt,
}

impl Sequence for StakingSeq {
    type Key = ();
    const NAME: &'static str = "staking_seq";

    fn height(&self) -> Height {
        self.height
    }

    fn key(&self) -> Self::Key {}

    fn validate(&self) -> Result<(), ValidationError> {
        non_negative(Self::NAME, self.height, "total_supply", &self.total_supply)?;
        non_negative(Self::NAME, self.height, "common_pool", &self.common_pool)?;
        non_negative(Self::NAME, self.height, "min_delegation_amount", &self.min_delegation_amount)
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DelegationSeq {
    pub height: Height,
    pub time: DateTime<Utc>,
    pub validator_uid: String,
    pub delegator_uid: String,
    #[serde_as(as = "DisplayFromStr")]
    pub shares: BigInt,
}

impl Sequence for DelegationSeq {
    type Key = (String, String);
    const NAME: &'static str = "delegation_seq";

    fn height(&self) -> Height {
        self.height
    }

    fn key(&self) -> Self::Key {
        (self.validator_uid.clone(), self.delegator_uid.clone())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        non_empty(Self::NAME, self.height, "validator_uid", &self.validator_uid)?;
        non_empty(Self::NAME, self.height, "delegator_uid", &self.delegator_uid)?;
        non_negative(Self::NAME, self.height, "shares", &self.shares)
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DebondingDelegationSeq {
    pub height: Height,
    pub time: DateTime<Utc>,
    pub validator_uid: String,
    pub delegator_uid: String,
    #[serde_as(as = "DisplayFromStr")]
    pub shares: BigInt,
    /// epoch at which the debonding completes
    pub debond_end: u64,
}

impl Sequence for DebondingDelegationSeq {
    type Key = (String, String, u64);
    const NAME: &'static str = "debonding_delegation_seq";

    fn height(&self) -> Height {
        self.height
    }

    fn key(&self) -> Self::Key {
        (self.validator_uid.clone(), self.delegator_uid.clone(), self.debond_end)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        non_empty(Self::NAME, self.height, "validator_uid", &self.validator_uid)?;
        non_empty(Self::NAME, self.height, "delegator_uid", &self.delegator_uid)?;
        non_negative(Self::NAME, self.height, "shares", &self.shares)
    }
}

/// Result of reconciling freshly computed sequences against the rows already persisted for a height.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<T> {
    pub new: Vec<T>,
    pub updated: Vec<T>,
    pub unchanged: Vec<T>,
}

impl<T> Default for Reconciled<T> {
    fn default() -> Self {
        Self { new: Vec::new(), updated: Vec::new(), unchanged: Vec::new() }
    }
}

impl<T: Sequence> Reconciled<T> {
    /// Splits `computed` into rows missing from `persisted`, rows whose persisted content differs and rows
    /// that are already stored as computed.
    pub fn from_rows(computed: Vec<T>, persisted: &[T]) -> Self {
        let mut reconciled = Self::default();
        for row in computed {
            match persisted.iter().find(|p| p.key() == row.key()) {
                None => reconciled.new.push(row),
                Some(existing) if *existing != row => reconciled.updated.push(row),
                Some(_) => reconciled.unchanged.push(row),
            }
        }
        reconciled
    }

    /// Every row of the height after reconciliation.
    pub fn all(&self) -> impl Iterator<Item = &T> {
        self.new.iter().chain(self.updated.iter()).chain(self.unchanged.iter())
    }

    /// Rows that need a write.
    pub fn pending(&self) -> impl Iterator<Item = &T> {
        self.new.iter().chain(self.updated.iter())
    }

    pub fn has_pending(&self) -> bool {
        !self.new.is_empty() || !self.updated.is_empty()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pending().try_for_each(Sequence::validate)
    }
}
