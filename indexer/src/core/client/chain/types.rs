use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::types::Height;

/// Metadata needed before a height can be processed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HeightMeta {
    pub height: Height,
    pub time: DateTime<Utc>,
    pub app_version: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    /// Votes for the previous height; absent on the first height of the chain.
    #[serde(default)]
    pub last_commit: Option<LastCommit>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: Height,
    pub time: DateTime<Utc>,
    pub hash: String,
    /// consensus address of the proposer
    pub proposer_address: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LastCommit {
    pub height: Height,
    pub round: u32,
    #[serde(default)]
    pub votes: Vec<CommitVote>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommitVote {
    pub validator_address: String,
    pub block_id_flag: BlockIdFlag,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BlockIdFlag {
    Absent,
    Commit,
    Nil,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StakingState {
    pub height: Height,
    #[serde_as(as = "DisplayFromStr")]
    pub total_supply: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub common_pool: BigInt,
    pub parameters: StakingParameters,
    /// ledger accounts by address
    #[serde(default)]
    pub ledger: BTreeMap<String, Account>,
    /// validator address -> delegator address -> delegation
    #[serde(default)]
    pub delegations: BTreeMap<String, BTreeMap<String, Delegation>>,
    /// validator address -> delegator address -> pending debondings
    #[serde(default)]
    pub debonding_delegations: BTreeMap<String, BTreeMap<String, Vec<DebondingDelegation>>>,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StakingParameters {
    pub debonding_interval: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub min_delegation: BigInt,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Account {
    pub general: GeneralAccount,
    pub escrow: EscrowAccount,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneralAccount {
    #[serde_as(as = "DisplayFromStr")]
    pub balance: BigInt,
    pub nonce: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct EscrowAccount {
    pub active: SharePool,
    pub debonding: SharePool,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SharePool {
    #[serde_as(as = "DisplayFromStr")]
    pub balance: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub total_shares: BigInt,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    #[serde_as(as = "DisplayFromStr")]
    pub shares: BigInt,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DebondingDelegation {
    #[serde_as(as = "DisplayFromStr")]
    pub shares: BigInt,
    pub debond_end: u64,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    /// staking address of the entity operating the validator
    pub entity_id: String,
    pub node_id: String,
    /// consensus address
    pub address: String,
    pub voting_power: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub commission: BigInt,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
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
