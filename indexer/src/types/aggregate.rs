use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::types::error::ValidationError;
use crate::types::sequence::ValidatorSeq;
use crate::types::Height;

/// Latest known balances of one ledger account.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountAgg {
    pub public_key: String,
    pub started_at_height: Height,
    pub started_at: DateTime<Utc>,
    pub recent_at_height: Height,
    pub recent_at: DateTime<Utc>,
    #[serde_as(as = "DisplayFromStr")]
    pub recent_general_balance: BigInt,
    pub recent_nonce: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub recent_escrow_active_balance: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub recent_escrow_active_total_shares: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub recent_escrow_debonding_balance: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub recent_escrow_debonding_total_shares: BigInt,
}

/// Snapshot of an account at one height, the input of [`AccountAgg`] folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub public_key: String,
    pub height: Height,
    pub time: DateTime<Utc>,
    pub general_balance: BigInt,
    pub nonce: u64,
    pub escrow_active_balance: BigInt,
    pub escrow_active_total_shares: BigInt,
    pub escrow_debonding_balance: BigInt,
    pub escrow_debonding_total_shares: BigInt,
}

impl AccountAgg {
    pub fn from_snapshot(snapshot: &AccountSnapshot) -> Self {
        Self {
            public_key: snapshot.public_key.clone(),
            started_at_height: snapshot.height,
            started_at: snapshot.time,
            recent_at_height: snapshot.height,
            recent_at: snapshot.time,
            recent_general_balance: snapshot.general_balance.clone(),
            recent_nonce: snapshot.nonce,
            recent_escrow_active_balance: snapshot.escrow_active_balance.clone(),
            recent_escrow_active_total_shares: snapshot.escrow_active_total_shares.clone(),
            recent_escrow_debonding_balance: snapshot.escrow_debonding_balance.clone(),
            recent_escrow_debonding_total_shares: snapshot.escrow_debonding_total_shares.clone(),
        }
    }

    /// Folds a newer snapshot into the aggregate. Returns false, leaving the aggregate untouched, when the
    /// snapshot is not newer than what the aggregate already reflects.
    pub fn update(&mut self, snapshot: &AccountSnapshot) -> bool {
        if snapshot.height <= self.recent_at_height {
            return false;
        }
        self.recent_at_height = snapshot.height;
        self.recent_at = snapshot.time;
        self.recent_general_balance = snapshot.general_balance.clone();
        self.recent_nonce = snapshot.nonce;
        self.recent_escrow_active_balance = snapshot.escrow_active_balance.clone();
        self.recent_escrow_active_total_shares = snapshot.escrow_active_total_shares.clone();
        self.recent_escrow_debonding_balance = snapshot.escrow_debonding_balance.clone();
        self.recent_escrow_debonding_total_shares = snapshot.escrow_debonding_total_shares.clone();
        true
    }
}

/// Running rollup of one validator across every height it was seen at.
///
/// `recent_*` fields mirror the newest [`ValidatorSeq`] folded in. The `accumulated_*` counters only grow,
/// and `accumulated_uptime <= accumulated_uptime_count` holds at all times.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidatorAgg {
    pub entity_uid: String,
    pub started_at_height: Height,
    pub started_at: DateTime<Utc>,
    pub recent_at_height: Height,
    pub recent_at: DateTime<Utc>,
    pub recent_address: String,
    pub recent_node_uid: String,
    pub recent_voting_power: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub recent_total_shares: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub recent_active_escrow_balance: BigInt,
    #[serde_as(as = "DisplayFromStr")]
    pub recent_commission: BigInt,
    pub recent_proposed_height: Option<Height>,
    pub accumulated_uptime: u64,
    pub accumulated_uptime_count: u64,
    pub accumulated_proposed_count: u64,
}

impl ValidatorAgg {
    pub fn from_sequence(seq: &ValidatorSeq) -> Self {
        let mut agg = Self {
            entity_uid: seq.entity_uid.clone(),
            started_at_height: seq.height,
            started_at: seq.time,
            recent_at_height: seq.height,
            recent_at: seq.time,
            recent_address: seq.address.clone(),
            recent_node_uid: seq.node_uid.clone(),
            recent_voting_power: seq.voting_power,
            recent_total_shares: seq.total_shares.clone(),
            recent_active_escrow_balance: seq.active_escrow_balance.clone(),
            recent_commission: seq.commission.clone(),
            recent_proposed_height: None,
            accumulated_uptime: 0,
            accumulated_uptime_count: 0,
            accumulated_proposed_count: 0,
        };
        agg.accumulate(seq);
        agg
    }

    /// Folds a newer sequence into the aggregate. Heights at or below `recent_at_height` were already
    /// accounted for and are ignored, so re-running a height never double counts.
    pub fn update(&mut self, seq: &ValidatorSeq) -> bool {
        if seq.height <= self.recent_at_height {
            return false;
        }
        self.recent_at_height = seq.height;
        self.recent_at = seq.time;
        self.recent_address = seq.address.clone();
        self.recent_node_uid = seq.node_uid.clone();
        self.recent_voting_power = seq.voting_power;
        self.recent_total_shares = seq.total_shares.clone();
        self.recent_active_escrow_balance = seq.active_escrow_balance.clone();
        self.recent_commission = seq.commission.clone();
        self.accumulate(seq);
        true
    }

    fn accumulate(&mut self, seq: &ValidatorSeq) {
        if let Some(validated) = seq.precommit_validated {
            self.accumulated_uptime_count += 1;
            if validated {
                self.accumulated_uptime += 1;
            }
        }
        if seq.proposed {
            self.accumulated_proposed_count += 1;
            self.recent_proposed_height = Some(seq.height);
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.accumulated_uptime > self.accumulated_uptime_count {
            return Err(ValidationError::UptimeOverflow {
                record: "validator_agg",
                key: self.entity_uid.clone(),
                uptime: self.accumulated_uptime,
                count: self.accumulated_uptime_count,
            });
        }
        if self.entity_uid.is_empty() {
            return Err(ValidationError::EmptyField {
                record: "validator_agg",
                height: self.recent_at_height,
                field: "entity_uid",
            });
        }
        Ok(())
    }
}
