use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::types::Height;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString)]
pub enum SystemEventKind {
    /// Active escrow balance moved by at least 0.1% and less than 1%
    #[serde(rename = "active_escrow_balance_change_1")]
    #[strum(serialize = "active_escrow_balance_change_1")]
    ActiveEscrowBalanceChange1,
    /// at least 1% and less than 10%
    #[serde(rename = "active_escrow_balance_change_2")]
    #[strum(serialize = "active_escrow_balance_change_2")]
    ActiveEscrowBalanceChange2,
    /// 10% and above
    #[serde(rename = "active_escrow_balance_change_3")]
    #[strum(serialize = "active_escrow_balance_change_3")]
    ActiveEscrowBalanceChange3,
    #[serde(rename = "missed_n_consecutive")]
    #[strum(serialize = "missed_n_consecutive")]
    MissedNConsecutive,
    #[serde(rename = "missed_n_of_m")]
    #[strum(serialize = "missed_n_of_m")]
    MissedNofM,
    #[serde(rename = "joined_active_set")]
    #[strum(serialize = "joined_active_set")]
    JoinedActiveSet,
    #[serde(rename = "left_active_set")]
    #[strum(serialize = "left_active_set")]
    LeftActiveSet,
}

/// Behavioral anomaly detected at one height. Unique per `(height, actor, kind)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SystemEvent {
    pub height: Height,
    pub time: DateTime<Utc>,
    /// address of the validator the event is about
    pub actor: String,
    pub kind: SystemEventKind,
    /// kind specific details (balances before and after, window sizes, ...)
    pub data: serde_json::Value,
}

impl SystemEvent {
    pub fn new(height: Height, time: DateTime<Utc>, actor: impl Into<String>, kind: SystemEventKind) -> Self {
        Self { height, time, actor: actor.into(), kind, data: serde_json::Value::Null }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn key(&self) -> (Height, String, SystemEventKind) {
        (self.height, self.actor.clone(), self.kind)
    }
}
