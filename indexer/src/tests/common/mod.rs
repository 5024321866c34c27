
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use num_bigint::BigInt;
use rstest::*;
use uuid::Uuid;

use crate::core::client::database::Database;
use crate::core::client::ChainClient;
use crate::core::config::Config;
use crate::targets::Targets;
use crate::types::params::{AnalyzerParams, RetryParams};
use crate::types::sequence::ValidatorSeq;
use crate::types::syncable::Syncable;
use crate::types::{Height, VersionId};

pub use chain::FakeChain;

/// Escrow balance every fixture validator starts with.
pub const DEFAULT_ESCROW: i64 = 1_000_000;

pub fn default_targets() -> Targets {
    Targets::from_json(include_str!("../../../config/targets.json")).unwrap()
}

/// Retries without waiting, so transient failures do not slow the suite down.
pub fn test_retry_params() -> RetryParams {
    RetryParams { max_attempts: 3, base_delay: Duration::ZERO }
}

/// Small thresholds so a handful of heights is enough to trigger every missed block event.
pub fn test_analyzer_params() -> AnalyzerParams {
    AnalyzerParams {
        max_validator_sequences: 10,
        missed_m_of_n_threshold: 3,
        missed_in_a_row_threshold: 2,
        missed_in_a_row_window: 10,
    }
}

#[fixture]
pub fn database() -> Database {
    Database::in_memory()
}

pub fn test_config(chain: Arc<dyn ChainClient>, database: Database) -> Arc<Config> {
    Arc::new(Config::new(chain, database, default_targets(), test_retry_params(), test_analyzer_params()))
}

pub fn height_time(height: Height) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + height as i64 * 6, 0).unwrap()
}

/// Syncable of a previous run, processed or left behind by a crash.
pub fn stored_syncable(height: Height, index_version: VersionId, processed: bool) -> Syncable {
    let mut syncable = Syncable::new(height, height_time(height), 1, index_version, Uuid::new_v4());
    if processed {
        syncable.mark_processed(index_version);
    }
    syncable
}

/// Sequence of the fixture validator `name` (`entity-{name}`, `node-{name}`, `addr-{name}`).
pub fn validator_seq(height: Height, name: &str, precommit_validated: Option<bool>) -> ValidatorSeq {
    ValidatorSeq {
        height,
        time: height_time(height),
        entity_uid: format!("entity-{name}"),
        node_uid: format!("node-{name}"),
        address: format!("addr-{name}"),
        voting_power: 10,
        total_shares: BigInt::from(DEFAULT_ESCROW),
        active_escrow_balance: BigInt::from(DEFAULT_ESCROW),
        commission: BigInt::from(500),
        precommit_validated,
        proposed: false,
    }
}

pub fn validator_seq_with_escrow(height: Height, name: &str, escrow: i64) -> ValidatorSeq {
    ValidatorSeq { active_escrow_balance: BigInt::from(escrow), ..validator_seq(height, name, Some(true)) }
}
