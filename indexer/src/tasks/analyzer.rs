//! System event detection.
//!
//! Compares the validator sequences of the height with the ones of the previous height and with each
//! validator's recent history. Detection is kept in plain functions; the task only gathers their inputs.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use num_traits::Signed;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::client::database::repository::ValidatorSeqRepository;
use crate::error::{TaskError, TaskResult};
use crate::pipeline::payload::{required, Payload};
use crate::pipeline::task::{Task, TaskId, TaskOutput};
use crate::types::event::{SystemEvent, SystemEventKind};
use crate::types::params::AnalyzerParams;
use crate::types::sequence::ValidatorSeq;
use crate::types::Height;

/// Absolute change between two balances in percent of `previous`, rounded half up to one decimal.
///
/// `None` when the previous balance is not positive, since no rate can be derived from it.
pub fn escrow_change_rate(previous: &BigInt, current: &BigInt) -> Option<BigDecimal> {
    if !previous.is_positive() {
        return None;
    }
    // tenths of a percent: round(|p - c| * 1000 / p) == floor((2 * |p - c| * 1000 + p) / (2 * p))
    let diff = (previous - current).abs();
    let tenths = (diff * 2000 + previous) / (previous * 2);
    Some(BigDecimal::new(tenths, 1))
}

/// Buckets are lower inclusive: `[0.1, 1)`, `[1, 10)` and `[10, ∞)`. Below 0.1 nothing is reported.
pub fn classify_escrow_change(rate: &BigDecimal) -> Option<SystemEventKind> {
    if *rate < BigDecimal::new(1.into(), 1) {
        None
    } else if *rate < BigDecimal::from(1) {
        Some(SystemEventKind::ActiveEscrowBalanceChange1)
    } else if *rate < BigDecimal::from(10) {
        Some(SystemEventKind::ActiveEscrowBalanceChange2)
    } else {
        Some(SystemEventKind::ActiveEscrowBalanceChange3)
    }
}

/// One event per validator of both heights whose active escrow balance moved enough to be reported.
pub fn escrow_change_events(
    height: Height,
    time: DateTime<Utc>,
    previous: &[ValidatorSeq],
    current: &[ValidatorSeq],
) -> Vec<SystemEvent> {
    let previous: HashMap<&str, &ValidatorSeq> = previous.iter().map(|s| (s.entity_uid.as_str(), s)).collect();

    current
        .iter()
        .filter_map(|seq| {
            let before = previous.get(seq.entity_uid.as_str())?;
            let rate = escrow_change_rate(&before.active_escrow_balance, &seq.active_escrow_balance)?;
            let kind = classify_escrow_change(&rate)?;
            let data = json!({
                "before": before.active_escrow_balance.to_string(),
                "after": seq.active_escrow_balance.to_string(),
                "change_percent": rate.to_string(),
            });
            Some(SystemEvent::new(height, time, seq.address.clone(), kind).with_data(data))
        })
        .collect()
}

/// Joined and left events, matching validators of both heights by address.
pub fn active_set_events(
    height: Height,
    time: DateTime<Utc>,
    previous: &[ValidatorSeq],
    current: &[ValidatorSeq],
) -> Vec<SystemEvent> {
    let previous: BTreeSet<&str> = previous.iter().map(|s| s.address.as_str()).collect();
    let current: BTreeSet<&str> = current.iter().map(|s| s.address.as_str()).collect();

    let joined = current
        .difference(&previous)
        .map(|address| SystemEvent::new(height, time, *address, SystemEventKind::JoinedActiveSet));
    let left = previous
        .difference(&current)
        .map(|address| SystemEvent::new(height, time, *address, SystemEventKind::LeftActiveSet));
    joined.chain(left).collect()
}

/// Missed block events of one validator.
///
/// `window` starts with the validator's sequence of the current height followed by its history, most recent
/// first. Both checks fire when their count reaches the threshold exactly, so a validator that keeps missing
/// is reported once per crossing.
pub fn missed_block_events(
    height: Height,
    time: DateTime<Utc>,
    window: &[ValidatorSeq],
    params: &AnalyzerParams,
) -> Vec<SystemEvent> {
    let Some(current) = window.first() else {
        return Vec::new();
    };
    let mut events = Vec::new();

    let missed = window.iter().filter(|s| s.missed()).count() as u64;
    if missed == params.missed_m_of_n_threshold {
        events.push(
            SystemEvent::new(height, time, current.address.clone(), SystemEventKind::MissedNofM)
                .with_data(json!({ "missed": missed, "window": window.len() })),
        );
    }

    let in_a_row =
        window.iter().take_while(|s| s.missed()).take(params.missed_in_a_row_window as usize).count() as u64;
    if in_a_row == params.missed_in_a_row_threshold {
        events.push(
            SystemEvent::new(height, time, current.address.clone(), SystemEventKind::MissedNConsecutive)
                .with_data(json!({ "missed_in_a_row": in_a_row })),
        );
    }
    events
}

pub struct SystemEventCreator {
    validator_seqs: Arc<dyn ValidatorSeqRepository>,
    params: AnalyzerParams,
}

impl SystemEventCreator {
    pub fn new(validator_seqs: Arc<dyn ValidatorSeqRepository>, params: AnalyzerParams) -> Self {
        Self { validator_seqs, params }
    }
}

#[async_trait]
impl Task for SystemEventCreator {
    fn id(&self) -> TaskId {
        TaskId::SystemEventCreator
    }

    async fn run(&self, cancel: &CancellationToken, payload: &Payload) -> TaskResult<TaskOutput> {
        let height = payload.current_height;
        let time = payload.height_meta()?.time;
        let current: Vec<ValidatorSeq> =
            required(&payload.validator_sequences, "validator_sequences")?.all().cloned().collect();

        let previous = match height.checked_sub(1) {
            Some(previous) if previous > 0 => self.validator_seqs.find_by_height(previous).await?,
            _ => Vec::new(),
        };

        let mut events = escrow_change_events(height, time, &previous, &current);
        // without a previous set every validator would look like it just joined
        if !previous.is_empty() {
            events.extend(active_set_events(height, time, &previous, &current));
        }

        for seq in current.iter().filter(|s| s.missed()) {
            if cancel.is_cancelled() {
                return Err(TaskError::Cancelled);
            }
            let history = self
                .validator_seqs
                .find_last_by_address(&seq.address, height, self.params.max_validator_sequences)
                .await?;
            let window: Vec<ValidatorSeq> = std::iter::once(seq.clone()).chain(history).collect();
            events.extend(missed_block_events(height, time, &window, &self.params));
        }

        debug!(height, events = events.len(), "System events detected");
        Ok(TaskOutput::SystemEvents(events))
    }
}
