use assert_matches::assert_matches;
use rstest::*;
use tokio_util::sync::CancellationToken;

use crate::core::client::chain::ChainClient;
use crate::core::client::database::Database;
use crate::error::TaskError;
use crate::pipeline::payload::Payload;
use crate::pipeline::task::{Task, TaskOutput};
use crate::tasks::aggregator::{account_snapshots, AccountAggCreator, ValidatorAggCreator};
use crate::tasks::persistor::ValidatorAggPersistor;
use crate::tests::common::{database, validator_seq, FakeChain};
use crate::types::aggregate::{AccountAgg, AccountSnapshot, ValidatorAgg};
use crate::types::error::ValidationError;
use crate::types::sequence::{Reconciled, ValidatorSeq};

fn validators_payload(height: u64, votes: &[(&str, Option<bool>)]) -> Payload {
    let mut payload = Payload::new(height, Default::default(), 2);
    payload.validator_sequences = Some(Reconciled {
        new: votes.iter().map(|(name, vote)| validator_seq(height, name, *vote)).collect(),
        ..Default::default()
    });
    payload
}

async fn delegator_snapshot(chain: &FakeChain, height: u64) -> AccountSnapshot {
    let meta = chain.get_meta_by_height(height).await.unwrap();
    let state = chain.get_state_by_height(height).await.unwrap();
    account_snapshots(&meta, &state).into_iter().find(|s| s.public_key == "delegator-1").unwrap()
}

/// Folding is monotonic: older or repeated heights never change the aggregate and uptime never exceeds its
/// count.
#[rstest]
fn validator_agg_accumulates_newer_heights_only() {
    let mut agg = ValidatorAgg::from_sequence(&validator_seq(5, "a", Some(true)));
    assert_eq!((agg.accumulated_uptime, agg.accumulated_uptime_count), (1, 1));

    assert!(!agg.update(&validator_seq(5, "a", Some(false))));
    assert!(!agg.update(&validator_seq(3, "a", Some(false))));

    let proposed = ValidatorSeq { proposed: true, ..validator_seq(6, "a", Some(false)) };
    assert!(agg.update(&proposed));
    assert!(agg.update(&validator_seq(7, "a", None)));

    assert_eq!((agg.accumulated_uptime, agg.accumulated_uptime_count), (1, 2));
    assert_eq!(agg.accumulated_proposed_count, 1);
    assert_eq!(agg.recent_proposed_height, Some(6));
    assert_eq!((agg.started_at_height, agg.recent_at_height), (5, 7));
    assert!(agg.validate().is_ok());
}

#[rstest]
fn validator_agg_rejects_uptime_overflow() {
    let mut agg = ValidatorAgg::from_sequence(&validator_seq(5, "a", Some(true)));
    agg.accumulated_uptime = 2;

    assert_matches!(agg.validate(), Err(ValidationError::UptimeOverflow { uptime: 2, count: 1, .. }));
}

/// Once persisted, the same height folds into nothing new.
#[rstest]
#[tokio::test]
async fn validator_aggregates_fold_once_per_height(database: Database) {
    let creator = ValidatorAggCreator::new(database.validator_aggs.clone());
    let persistor = ValidatorAggPersistor::new(database.validator_aggs.clone());
    let cancel = CancellationToken::new();

    let mut payload = validators_payload(2, &[("a", Some(true)), ("b", Some(false))]);
    creator.run(&cancel, &payload).await.unwrap().apply(&mut payload);
    persistor.run(&cancel, &payload).await.unwrap();

    let mut again = validators_payload(2, &[("a", Some(true)), ("b", Some(false))]);
    let output = creator.run(&cancel, &again).await.unwrap();
    assert_matches!(&output, TaskOutput::ValidatorAggregates(c) if c.new.is_empty() && c.updated.is_empty());
    output.apply(&mut again);
    persistor.run(&cancel, &again).await.unwrap();

    let mut next = validators_payload(3, &[("a", Some(true)), ("b", Some(true))]);
    creator.run(&cancel, &next).await.unwrap().apply(&mut next);
    assert_eq!(next.validator_aggregates.as_ref().map(|c| c.updated.len()), Some(2));
    persistor.run(&cancel, &next).await.unwrap();

    let b = database.validator_aggs.find_by_entity_uid("entity-b").await.unwrap();
    assert_eq!((b.accumulated_uptime, b.accumulated_uptime_count), (1, 2));
}

#[rstest]
#[tokio::test]
async fn account_aggregates_track_ledger(database: Database) {
    let chain = FakeChain::new(3);
    let creator = AccountAggCreator::new(database.account_aggs.clone());
    let mut payload = Payload::new(2, Default::default(), 2);
    payload.height_meta = Some(chain.get_meta_by_height(2).await.unwrap());
    payload.raw_state = Some(chain.get_state_by_height(2).await.unwrap());

    let output = creator.run(&CancellationToken::new(), &payload).await.unwrap();

    let TaskOutput::AccountAggregates(changes) = output else { panic!("expected account aggregates") };
    assert_eq!(changes.new.len(), 4);
    assert!(changes.updated.is_empty());
}

#[rstest]
#[tokio::test]
async fn account_agg_keeps_first_and_most_recent_height() {
    let chain = FakeChain::new(3);
    let second = delegator_snapshot(&chain, 2).await;
    let third = delegator_snapshot(&chain, 3).await;

    let mut agg = AccountAgg::from_snapshot(&second);
    assert!(agg.update(&third));
    assert!(!agg.update(&second));

    assert_eq!((agg.started_at_height, agg.recent_at_height, agg.recent_nonce), (2, 3, 3));
}

#[rstest]
#[tokio::test]
async fn cancelled_aggregation_stops(database: Database) {
    let creator = ValidatorAggCreator::new(database.validator_aggs.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = creator.run(&cancel, &validators_payload(2, &[("a", None)])).await;

    assert_matches!(result, Err(TaskError::Cancelled));
}
