use num_bigint::BigInt;
use rstest::*;

use crate::core::client::chain::types::{Block, BlockIdFlag, CommitVote, LastCommit};
use crate::core::client::chain::ChainClient;
use crate::tasks::parser::{parse_block, parse_validators};
use crate::tests::common::{FakeChain, DEFAULT_ESCROW};

fn with_votes(mut block: Block, votes: &[(&str, BlockIdFlag)]) -> Block {
    block.last_commit = Some(LastCommit {
        height: block.header.height - 1,
        round: 0,
        votes: votes
            .iter()
            .map(|(address, flag)| CommitVote { validator_address: address.to_string(), block_id_flag: *flag })
            .collect(),
    });
    block
}

/// Commit counts as validated, absent and nil as missed, no slot at all as unknown.
#[rstest]
#[tokio::test]
async fn precommits_are_classified_per_validator() {
    let chain = FakeChain::new(5);
    let block = chain.get_block_by_height(4).await.unwrap();
    let block = with_votes(block, &[("addr-a", BlockIdFlag::Commit), ("addr-b", BlockIdFlag::Nil)]);
    let validators = chain.get_validators_by_height(4).await.unwrap();
    let state = chain.get_state_by_height(4).await.unwrap();

    let parsed = parse_validators(&block, &validators, &state);

    assert_eq!(parsed["entity-a"].precommit_validated, Some(true));
    assert_eq!(parsed["entity-b"].precommit_validated, Some(false));
    assert_eq!(parsed["entity-c"].precommit_validated, None);
    // height 4 is proposed by the validator at index 4 % 3
    assert!(parsed["entity-b"].proposed);
    assert!(!parsed["entity-a"].proposed);
    assert_eq!(parsed["entity-a"].active_escrow_balance, BigInt::from(DEFAULT_ESCROW));
}

#[rstest]
#[tokio::test]
async fn first_block_has_no_precommits() {
    let chain = FakeChain::new(1);
    let block = chain.get_block_by_height(1).await.unwrap();
    let validators = chain.get_validators_by_height(1).await.unwrap();
    let state = chain.get_state_by_height(1).await.unwrap();

    let parsed = parse_validators(&block, &validators, &state);

    assert!(parsed.values().all(|p| p.precommit_validated.is_none()));
}

#[rstest]
#[tokio::test]
async fn validator_missing_from_ledger_has_zero_escrow() {
    let chain = FakeChain::new(2);
    let block = chain.get_block_by_height(2).await.unwrap();
    let validators = chain.get_validators_by_height(2).await.unwrap();
    let mut state = chain.get_state_by_height(2).await.unwrap();
    state.ledger.remove("entity-c");

    let parsed = parse_validators(&block, &validators, &state);

    assert_eq!(parsed["entity-c"].active_escrow_balance, BigInt::default());
    assert_eq!(parsed["entity-c"].total_shares, BigInt::default());
}

#[rstest]
#[tokio::test]
async fn block_proposer_is_resolved_to_its_entity() {
    let chain = FakeChain::new(3);
    let mut block = chain.get_block_by_height(3).await.unwrap();
    let validators = chain.get_validators_by_height(3).await.unwrap();
    let transactions = chain.get_transactions_by_height(3).await.unwrap();

    let parsed = parse_block(&block, &validators, &transactions);
    assert_eq!(parsed.proposer_entity_uid, "entity-a");
    assert_eq!(parsed.transactions_count, 2);

    block.header.proposer_address = "addr-unknown".to_string();
    let parsed = parse_block(&block, &validators, &[]);
    assert_eq!(parsed.proposer_entity_uid, "addr-unknown");
    assert_eq!(parsed.transactions_count, 0);
}
