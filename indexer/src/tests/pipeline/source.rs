use assert_matches::assert_matches;
use rstest::*;

use crate::core::client::chain::MockChainClient;
use crate::core::client::database::memory::MemorySyncableRepository;
use crate::core::client::database::repository::{MockSyncableRepository, SyncableRepository};
use crate::core::client::database::DatabaseError;
use crate::error::IndexerError;
use crate::pipeline::source::{HeightRange, Source};
use crate::tests::common::stored_syncable;
use crate::types::report::ReportKind;
use crate::types::{Height, VersionId};

fn chain_with_head(head: Height) -> MockChainClient {
    let mut chain = MockChainClient::new();
    chain.expect_get_head().returning(move || Ok(head));
    chain
}

/// `(height, index_version, processed)` rows.
async fn syncables(rows: &[(Height, VersionId, bool)]) -> MemorySyncableRepository {
    let repository = MemorySyncableRepository::default();
    for (height, version, processed) in rows {
        repository.create(stored_syncable(*height, *version, *processed)).await.unwrap();
    }
    repository
}

fn drain(mut source: Source) -> Vec<Height> {
    let mut heights = Vec::new();
    while source.advance() {
        heights.push(source.current());
    }
    heights
}

#[rstest]
#[case::empty_store(&[], 12, 5, HeightRange::new(1, 5))]
#[case::after_last_processed(&[(6, 1, true), (7, 1, true)], 12, 100, HeightRange::new(8, 12))]
#[case::resumes_unprocessed(&[(6, 1, true), (7, 1, false)], 12, 100, HeightRange::new(7, 12))]
#[case::head_bounds_batch(&[(6, 1, true)], 9, 100, HeightRange::new(7, 9))]
#[tokio::test]
async fn index_range_starts_after_stored_heights(
    #[case] rows: &[(Height, VersionId, bool)],
    #[case] head: Height,
    #[case] batch_size: u64,
    #[case] expected: HeightRange,
) {
    let repository = syncables(rows).await;

    let source = Source::index(&repository, &chain_with_head(head), 1, batch_size, false).await.unwrap();

    assert_eq!(source.kind(), ReportKind::Index);
    assert_eq!(source.range(), expected);
    assert_eq!(source.len(), expected.len());
}

/// A single pending height is only processed on request; a head behind the next height never is.
#[rstest]
#[tokio::test]
async fn index_single_height_requires_force() {
    let repository = syncables(&[(1, 1, true), (2, 1, true)]).await;

    let result = Source::index(&repository, &chain_with_head(3), 1, 100, false).await;
    assert_matches!(result, Err(IndexerError::NothingToProcess));

    let source = Source::index(&repository, &chain_with_head(3), 1, 100, true).await.unwrap();
    assert_eq!(drain(source), vec![3]);

    let result = Source::index(&repository, &chain_with_head(2), 1, 100, true).await;
    assert_matches!(result, Err(IndexerError::NothingToProcess));
}

/// A store failure other than a missing row is not mistaken for an empty store.
#[rstest]
#[tokio::test]
async fn index_propagates_store_failures() {
    let mut repository = MockSyncableRepository::new();
    repository
        .expect_find_most_recent()
        .times(1)
        .returning(|| Err(DatabaseError::MongoError(std::io::ErrorKind::ConnectionReset.into())));
    let mut chain = MockChainClient::new();
    chain.expect_get_head().times(0);

    let result = Source::index(&repository, &chain, 1, 100, false).await;

    assert_matches!(result, Err(IndexerError::DatabaseError(DatabaseError::MongoError(_))));
}

/// The backfill range spans from the oldest to the most recent height stored with another version,
/// including the up to date heights in between.
#[rstest]
#[tokio::test]
async fn backfill_spans_heights_with_other_versions() {
    let repository = syncables(&[(1, 2, true), (2, 1, true), (3, 2, true), (4, 1, true), (5, 2, true)]).await;

    let source = Source::backfill(&repository, 2).await.unwrap();

    assert_eq!(source.kind(), ReportKind::Backfill);
    assert_eq!(drain(source), vec![2, 3, 4]);
}

#[rstest]
#[case::up_to_date(&[(1, 2, true), (2, 2, true)])]
#[case::empty_store(&[])]
#[tokio::test]
async fn backfill_without_outdated_heights_is_idle(#[case] rows: &[(Height, VersionId, bool)]) {
    let repository = syncables(rows).await;

    let result = Source::backfill(&repository, 2).await;

    assert_matches!(result, Err(IndexerError::NothingToBackfill));
}

#[rstest]
#[case::defaults(None, None, HeightRange::new(1, 9))]
#[case::zero_means_default(Some(0), Some(0), HeightRange::new(1, 9))]
#[case::explicit_start(Some(4), None, HeightRange::new(4, 9))]
#[case::explicit_range(Some(20), Some(30), HeightRange::new(20, 30))]
#[tokio::test]
async fn reindex_range_defaults(
    #[case] start: Option<Height>,
    #[case] end: Option<Height>,
    #[case] expected: HeightRange,
) {
    let repository = syncables(&[(8, 1, true), (9, 1, true)]).await;

    let source = Source::reindex(&repository, start, end).await.unwrap();

    assert_eq!(source.kind(), ReportKind::Reindex);
    assert_eq!(source.range(), expected);
}

#[rstest]
#[case::inverted(Some(8), Some(3))]
#[case::start_past_last_stored(Some(12), None)]
#[tokio::test]
async fn reindex_empty_range_is_idle(#[case] start: Option<Height>, #[case] end: Option<Height>) {
    let repository = syncables(&[(9, 1, true)]).await;

    let result = Source::reindex(&repository, start, end).await;

    assert_matches!(result, Err(IndexerError::NothingToProcess));
}

#[rstest]
#[tokio::test]
async fn reindex_without_end_on_empty_store_is_idle() {
    let repository = syncables(&[]).await;

    let result = Source::reindex(&repository, Some(5), None).await;

    assert_matches!(result, Err(IndexerError::NothingToProcess));
}

#[rstest]
#[tokio::test]
async fn source_yields_every_height_once_in_order() {
    let repository = syncables(&[]).await;
    let mut source = Source::reindex(&repository, Some(10), Some(12)).await.unwrap();

    assert_eq!(source.current(), 10);
    assert!(source.advance());
    assert_eq!(source.current(), 10);
    assert!(source.advance());
    assert!(source.advance());
    assert_eq!(source.current(), 12);
    assert!(!source.advance());
    assert_eq!(source.current(), 12);
}
