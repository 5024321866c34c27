use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use rstest::*;
use tokio_util::sync::CancellationToken;

use crate::core::client::database::repository::SyncableRepository;
use crate::core::client::database::{Database, DatabaseError};
use crate::error::{IndexerError, TaskError};
use crate::pipeline::stage::StageName;
use crate::pipeline::task::TaskId;
use crate::pipeline::Pipeline;
use crate::tests::common::{database, stored_syncable, test_config, FakeChain};
use crate::types::constant::UNVERSIONED;
use crate::types::event::SystemEventKind;
use crate::types::params::{PipelineOptions, RunMode};
use crate::types::report::ReportKind;
use crate::types::syncable::Syncable;
use crate::types::{Height, VersionId};

fn reindex(start: Height, end: Height, target_ids: Vec<u64>) -> PipelineOptions {
    PipelineOptions::new(RunMode::Reindex { start_height: Some(start), end_height: Some(end), target_ids })
}

fn index(first_height: Height, batch_size: u64, force_single_height: bool) -> PipelineOptions {
    PipelineOptions::new(RunMode::Index { first_height, batch_size, force_single_height })
}

/// A block fetch failing twice with a transport error is retried within the budget of three attempts and
/// every height of the range ends up committed, whether stages run their tasks concurrently or not.
#[rstest]
#[case::concurrent(true)]
#[case::sequential(false)]
#[tokio::test]
async fn reindex_retries_transient_failures_and_commits_every_height(database: Database, #[case] concurrent: bool) {
    let chain = Arc::new(FakeChain::new(12).with_block_failures(11, 2));
    let pipeline = Pipeline::new(test_config(chain.clone(), database.clone()));
    let options = PipelineOptions { concurrent_stages: concurrent, ..reindex(10, 12, vec![]) };

    let report = pipeline.start(CancellationToken::new(), options).await.unwrap();

    assert_eq!(report.kind, ReportKind::Reindex);
    assert_eq!((report.start_height, report.end_height), (10, 12));
    assert_eq!(report.success_count, 3);
    assert_eq!(report.error_count, 0);
    assert_eq!(report.index_version, 2);
    assert!(report.is_successful());
    assert_eq!(chain.calls("block", 11), 3);
    assert_eq!(database.reports.find_by_id(report.id).await.unwrap(), report);

    for height in 10..=12 {
        let syncable = database.syncables.find_by_height(height).await.unwrap();
        assert!(syncable.is_processed());
        assert_eq!(syncable.index_version, 2);
        assert_eq!(syncable.report_id, report.id);
        assert_eq!(database.block_seqs.find_by_height(height).await.unwrap().len(), 1);
        assert_eq!(database.validator_seqs.find_by_height(height).await.unwrap().len(), 3);
        assert_eq!(database.transaction_seqs.find_by_height(height).await.unwrap().len(), 2);
        assert_eq!(database.staking_seqs.find_by_height(height).await.unwrap().len(), 1);
        assert_eq!(database.delegation_seqs.find_by_height(height).await.unwrap().len(), 1);
        assert_eq!(database.debonding_delegation_seqs.find_by_height(height).await.unwrap().len(), 1);
    }
    let agg = database.validator_aggs.find_by_entity_uid("entity-a").await.unwrap();
    assert_eq!((agg.started_at_height, agg.recent_at_height), (10, 12));
}

/// Running the same range twice leaves sequences and aggregates exactly as the first run stored them.
#[rstest]
#[tokio::test]
async fn rerunning_a_range_is_idempotent(database: Database) {
    let chain = Arc::new(FakeChain::new(5).with_missed_vote(3, "b"));
    let pipeline = Pipeline::new(test_config(chain, database.clone()));

    pipeline.start(CancellationToken::new(), reindex(1, 5, vec![])).await.unwrap();
    let validator_agg = database.validator_aggs.find_by_entity_uid("entity-b").await.unwrap();
    let account_agg = database.account_aggs.find_by_public_key("delegator-1").await.unwrap();

    let report = pipeline.start(CancellationToken::new(), reindex(1, 5, vec![])).await.unwrap();
    assert_eq!(report.success_count, 5);

    assert_eq!(database.validator_aggs.find_by_entity_uid("entity-b").await.unwrap(), validator_agg);
    assert_eq!(database.account_aggs.find_by_public_key("delegator-1").await.unwrap(), account_agg);
    for height in 1..=5 {
        assert_eq!(database.validator_seqs.find_by_height(height).await.unwrap().len(), 3);
        assert_eq!(database.transaction_seqs.find_by_height(height).await.unwrap().len(), 2);
    }

    // height 1 has no last commit, so only heights 2 to 5 count towards uptime
    assert_eq!(validator_agg.accumulated_uptime_count, 4);
    assert_eq!(validator_agg.accumulated_uptime, 3);
    assert_eq!(account_agg.recent_at_height, 5);
    assert_eq!(account_agg.recent_nonce, 5);
}

/// A live run with nothing new beyond the next height is a no-op unless a single height is forced.
#[rstest]
#[tokio::test]
async fn index_with_single_pending_height_needs_force(database: Database) {
    let pipeline = Pipeline::new(test_config(Arc::new(FakeChain::new(1)), database.clone()));

    let result = pipeline.start(CancellationToken::new(), index(1, 10, false)).await;
    assert_matches!(result, Err(IndexerError::NothingToProcess));
    assert_matches!(database.syncables.find_most_recent().await, Err(DatabaseError::NotFound(_)));

    let report = pipeline.start(CancellationToken::new(), index(1, 10, true)).await.unwrap();
    assert_eq!((report.start_height, report.end_height, report.success_count), (1, 1, 1));
    assert!(database.syncables.find_by_height(1).await.unwrap().is_processed());
}

/// A height left unprocessed by a crashed run is picked up again by the next live run.
#[rstest]
#[tokio::test]
async fn index_resumes_from_unprocessed_height(database: Database) {
    for height in 1..=3 {
        database.syncables.create(stored_syncable(height, 2, true)).await.unwrap();
    }
    database.syncables.create(stored_syncable(4, 2, false)).await.unwrap();
    let pipeline = Pipeline::new(test_config(Arc::new(FakeChain::new(6)), database.clone()));

    let report = pipeline.start(CancellationToken::new(), index(1, 100, false)).await.unwrap();

    assert_eq!(report.kind, ReportKind::Index);
    assert_eq!((report.start_height, report.end_height), (4, 6));
    assert_eq!(report.success_count, 3);
    for height in 4..=6 {
        let syncable = database.syncables.find_by_height(height).await.unwrap();
        assert!(syncable.is_processed());
        assert_eq!(syncable.report_id, report.id);
    }
}

/// The live run never takes more heights than the batch size.
#[rstest]
#[tokio::test]
async fn index_is_bounded_by_batch_size(database: Database) {
    let pipeline = Pipeline::new(test_config(Arc::new(FakeChain::new(50)), database.clone()));

    let report = pipeline.start(CancellationToken::new(), index(1, 4, false)).await.unwrap();

    assert_eq!((report.start_height, report.end_height, report.success_count), (1, 4, 4));
    assert_eq!(database.syncables.find_most_recent().await.unwrap().height, 4);
}

/// A task exhausting its retries stops the run at that height. Earlier heights stay committed, the failing
/// height stays unprocessed and the stored report carries partial counts.
#[rstest]
#[tokio::test]
async fn failing_stage_stops_the_run_and_completes_the_report(database: Database) {
    let chain = Arc::new(FakeChain::new(5).with_block_failures(2, 5));
    let pipeline = Pipeline::new(test_config(chain.clone(), database.clone()));

    let result = pipeline.start(CancellationToken::new(), reindex(1, 3, vec![])).await;

    assert_matches!(
        result,
        Err(IndexerError::StageFailed {
            stage: StageName::Fetcher,
            task: TaskId::BlockFetcher,
            height: 2,
            source: TaskError::Client(_)
        })
    );
    assert_eq!(chain.calls("block", 2), 3);
    assert_eq!(chain.calls("meta", 3), 0);

    let committed = database.syncables.find_by_height(1).await.unwrap();
    assert!(committed.is_processed());
    assert!(!database.syncables.find_by_height(2).await.unwrap().is_processed());

    let report = database.reports.find_by_id(committed.report_id).await.unwrap();
    assert!(report.is_completed());
    assert!(!report.is_successful());
    assert_eq!((report.success_count, report.error_count), (1, 2));
    assert!(report.error_msg.unwrap().contains("BlockFetcher"));
}

/// A permanent failure is not retried.
#[rstest]
#[tokio::test]
async fn permanent_failure_is_not_retried(database: Database) {
    let chain = Arc::new(FakeChain::new(3));
    let pipeline = Pipeline::new(test_config(chain.clone(), database));

    let result = pipeline.start(CancellationToken::new(), reindex(3, 4, vec![])).await;

    assert_matches!(
        result,
        Err(IndexerError::StageFailed { stage: StageName::Setup, task: TaskId::HeightMetaRetriever, height: 4, .. })
    );
    assert_eq!(chain.calls("meta", 4), 1);
}

/// A cancelled run stops before its first height and does not touch the store.
#[rstest]
#[tokio::test]
async fn cancelled_run_stops_before_next_height(database: Database) {
    let pipeline = Pipeline::new(test_config(Arc::new(FakeChain::new(5)), database.clone()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline.start(cancel, reindex(1, 5, vec![])).await;

    assert_matches!(result, Err(IndexerError::Cancelled));
    assert_matches!(database.syncables.find_most_recent().await, Err(DatabaseError::NotFound(_)));
}

/// Cancels the run as soon as `height` is committed.
struct CancelAfterCommit {
    inner: Arc<dyn SyncableRepository>,
    cancel: CancellationToken,
    height: Height,
}

#[async_trait]
impl SyncableRepository for CancelAfterCommit {
    async fn find_by_height(&self, height: Height) -> Result<Syncable, DatabaseError> {
        self.inner.find_by_height(height).await
    }

    async fn find_most_recent(&self) -> Result<Syncable, DatabaseError> {
        self.inner.find_most_recent().await
    }

    async fn find_smallest_index_version(&self) -> Result<VersionId, DatabaseError> {
        self.inner.find_smallest_index_version().await
    }

    async fn find_first_by_different_index_version(
        &self,
        index_version: VersionId,
    ) -> Result<Syncable, DatabaseError> {
        self.inner.find_first_by_different_index_version(index_version).await
    }

    async fn find_most_recent_by_different_index_version(
        &self,
        index_version: VersionId,
    ) -> Result<Syncable, DatabaseError> {
        self.inner.find_most_recent_by_different_index_version(index_version).await
    }

    async fn create(&self, syncable: Syncable) -> Result<Syncable, DatabaseError> {
        self.inner.create(syncable).await
    }

    async fn save(&self, syncable: Syncable) -> Result<Syncable, DatabaseError> {
        let saved = self.inner.save(syncable).await?;
        if saved.height == self.height && saved.is_processed() {
            self.cancel.cancel();
        }
        Ok(saved)
    }

    async fn create_or_update(&self, syncable: Syncable) -> Result<Syncable, DatabaseError> {
        self.inner.create_or_update(syncable).await
    }
}

/// Cancelling while a height is in flight lets it commit, then stops before the next one. The stored report
/// counts the committed height as the only success.
#[rstest]
#[tokio::test]
async fn cancellation_during_a_height_stops_after_its_commit(database: Database) {
    let cancel = CancellationToken::new();
    let syncables = CancelAfterCommit { inner: database.syncables.clone(), cancel: cancel.clone(), height: 1 };
    let database = Database { syncables: Arc::new(syncables), ..database };
    let chain = Arc::new(FakeChain::new(5));
    let pipeline = Pipeline::new(test_config(chain.clone(), database.clone()));

    let result = pipeline.start(cancel, reindex(1, 5, vec![])).await;

    assert_matches!(result, Err(IndexerError::Cancelled));
    assert_eq!(chain.calls("meta", 2), 0);
    assert_matches!(database.syncables.find_by_height(2).await, Err(DatabaseError::NotFound(_)));

    let committed = database.syncables.find_by_height(1).await.unwrap();
    assert!(committed.is_processed());
    let report = database.reports.find_by_id(committed.report_id).await.unwrap();
    assert!(report.is_completed());
    assert_eq!(report.success_count, 1);
    assert_eq!(report.error_count, report.total() - 1);
}

/// Heights first created by a run restricted to some targets stay unversioned until a backfill runs every
/// missing version on them. A second backfill then has nothing left to do.
#[rstest]
#[tokio::test]
async fn backfill_completes_target_restricted_heights(database: Database) {
    let pipeline = Pipeline::new(test_config(Arc::new(FakeChain::new(3)), database.clone()));

    pipeline.start(CancellationToken::new(), reindex(1, 3, vec![1])).await.unwrap();
    for height in 1..=3 {
        let syncable = database.syncables.find_by_height(height).await.unwrap();
        assert!(syncable.is_processed());
        assert_eq!(syncable.index_version, UNVERSIONED);
        assert_eq!(database.block_seqs.find_by_height(height).await.unwrap().len(), 1);
        assert!(database.validator_seqs.find_by_height(height).await.unwrap().is_empty());
    }

    let backfill = PipelineOptions::new(RunMode::Backfill { target_ids: vec![] });
    let report = pipeline.start(CancellationToken::new(), backfill.clone()).await.unwrap();

    assert_eq!(report.kind, ReportKind::Backfill);
    assert_eq!((report.start_height, report.end_height, report.success_count), (1, 3, 3));
    for height in 1..=3 {
        assert_eq!(database.syncables.find_by_height(height).await.unwrap().index_version, 2);
        assert_eq!(database.validator_seqs.find_by_height(height).await.unwrap().len(), 3);
    }

    let result = pipeline.start(CancellationToken::new(), backfill).await;
    assert_matches!(result, Err(IndexerError::NothingToBackfill));
}

/// A target restricted re-run keeps the version already stored on the heights it touches.
#[rstest]
#[tokio::test]
async fn target_restricted_reindex_keeps_stored_version(database: Database) {
    let pipeline = Pipeline::new(test_config(Arc::new(FakeChain::new(2)), database.clone()));
    pipeline.start(CancellationToken::new(), reindex(1, 2, vec![])).await.unwrap();

    pipeline.start(CancellationToken::new(), reindex(1, 2, vec![6])).await.unwrap();

    for height in 1..=2 {
        assert_eq!(database.syncables.find_by_height(height).await.unwrap().index_version, 2);
    }
}

/// Missed votes and escrow moves flowing through the whole pipeline end up as stored system events.
#[rstest]
#[tokio::test]
async fn system_events_are_detected_and_stored(database: Database) {
    let chain = FakeChain::new(3).with_missed_vote(2, "b").with_missed_vote(3, "b").with_escrow(3, "c", 1_050_000);
    let pipeline = Pipeline::new(test_config(Arc::new(chain), database.clone()));

    pipeline.start(CancellationToken::new(), reindex(1, 3, vec![])).await.unwrap();

    assert!(database.system_events.find_by_height(2).await.unwrap().is_empty());
    let events = database.system_events.find_by_height(3).await.unwrap();
    let kinds: Vec<(String, SystemEventKind)> = events.iter().map(|e| (e.actor.clone(), e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("addr-b".to_string(), SystemEventKind::MissedNConsecutive),
            ("addr-c".to_string(), SystemEventKind::ActiveEscrowBalanceChange2),
        ]
    );
    assert_eq!(events[1].data["change_percent"], "5.0");

    let agg = database.validator_aggs.find_by_entity_uid("entity-b").await.unwrap();
    assert_eq!((agg.accumulated_uptime, agg.accumulated_uptime_count), (0, 2));
}
