use assert_matches::assert_matches;
use rstest::*;

use crate::core::client::database::Database;
use crate::error::IndexerError;
use crate::pipeline::payload::Payload;
use crate::pipeline::sink::Sink;
use crate::tests::common::{database, stored_syncable};
use crate::types::syncable::SyncableStatus;
use crate::types::VersionId;

#[rstest]
#[case::versioned_run(Some(2), 2)]
#[case::target_restricted_run(None, 1)]
#[tokio::test]
async fn sink_marks_syncable_processed(
    database: Database,
    #[case] sink_version: Option<VersionId>,
    #[case] expected_version: VersionId,
) {
    let syncable = database.syncables.create(stored_syncable(7, 1, false)).await.unwrap();
    let mut payload = Payload::new(7, syncable.report_id, 2);
    payload.syncable = Some(syncable);
    let sink = Sink::new(database.syncables.clone(), sink_version);

    sink.consume(&payload).await.unwrap();

    let stored = database.syncables.find_by_height(7).await.unwrap();
    assert!(stored.is_processed());
    assert_eq!(stored.status, SyncableStatus::Processed);
    assert_eq!(stored.index_version, expected_version);
}

#[rstest]
#[tokio::test]
async fn sink_requires_a_syncable(database: Database) {
    let sink = Sink::new(database.syncables.clone(), Some(2));

    let result = sink.consume(&Payload::new(7, Default::default(), 2)).await;

    assert_matches!(result, Err(IndexerError::MissingSyncable(7)));
}
