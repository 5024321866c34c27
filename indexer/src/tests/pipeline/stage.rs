use std::sync::Arc;

use assert_matches::assert_matches;
use rstest::*;
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;

use crate::core::client::chain::types::{HeightMeta, Validator};
use crate::core::client::database::Database;
use crate::error::{IndexerError, TaskError};
use crate::pipeline::payload::Payload;
use crate::pipeline::registry::TaskRegistry;
use crate::pipeline::stage::RunnerKind::{self, Concurrent, Sequential};
use crate::pipeline::stage::{StageName, StageRunner};
use crate::pipeline::task::{MockTask, Task, TaskId, TaskOutput};
use crate::pipeline::Pipeline;
use crate::tests::common::{database, height_time, test_config, test_retry_params, FakeChain};
use crate::types::params::{PipelineOptions, RunMode};
use crate::types::report::ReportKind;

fn task(id: TaskId, result: fn() -> Result<TaskOutput, TaskError>) -> Arc<dyn Task> {
    let mut task = MockTask::new();
    task.expect_id().return_const(id);
    task.expect_run().times(1).returning(move |_, _| result());
    Arc::new(task)
}

fn idle_task(id: TaskId) -> Arc<dyn Task> {
    let mut task = MockTask::new();
    task.expect_id().return_const(id);
    task.expect_run().times(0);
    Arc::new(task)
}

/// Every concurrent task runs to completion, the failure of the first one in registration order is the one
/// reported and the payload is left untouched.
#[rstest]
#[tokio::test]
async fn concurrent_stage_reports_first_failure_in_order() {
    let runner = StageRunner::new(
        StageName::Fetcher,
        RunnerKind::Concurrent,
        vec![
            task(TaskId::ValidatorFetcher, || Ok(TaskOutput::Validators(Vec::new()))),
            task(TaskId::StateFetcher, || Err(TaskError::MissingPayload("first"))),
            task(TaskId::TransactionFetcher, || Err(TaskError::MissingPayload("second"))),
        ],
    );
    let mut payload = Payload::new(5, Default::default(), 1);

    let result = runner.run(&CancellationToken::new(), &mut payload).await;

    assert_matches!(
        result,
        Err(IndexerError::StageFailed {
            stage: StageName::Fetcher,
            task: TaskId::StateFetcher,
            height: 5,
            source: TaskError::MissingPayload("first")
        })
    );
    assert!(payload.raw_validators.is_none());
}

#[rstest]
#[tokio::test]
async fn concurrent_stage_applies_every_output() {
    let runner = StageRunner::new(
        StageName::Fetcher,
        RunnerKind::Concurrent,
        vec![
            task(TaskId::ValidatorFetcher, || Ok(TaskOutput::Validators(Vec::new()))),
            task(TaskId::TransactionFetcher, || Ok(TaskOutput::Transactions(Vec::new()))),
        ],
    );
    let mut payload = Payload::new(5, Default::default(), 1);

    runner.run(&CancellationToken::new(), &mut payload).await.unwrap();

    assert_eq!(payload.raw_validators, Some(Vec::<Validator>::new()));
    assert!(payload.raw_transactions.is_some());
}

/// Sequential tasks see the output of the tasks before them and a failure stops the stage.
#[rstest]
#[tokio::test]
async fn sequential_stage_chains_outputs_and_stops_on_failure() {
    let mut reader = MockTask::new();
    reader.expect_id().return_const(TaskId::MainSyncer);
    reader.expect_run().times(1).returning(|_, payload| {
        payload.height_meta()?;
        Err(TaskError::MissingPayload("syncable"))
    });
    let runner = StageRunner::new(
        StageName::Setup,
        RunnerKind::Sequential,
        vec![
            task(TaskId::HeightMetaRetriever, || {
                Ok(TaskOutput::HeightMeta(HeightMeta { height: 5, time: height_time(5), app_version: 1 }))
            }),
            Arc::new(reader),
            idle_task(TaskId::BlockFetcher),
        ],
    );
    let mut payload = Payload::new(5, Default::default(), 1);

    let result = runner.run(&CancellationToken::new(), &mut payload).await;

    // the second task found the meta applied by the first one
    assert_matches!(
        result,
        Err(IndexerError::StageFailed { task: TaskId::MainSyncer, source: TaskError::MissingPayload("syncable"), .. })
    );
    assert_eq!(payload.height_meta.map(|m| m.height), Some(5));
}

#[rstest]
#[tokio::test]
async fn cancelled_task_cancels_the_run() {
    let runner = StageRunner::new(
        StageName::Parser,
        RunnerKind::Concurrent,
        vec![task(TaskId::BlockParser, || Err(TaskError::Cancelled))],
    );

    let result = runner.run(&CancellationToken::new(), &mut Payload::default()).await;

    assert_matches!(result, Err(IndexerError::Cancelled));
}

/// Stages come out in execution order, empty ones skipped, concurrent only where allowed.
#[rstest]
#[case::concurrent(true, [Sequential, Sequential, Concurrent, Sequential])]
#[case::sequential(false, [Sequential; 4])]
fn registry_builds_stages_in_order(#[case] concurrent: bool, #[case] kinds: [RunnerKind; 4]) {
    let mut registry = TaskRegistry::new();
    for id in [
        TaskId::SystemEventCreator,
        TaskId::StateFetcher,
        TaskId::HeightMetaRetriever,
        TaskId::BlockFetcher,
        TaskId::MainSyncer,
        TaskId::BlockParser,
    ] {
        registry.register(idle_task(id));
    }
    let whitelist = [
        TaskId::HeightMetaRetriever,
        TaskId::MainSyncer,
        TaskId::BlockFetcher,
        TaskId::StateFetcher,
        TaskId::SystemEventCreator,
    ];

    let stages = registry.stages(&whitelist, test_retry_params(), concurrent).unwrap();

    let names: Vec<StageName> = stages.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec![StageName::Setup, StageName::Syncer, StageName::Fetcher, StageName::Analyzer]);
    assert_eq!(stages.iter().map(|s| s.kind()).collect::<Vec<_>>(), kinds.to_vec());
    assert_eq!(stages[2].task_ids(), vec![TaskId::BlockFetcher, TaskId::StateFetcher]);
}

#[rstest]
fn registry_rejects_unregistered_task() {
    let mut registry = TaskRegistry::new();
    registry.register(idle_task(TaskId::HeightMetaRetriever));

    let result = registry.stages(&[TaskId::HeightMetaRetriever, TaskId::MainSyncer], test_retry_params(), true);

    assert_matches!(result, Err(IndexerError::ConfigError(message)) if message.contains("MainSyncer"));
}

#[rstest]
fn stage_runner_debug_lists_its_tasks() {
    let runner = StageRunner::new(
        StageName::Fetcher,
        Concurrent,
        vec![idle_task(TaskId::BlockFetcher), idle_task(TaskId::StateFetcher)],
    );

    assert_eq!(
        format!("{runner:?}"),
        "StageRunner { name: Fetcher, kind: Concurrent, tasks: [BlockFetcher, StateFetcher] }"
    );
}

#[rstest]
fn standard_registry_covers_every_task(database: Database) {
    let pipeline = Pipeline::new(test_config(Arc::new(FakeChain::new(1)), database));

    assert_eq!(pipeline.registry().ids(), TaskId::iter().collect::<Vec<_>>());
}

/// A pipeline built over a registry lacking selected tasks fails before any report is created.
#[rstest]
#[tokio::test]
async fn pipeline_with_incomplete_registry_fails_early(database: Database) {
    let mut registry = TaskRegistry::new();
    registry.register(idle_task(TaskId::HeightMetaRetriever));
    let config = test_config(Arc::new(FakeChain::new(3)), database.clone());
    let pipeline = Pipeline::with_registry(config, registry);
    let mode = RunMode::Index { first_height: 1, batch_size: 10, force_single_height: false };

    let result = pipeline.start(CancellationToken::new(), PipelineOptions::new(mode)).await;

    assert_matches!(result, Err(IndexerError::ConfigError(_)));
    assert!(database.reports.find_not_completed(ReportKind::Index).await.unwrap().is_empty());
}
