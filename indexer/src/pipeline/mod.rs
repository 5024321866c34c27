pub mod payload;
pub mod registry;
pub mod sink;
pub mod source;
pub mod stage;
pub mod task;

use std::sync::Arc;
use std::time::Instant;

use itertools::Itertools;
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::core::client::database::OptionalExt;
use crate::core::config::Config;
use crate::error::{IndexerError, IndexerResult};
use crate::pipeline::payload::PayloadPool;
use crate::pipeline::registry::TaskRegistry;
use crate::pipeline::sink::Sink;
use crate::pipeline::source::Source;
use crate::pipeline::stage::StageRunner;
use crate::pipeline::task::TaskId;
use crate::types::constant::UNVERSIONED;
use crate::types::params::{PipelineOptions, RunMode};
use crate::types::report::Report;
use crate::types::VersionId;

/// What a run processes: its heights, the tasks it runs on them and the version committed heights get.
struct RunPlan {
    source: Source,
    tasks: Vec<TaskId>,
    sink_version: Option<VersionId>,
}

/// Drives heights from a [`Source`] through every stage and commits them through the [`Sink`].
pub struct Pipeline {
    config: Arc<Config>,
    registry: TaskRegistry,
}

impl Pipeline {
    /// Pipeline running the standard task implementations.
    pub fn new(config: Arc<Config>) -> Self {
        let registry = crate::tasks::standard_registry(&config);
        Self { config, registry }
    }

    pub fn with_registry(config: Arc<Config>, registry: TaskRegistry) -> Self {
        Self { config, registry }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Runs the heights selected by `options` one after the other and returns the completed report.
    ///
    /// The first failing height stops the run. Heights committed before it stay committed and the report is
    /// completed and stored in every case once it was created.
    pub async fn start(&self, cancel: CancellationToken, options: PipelineOptions) -> IndexerResult<Report> {
        let current_version = self.config.targets().current_version_id();
        let plan = self.plan(&options.mode, current_version).await?;
        let stages = self.registry.stages(&plan.tasks, self.config.retry_params(), options.concurrent_stages)?;

        let reports = self.config.database().reports.clone();
        let mut report = Report::new(
            options.mode.kind(),
            current_version,
            plan.source.start_height(),
            plan.source.end_height(),
        );
        report = reports.create(report).await?;

        let span = info_span!("pipeline", kind = %report.kind, report_id = %report.id);
        let sink = Sink::new(self.config.database().syncables.clone(), plan.sink_version);
        let started = Instant::now();

        info!(
            parent: &span,
            start_height = report.start_height,
            end_height = report.end_height,
            index_version = current_version,
            tasks = %plan.tasks.iter().join(","),
            "Pipeline run started"
        );
        // heights first created by a run restricted to some targets are left for backfill to complete
        let payload_version = plan.sink_version.unwrap_or(UNVERSIONED);
        let (successes, outcome) = self
            .run_heights(&cancel, plan.source, &stages, &sink, report.id, payload_version)
            .instrument(span.clone())
            .await;

        let error_msg = outcome.as_ref().err().map(|e| e.to_string());
        report.complete(successes, error_msg, started.elapsed().as_millis() as u64);

        let saved = reports.save(report).await;
        match (outcome, saved) {
            (Ok(()), Ok(report)) => {
                info!(
                    parent: &span,
                    success_count = report.success_count,
                    duration_ms = report.duration_ms,
                    "Pipeline run completed"
                );
                Ok(report)
            }
            (Ok(()), Err(e)) => Err(e.into()),
            (Err(e), Ok(report)) => {
                warn!(
                    parent: &span,
                    success_count = report.success_count,
                    error_count = report.error_count,
                    error = %e,
                    "Pipeline run stopped"
                );
                Err(e)
            }
            (Err(e), Err(save_error)) => {
                error!(parent: &span, error = %save_error, "Failed to store the report of a failed run");
                Err(e)
            }
        }
    }

    async fn plan(&self, mode: &RunMode, current_version: VersionId) -> IndexerResult<RunPlan> {
        let targets = self.config.targets();
        let database = self.config.database();

        let (source, tasks, sink_version) = match mode {
            RunMode::Index { first_height, batch_size, force_single_height } => {
                let source = Source::index(
                    database.syncables.as_ref(),
                    self.config.chain_client().as_ref(),
                    *first_height,
                    *batch_size,
                    *force_single_height,
                )
                .await?;
                let tasks = targets.tasks_by_version_ids(&targets.all_versioned_version_ids())?;
                (source, tasks, Some(current_version))
            }
            RunMode::Backfill { target_ids } => {
                let source = Source::backfill(database.syncables.as_ref(), current_version).await?;
                if target_ids.is_empty() {
                    let smallest = database.syncables.find_smallest_index_version().await.optional()?;
                    let missing = targets.missing_version_ids(smallest)?;
                    info!(smallest_version = ?smallest, missing_versions = ?missing, "Backfilling missing versions");
                    (source, targets.tasks_by_version_ids(&missing)?, Some(current_version))
                } else {
                    (source, targets.tasks_by_target_ids(target_ids)?, None)
                }
            }
            RunMode::Reindex { start_height, end_height, target_ids } => {
                let source = Source::reindex(database.syncables.as_ref(), *start_height, *end_height).await?;
                if target_ids.is_empty() {
                    let tasks = targets.tasks_by_version_ids(&targets.all_versioned_version_ids())?;
                    (source, tasks, Some(current_version))
                } else {
                    (source, targets.tasks_by_target_ids(target_ids)?, None)
                }
            }
        };

        Ok(RunPlan { source, tasks: with_required_tasks(tasks), sink_version })
    }

    /// Returns the number of committed heights and how the loop ended.
    async fn run_heights(
        &self,
        cancel: &CancellationToken,
        mut source: Source,
        stages: &[StageRunner],
        sink: &Sink,
        report_id: Uuid,
        index_version: VersionId,
    ) -> (u64, IndexerResult<()>) {
        let mut pool = PayloadPool::default();
        let mut successes = 0;

        while source.advance() {
            if cancel.is_cancelled() {
                info!(height = source.current(), "Cancellation requested, stopping before the next height");
                return (successes, Err(IndexerError::Cancelled));
            }

            let height = source.current();
            let mut payload = pool.acquire(height, report_id, index_version);
            let result = async {
                for stage in stages {
                    stage.run(cancel, &mut payload).await?;
                }
                sink.consume(&payload).await
            }
            .instrument(info_span!("height", height))
            .await;
            pool.release(payload);

            if let Err(e) = result {
                return (successes, Err(e));
            }
            successes += 1;
        }
        (successes, Ok(()))
    }
}

/// Prepends the tasks a height cannot be tracked without when the selection lacks them.
fn with_required_tasks(tasks: Vec<TaskId>) -> Vec<TaskId> {
    let missing: Vec<TaskId> = TaskId::iter().filter(|id| id.is_required() && !tasks.contains(id)).collect();
    missing.into_iter().chain(tasks).collect()
}
