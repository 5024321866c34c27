use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use strum_macros::{AsRefStr, Display, EnumIter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{IndexerError, IndexerResult, TaskError};
use crate::pipeline::payload::Payload;
use crate::pipeline::task::{Task, TaskId, TaskOutput};
use crate::types::Height;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, AsRefStr)]
pub enum StageName {
    Setup,
    Syncer,
    Fetcher,
    Parser,
    Sequencer,
    Aggregator,
    Analyzer,
    Persistor,
}

impl StageName {
    /// Stages whose tasks fill disjoint payload fields and may run in parallel.
    pub fn is_concurrent(self) -> bool {
        matches!(
            self,
            StageName::Fetcher | StageName::Parser | StageName::Sequencer | StageName::Aggregator | StageName::Persistor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerKind {
    Sequential,
    Concurrent,
}

/// Runs the tasks of one stage against a payload.
pub struct StageRunner {
    name: StageName,
    kind: RunnerKind,
    tasks: Vec<Arc<dyn Task>>,
}

impl std::fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRunner")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("tasks", &self.task_ids())
            .finish()
    }
}

impl StageRunner {
    pub fn new(name: StageName, kind: RunnerKind, tasks: Vec<Arc<dyn Task>>) -> Self {
        Self { name, kind, tasks }
    }

    pub fn name(&self) -> StageName {
        self.name
    }

    pub fn kind(&self) -> RunnerKind {
        self.kind
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn run(&self, cancel: &CancellationToken, payload: &mut Payload) -> IndexerResult<()> {
        let started = Instant::now();
        match self.kind {
            RunnerKind::Sequential => self.run_sequential(cancel, payload).await?,
            RunnerKind::Concurrent => self.run_concurrent(cancel, payload).await?,
        }
        debug!(
            stage = %self.name,
            tasks = self.tasks.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Stage completed"
        );
        Ok(())
    }

    /// Each output is applied before the next task starts, so later tasks see earlier results.
    async fn run_sequential(&self, cancel: &CancellationToken, payload: &mut Payload) -> IndexerResult<()> {
        for task in &self.tasks {
            let output = task
                .run(cancel, payload)
                .await
                .map_err(|e| self.failure(task.id(), payload.current_height, e))?;
            output.apply(payload);
        }
        Ok(())
    }

    /// Waits for every task to settle. The payload is only touched when all of them succeeded; otherwise the
    /// failure of the first task in registration order is returned.
    async fn run_concurrent(&self, cancel: &CancellationToken, payload: &mut Payload) -> IndexerResult<()> {
        let results = {
            let view: &Payload = payload;
            join_all(self.tasks.iter().map(|task| task.run(cancel, view))).await
        };

        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(results.len());
        for (task, result) in self.tasks.iter().zip(results) {
            match result {
                Ok(output) => outputs.push(output),
                Err(e) => return Err(self.failure(task.id(), payload.current_height, e)),
            }
        }

        for output in outputs {
            output.apply(payload);
        }
        Ok(())
    }

    fn failure(&self, task: TaskId, height: Height, err: TaskError) -> IndexerError {
        match err {
            TaskError::Cancelled => IndexerError::Cancelled,
            source => {
                error!(stage = %self.name, task = %task, height, error = %source, "Task failed");
                IndexerError::StageFailed { stage: self.name, task, height, source }
            }
        }
    }
}
