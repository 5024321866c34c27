use std::collections::BTreeMap;
use std::sync::Arc;

use strum::IntoEnumIterator;

use crate::error::{IndexerError, IndexerResult};
use crate::pipeline::stage::{RunnerKind, StageName, StageRunner};
use crate::pipeline::task::{RetryingTask, Task, TaskId};
use crate::types::params::RetryParams;

/// Task implementations keyed by their id.
///
/// Built once at startup and handed to the pipeline, so that tests can run pipelines over their own task
/// sets side by side.
#[derive(Default, Clone)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskId, Arc<dyn Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `task` under its own id, replacing any earlier registration.
    pub fn register(&mut self, task: Arc<dyn Task>) -> &mut Self {
        self.tasks.insert(task.id(), task);
        self
    }

    pub fn get(&self, id: TaskId) -> Option<&Arc<dyn Task>> {
        self.tasks.get(&id)
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.keys().copied().collect()
    }

    /// Builds the stage runners of a run restricted to `whitelist`. Stages left without any task are skipped.
    ///
    /// Every whitelisted task must be registered. Each one is wrapped in a [`RetryingTask`].
    pub fn stages(
        &self,
        whitelist: &[TaskId],
        retry: RetryParams,
        concurrent_stages: bool,
    ) -> IndexerResult<Vec<StageRunner>> {
        if let Some(missing) = whitelist.iter().find(|id| !self.tasks.contains_key(id)) {
            return Err(IndexerError::ConfigError(format!("task {missing} is selected but not registered")));
        }

        let mut stages = Vec::new();
        for stage in StageName::iter() {
            let tasks: Vec<Arc<dyn Task>> = self
                .tasks
                .iter()
                .filter(|(id, _)| id.stage() == stage && whitelist.contains(id))
                .map(|(_, task)| Arc::new(RetryingTask::new(task.clone(), retry)) as Arc<dyn Task>)
                .collect();
            if tasks.is_empty() {
                continue;
            }

            let kind = if concurrent_stages && stage.is_concurrent() {
                RunnerKind::Concurrent
            } else {
                RunnerKind::Sequential
            };
            stages.push(StageRunner::new(stage, kind, tasks));
        }
        Ok(stages)
    }
}
