//! Targets and index versions.
//!
//! A target is a named set of tasks producing one family of derived facts. A version lists the targets it
//! introduced; the current version is the last one declared. Every version also runs the shared tasks. The
//! declaration is validated entirely when loaded, so lookups never meet an unknown task name.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use serde::Deserialize;

use crate::error::TargetsError;
use crate::pipeline::task::TaskId;
use crate::types::{TargetId, VersionId};

#[derive(Debug, Deserialize)]
struct RawTargets {
    versions: Vec<RawVersion>,
    shared_tasks: Vec<String>,
    available_targets: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    id: VersionId,
    targets: Vec<TargetId>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    id: TargetId,
    name: String,
    #[serde(default)]
    desc: String,
    tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    pub name: String,
    pub desc: String,
    pub tasks: Vec<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub id: VersionId,
    pub targets: Vec<TargetId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    versions: Vec<Version>,
    shared_tasks: Vec<TaskId>,
    targets: BTreeMap<TargetId, Target>,
}

fn parse_task(name: &str, context: impl Into<String>) -> Result<TaskId, TargetsError> {
    TaskId::from_str(name).map_err(|_| TargetsError::UnknownTask { task: name.to_string(), context: context.into() })
}

impl Targets {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TargetsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| TargetsError::Read { path: path.display().to_string(), source })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, TargetsError> {
        let raw: RawTargets = serde_json::from_str(content).map_err(|e| TargetsError::Malformed(e.to_string()))?;
        Self::try_from(raw)
    }

    /// Id of the last declared version.
    pub fn current_version_id(&self) -> VersionId {
        // at least one version is guaranteed at load
        self.versions.last().map(|v| v.id).unwrap_or_default()
    }

    /// `[1, current]`.
    pub fn all_versioned_version_ids(&self) -> Vec<VersionId> {
        self.versions.iter().map(|v| v.id).collect()
    }

    pub fn shared_tasks(&self) -> &[TaskId] {
        &self.shared_tasks
    }

    pub fn target(&self, id: TargetId) -> Result<&Target, TargetsError> {
        self.targets.get(&id).ok_or(TargetsError::UnknownTarget(id))
    }

    /// Shared tasks followed by the tasks of every target of the given versions, without duplicates and in
    /// order of first occurrence.
    pub fn tasks_by_version_ids(&self, version_ids: &[VersionId]) -> Result<Vec<TaskId>, TargetsError> {
        let mut target_ids = Vec::new();
        for id in version_ids {
            let version = self.versions.iter().find(|v| v.id == *id).ok_or(TargetsError::UnknownVersion(*id))?;
            target_ids.extend(version.targets.iter().copied());
        }
        self.tasks_by_target_ids(&target_ids)
    }

    /// Shared tasks followed by the tasks of the given targets, without duplicates and in order of first
    /// occurrence.
    pub fn tasks_by_target_ids(&self, target_ids: &[TargetId]) -> Result<Vec<TaskId>, TargetsError> {
        let mut tasks = self.shared_tasks.clone();
        for id in target_ids {
            tasks.extend(self.target(*id)?.tasks.iter().copied());
        }
        Ok(tasks.into_iter().unique().collect())
    }

    /// Versions whose tasks still have to run on a height stored with `stored` version.
    ///
    /// An up to date height, or no stored height at all, needs every version. A height stored by a newer
    /// version than the current one means the running code is outdated and fails.
    pub fn missing_version_ids(&self, stored: Option<VersionId>) -> Result<Vec<VersionId>, TargetsError> {
        let current = self.current_version_id();
        match stored {
            None => Ok(self.all_versioned_version_ids()),
            Some(stored) if stored == current => Ok(self.all_versioned_version_ids()),
            Some(stored) if stored < current => Ok((stored + 1..=current).collect()),
            Some(stored) => Err(TargetsError::VersionAhead { stored, current }),
        }
    }
}

impl TryFrom<RawTargets> for Targets {
    type Error = TargetsError;

    fn try_from(raw: RawTargets) -> Result<Self, Self::Error> {
        if raw.versions.is_empty() {
            return Err(TargetsError::Malformed("no version declared".to_string()));
        }

        let shared_tasks =
            raw.shared_tasks.iter().map(|name| parse_task(name, "shared tasks")).collect::<Result<Vec<_>, _>>()?;

        let mut targets = BTreeMap::new();
        for target in raw.available_targets {
            let tasks = target
                .tasks
                .iter()
                .map(|name| parse_task(name, format!("target {}", target.id)))
                .collect::<Result<Vec<_>, _>>()?;
            let id = target.id;
            let parsed = Target { id, name: target.name, desc: target.desc, tasks };
            if targets.insert(id, parsed).is_some() {
                return Err(TargetsError::Malformed(format!("target {id} is declared twice")));
            }
        }

        let mut declared = BTreeSet::new();
        let mut versions = Vec::with_capacity(raw.versions.len());
        for (position, version) in raw.versions.into_iter().enumerate() {
            let expected = position as VersionId + 1;
            if version.id != expected {
                return Err(TargetsError::Malformed(format!(
                    "versions must be numbered from 1 without gaps, found {} where {} was expected",
                    version.id, expected
                )));
            }
            for target_id in &version.targets {
                if !targets.contains_key(target_id) {
                    return Err(TargetsError::UnknownTarget(*target_id));
                }
                declared.insert(*target_id);
            }
            versions.push(Version { id: version.id, targets: version.targets });
        }

        for id in targets.keys().filter(|id| !declared.contains(*id)) {
            tracing::warn!(target_id = id, "Target is not part of any version and only runs when selected explicitly");
        }

        Ok(Self { versions, shared_tasks, targets })
    }
}
