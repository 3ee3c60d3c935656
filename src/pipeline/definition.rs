use std::collections::{HashSet, VecDeque};

use log::{debug, info};
use serde::Serialize;

use super::prototype::PipelineTask;
use super::resolver::Resolver;
use super::stage::{PipelineRun, Stage};
use super::task::Task;
use crate::error::{PipelensError, Result};
use crate::host::{BuildRef, Host};
use crate::status::Status;

/// Tasks sharing a stage name, in pipeline order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageGroup {
    pub name: String,
    pub tasks: Vec<PipelineTask>,
}

/// Static description of a pipeline: its task prototypes grouped into stages.
///
/// Built once from the host's job configuration; rendering it against an upstream run never
/// mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineDefinition {
    pub name: String,
    pub first_job: String,
    pub stages: Vec<StageGroup>,
}

impl PipelineDefinition {
    /// Walks downstream trigger edges breadth-first from `first_job`.
    ///
    /// Both automatic and manual edges are followed; each job appears once even when several
    /// upstream jobs trigger it. Stage groups are ordered by first appearance.
    ///
    /// # Errors
    ///
    /// Returns [`PipelensError::UnknownJob`] if `first_job` does not exist.
    pub fn discover(host: &dyn Host, name: &str, first_job: &str) -> Result<Self> {
        let first = host
            .job(first_job)
            .ok_or_else(|| PipelensError::UnknownJob(first_job.to_string()))?;

        let mut stages: Vec<StageGroup> = Vec::new();
        let mut visited = HashSet::from([first.name.as_str()]);
        let mut queue = VecDeque::from([first]);

        while let Some(job) = queue.pop_front() {
            let task = PipelineTask::for_job(job, job.name == first.name);
            match stages.iter_mut().find(|group| group.name == job.stage_name()) {
                Some(group) => group.tasks.push(task),
                None => stages.push(StageGroup {
                    name: job.stage_name().to_string(),
                    tasks: vec![task],
                }),
            }

            for downstream in host.downstream_of(&job.name) {
                if visited.insert(downstream.name.as_str()) {
                    queue.push_back(downstream);
                }
            }
        }

        debug!(
            "Discovered pipeline '{name}' with {} stages starting at {first_job}",
            stages.len()
        );

        Ok(Self {
            name: name.to_string(),
            first_job: first_job.to_string(),
            stages,
        })
    }

    pub fn tasks(&self) -> impl Iterator<Item = &PipelineTask> {
        self.stages.iter().flat_map(|group| group.tasks.iter())
    }

    /// Most recent started build of the first job, used when no run is requested.
    pub fn latest_run(&self, host: &dyn Host) -> Option<BuildRef> {
        host.builds_of(&self.first_job)
            .into_iter()
            .find_map(|build| build.reference())
    }

    /// Started build of the first job immediately preceding `run`.
    pub fn previous_run(&self, host: &dyn Host, run: &BuildRef) -> Option<BuildRef> {
        host.builds_of(&self.first_job)
            .into_iter()
            .filter_map(|build| build.reference())
            .find(|candidate| candidate.number < run.number)
    }

    /// Resolves every task against `upstream`.
    ///
    /// # Errors
    ///
    /// Returns an error if a fan-out task has no configurations.
    pub fn render(&self, resolver: &Resolver<'_>, upstream: Option<&BuildRef>) -> Result<PipelineView> {
        let stages = self
            .stages
            .iter()
            .map(|group| {
                let tasks = group
                    .tasks
                    .iter()
                    .map(|task| resolver.resolve(task, upstream))
                    .collect::<Result<Vec<_>>>()?;
                let status = Status::merge(tasks.iter().map(|task| task.status)).unwrap_or_default();
                Ok(StageView {
                    name: group.name.clone(),
                    status,
                    tasks,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let run = PipelineRun {
            upstream: upstream.cloned(),
            stages: stages
                .iter()
                .flat_map(|stage| stage.tasks.iter().map(Stage::from))
                .collect(),
        };

        info!(
            "Rendered pipeline '{}' for {}",
            self.name,
            upstream.map_or_else(|| "no run".to_string(), ToString::to_string)
        );

        Ok(PipelineView {
            pipeline: self.name.clone(),
            total_duration_millis: run.total_duration_millis(),
            stages,
            run,
        })
    }
}

/// Resolved stage group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub name: String,
    pub status: Status,
    pub tasks: Vec<Task>,
}

/// One rendered pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineView {
    pub pipeline: String,
    pub stages: Vec<StageView>,
    pub run: PipelineRun,
    pub total_duration_millis: u64,
}
