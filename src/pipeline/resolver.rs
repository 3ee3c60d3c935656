use chrono::{DateTime, Utc};
use log::debug;

use super::prototype::{PipelineTask, TaskPrototype};
use super::task::Task;
use crate::error::Result;
use crate::host::{Build, BuildRef, BuildState, Host};
use crate::links;
use crate::status::Status;
use crate::token::{BuildContext, ExpanderRegistry, NameEvaluator};

/// Resolves task prototypes into snapshots against the current host state.
///
/// Holds no state of its own beyond the host handle: every call re-reads the host, so two calls
/// in the same render may observe builds progressing in between.
pub struct Resolver<'a> {
    pub(super) host: &'a dyn Host,
    names: NameEvaluator<'a>,
    now: DateTime<Utc>,
}

impl<'a> Resolver<'a> {
    pub fn new(host: &'a dyn Host, expanders: &'a ExpanderRegistry) -> Self {
        Self {
            host,
            names: NameEvaluator::new(expanders),
            now: Utc::now(),
        }
    }

    /// Pins the clock used to estimate the progress of running builds.
    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Resolves a pipeline node, aggregating fan-out branches.
    ///
    /// # Errors
    ///
    /// Returns an error if a fan-out node has no branches.
    pub fn resolve(&self, task: &PipelineTask, upstream: Option<&BuildRef>) -> Result<Task> {
        match task {
            PipelineTask::Single(prototype) => Ok(self.resolve_latest(prototype, upstream)),
            PipelineTask::FanOut { base, branches } => self.aggregate(base, branches, upstream),
        }
    }

    /// Resolves `prototype` against the build of its job triggered by `upstream`.
    ///
    /// Without an upstream run, or when the job has no build in that run's lineage, the task is
    /// `IDLE` and links to the job itself. Otherwise status and link follow the located build:
    /// queued items link to the queue, running builds to their console and completed builds to
    /// their page.
    pub fn resolve_latest(&self, prototype: &TaskPrototype, upstream: Option<&BuildRef>) -> Task {
        let Some(build) = upstream.and_then(|run| self.find_build(prototype, run)) else {
            return Task::idle(prototype, self.resolve_name(prototype, None));
        };

        let name = self.resolve_name(prototype, Some(build));
        let (status, link) = match &build.state {
            BuildState::Queued { queue_id } => (Status::Queued, links::queue_item_url(*queue_id)),
            BuildState::InProgress => (
                Status::Running,
                build.console_link().unwrap_or_else(|| prototype.link()),
            ),
            BuildState::Completed { result } => (
                Status::from(*result),
                build
                    .number
                    .map_or_else(|| prototype.link(), |n| links::build_url(&build.job, n)),
            ),
        };

        let started = !build.is_queued();
        Task {
            id: prototype.id.clone(),
            name,
            status,
            start_time: build.start_time.filter(|_| started),
            duration_millis: build.duration_millis.filter(|_| status.is_terminal()),
            link,
            rebuildable: status.is_rebuildable(),
            manual: prototype.manual,
            build_number: build.number,
            progress: self.progress(build).filter(|_| status.is_running()),
        }
    }

    pub(super) fn find_build(&self, prototype: &TaskPrototype, upstream: &BuildRef) -> Option<&'a Build> {
        let build = self.host.find_build_triggered_by(&prototype.job, upstream);
        if build.is_none() {
            debug!("No build of {} traces back to {upstream}", prototype.job);
        }
        build
    }

    /// Evaluates the prototype's name template against `build`, falling back to its static name.
    pub(super) fn resolve_name(&self, prototype: &TaskPrototype, build: Option<&Build>) -> String {
        let context = build
            .filter(|build| !build.is_queued())
            .map(|build| BuildContext {
                host: self.host,
                build,
                kind: prototype.kind,
            });
        self.names
            .evaluate_name(prototype.template(), &prototype.name, context)
    }

    fn progress(&self, build: &Build) -> Option<u8> {
        let start = build.start_time?;
        let estimated = build.estimated_duration_millis.filter(|&e| e > 0)?;
        let elapsed = u64::try_from((self.now - start).num_milliseconds()).unwrap_or(0);
        let percent = (elapsed.saturating_mul(100) / estimated).min(99);
        u8::try_from(percent).ok()
    }
}
