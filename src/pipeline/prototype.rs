use serde::Serialize;

use crate::host::{Job, JobKind};
use crate::links;

/// Static template of one job acting as a pipeline task, independent of any run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPrototype {
    pub id: String,
    /// Static display name, also the fallback when the name template cannot be evaluated
    pub name: String,
    /// Macro expression evaluated against the located build, if configured
    pub name_template: Option<String>,
    /// Only advanced by explicit human promotion
    pub manual: bool,
    /// Name of the underlying job
    pub job: String,
    pub kind: JobKind,
}

impl TaskPrototype {
    /// Builds the prototype of `job`.
    ///
    /// A job is manual when it is not the first in its chain, no upstream job triggers it
    /// automatically and it has at least one manual promotion edge. Matrix configurations are
    /// named after their parent's task name followed by their axis label, and so is their name
    /// template.
    pub fn resolve(job: &Job, is_first_in_chain: bool) -> Self {
        let manual =
            !is_first_in_chain && !job.has_automatic_upstream() && job.has_manual_upstream();

        let labelled = |text: &str| match &job.combination {
            Some(combination) => format!("{text} {combination}"),
            None => text.to_string(),
        };

        Self {
            id: job.name.clone(),
            name: labelled(job.task_name()),
            name_template: job.task_name_macro.as_deref().map(labelled),
            manual,
            job: job.name.clone(),
            kind: job.kind,
        }
    }

    /// Template handed to the name evaluator: the macro if configured, else the static name.
    pub fn template(&self) -> &str {
        self.name_template.as_deref().unwrap_or(&self.name)
    }

    /// Link used before the job has ever run for the rendered upstream run.
    pub fn link(&self) -> String {
        links::job_url(&self.job)
    }
}

/// One node of a pipeline: a plain job or a fan-out job with one prototype per configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PipelineTask {
    Single(TaskPrototype),
    FanOut {
        base: TaskPrototype,
        branches: Vec<TaskPrototype>,
    },
}

impl PipelineTask {
    /// Matrix jobs without any configuration resolve against their own builds, like a plain job.
    pub fn for_job(job: &Job, is_first_in_chain: bool) -> Self {
        let base = TaskPrototype::resolve(job, is_first_in_chain);
        let configurations = job.configurations();
        if configurations.is_empty() {
            return Self::Single(base);
        }

        let branches = configurations
            .iter()
            .map(|configuration| TaskPrototype::resolve(configuration, is_first_in_chain))
            .collect();

        Self::FanOut { base, branches }
    }

    pub fn prototype(&self) -> &TaskPrototype {
        match self {
            Self::Single(prototype) => prototype,
            Self::FanOut { base, .. } => base,
        }
    }
}
