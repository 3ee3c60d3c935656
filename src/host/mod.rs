//! Read-only view of the CI server's job configuration and build history.
//!
//! The status engine never reaches for global state: every resolver call receives a `&dyn Host`
//! handle and performs its lookups through it.

mod snapshot;
mod source;

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::links;
use crate::status::Status;

pub use snapshot::{HostSnapshot, SnapshotHost};
pub use source::{load_snapshot, SnapshotClient};

/// Environment variables recorded for a build.
pub type Environment = HashMap<String, String>;

/// Failure reading host-side data for a build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Unable to read environment of {build}: {reason}")]
    EnvironmentUnavailable { build: String, reason: String },
}

/// Kind of job, used to pick a macro expansion strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    #[default]
    FreeStyle,
    /// Multi-configuration job that fans out over its axes.
    Matrix,
    /// One concrete configuration of a matrix job.
    MatrixConfiguration,
}

/// A fan-out axis of a matrix job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub values: Vec<String>,
}

/// Static configuration of a CI job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Job {
    /// Full job name (e.g., "deploy" or "Multi/axis=foo")
    pub name: String,
    #[serde(default)]
    pub kind: JobKind,
    /// Display name of the task; defaults to the job name
    pub task_name: Option<String>,
    /// Macro expression used to compute the display name from a build's environment
    pub task_name_macro: Option<String>,
    /// Stage this job is grouped under; defaults to the job name
    pub stage_name: Option<String>,
    /// Jobs that trigger this one automatically
    #[serde(default)]
    pub upstream: Vec<String>,
    /// Jobs from which this one is promoted by hand
    #[serde(default)]
    pub manual_upstream: Vec<String>,
    #[serde(default)]
    pub axes: Vec<Axis>,
    /// Axis label of a matrix configuration (e.g., "axis=foo")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combination: Option<String>,
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: JobKind::FreeStyle,
            task_name: None,
            task_name_macro: None,
            stage_name: None,
            upstream: Vec::new(),
            manual_upstream: Vec::new(),
            axes: Vec::new(),
            combination: None,
        }
    }

    pub fn task_name(&self) -> &str {
        self.task_name.as_deref().unwrap_or(&self.name)
    }

    pub fn stage_name(&self) -> &str {
        self.stage_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_fan_out(&self) -> bool {
        self.kind == JobKind::Matrix
    }

    pub fn is_configuration(&self) -> bool {
        self.kind == JobKind::MatrixConfiguration
    }

    pub fn has_automatic_upstream(&self) -> bool {
        !self.upstream.is_empty()
    }

    pub fn has_manual_upstream(&self) -> bool {
        !self.manual_upstream.is_empty()
    }

    /// Returns true if `upstream_job` triggers this job, automatically or by hand.
    pub fn is_triggered_by(&self, upstream_job: &str) -> bool {
        self.upstream.iter().chain(&self.manual_upstream).any(|j| j == upstream_job)
    }

    /// Axis labels of every configuration, in declaration order.
    ///
    /// The cartesian product is taken axis by axis, so for axes `a: [x, y]` and `b: [1]`
    /// the labels are `a=x,b=1` and `a=y,b=1`. A job without axes has no combinations.
    pub fn combinations(&self) -> Vec<String> {
        if self.axes.is_empty() {
            return vec![];
        }

        self.axes.iter().fold(vec![String::new()], |prefixes, axis| {
            prefixes
                .iter()
                .flat_map(|prefix| {
                    axis.values.iter().map(move |value| {
                        if prefix.is_empty() {
                            format!("{}={value}", axis.name)
                        } else {
                            format!("{prefix},{}={value}", axis.name)
                        }
                    })
                })
                .collect()
        })
    }

    /// Concrete configuration jobs of a matrix job, in declaration order.
    ///
    /// Configurations inherit the parent's naming and trigger edges.
    pub fn configurations(&self) -> Vec<Job> {
        if !self.is_fan_out() {
            return vec![];
        }

        self.combinations()
            .into_iter()
            .map(|combination| Job {
                name: format!("{}/{combination}", self.name),
                kind: JobKind::MatrixConfiguration,
                task_name: self.task_name.clone(),
                task_name_macro: self.task_name_macro.clone(),
                stage_name: self.stage_name.clone(),
                upstream: self.upstream.clone(),
                manual_upstream: self.manual_upstream.clone(),
                axes: Vec::new(),
                combination: Some(combination),
            })
            .collect()
    }
}

/// Identity of one build of one job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildRef {
    pub job: String,
    pub number: u64,
}

impl BuildRef {
    pub fn new(job: impl Into<String>, number: u64) -> Self {
        Self {
            job: job.into(),
            number,
        }
    }
}

impl fmt::Display for BuildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.job, self.number)
    }
}

/// Terminal result recorded for a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
}

impl From<BuildResult> for Status {
    fn from(result: BuildResult) -> Self {
        match result {
            BuildResult::Success => Status::Success,
            BuildResult::Unstable => Status::Unstable,
            BuildResult::Failure => Status::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum BuildState {
    Queued {
        #[serde(rename = "queue-id")]
        queue_id: u64,
    },
    InProgress,
    Completed { result: BuildResult },
}

/// Why a build was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Cause {
    /// Triggered automatically when an upstream build finished.
    Upstream { job: String, number: u64 },
    /// Promoted by hand from an upstream build through the pipeline view.
    Manual { job: String, number: u64 },
    /// User, timer, SCM or any other cause without upstream lineage.
    #[serde(other)]
    Other,
}

impl Cause {
    pub fn upstream_build(&self) -> Option<BuildRef> {
        match self {
            Self::Upstream { job, number } | Self::Manual { job, number } => {
                Some(BuildRef::new(job.as_str(), *number))
            }
            Self::Other => None,
        }
    }
}

/// One build of a job, queued, running or finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Build {
    pub job: String,
    /// Build number; absent while the build is still waiting in the queue
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(flatten)]
    pub state: BuildState,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_millis: Option<u64>,
    #[serde(default)]
    pub estimated_duration_millis: Option<u64>,
    #[serde(default)]
    pub causes: Vec<Cause>,
}

impl Build {
    pub fn queued(job: impl Into<String>, queue_id: u64) -> Self {
        Self::with_state(job, None, BuildState::Queued { queue_id })
    }

    pub fn in_progress(job: impl Into<String>, number: u64) -> Self {
        Self::with_state(job, Some(number), BuildState::InProgress)
    }

    pub fn completed(job: impl Into<String>, number: u64, result: BuildResult) -> Self {
        Self::with_state(job, Some(number), BuildState::Completed { result })
    }

    fn with_state(job: impl Into<String>, number: Option<u64>, state: BuildState) -> Self {
        Self {
            job: job.into(),
            number,
            state,
            start_time: None,
            duration_millis: None,
            estimated_duration_millis: None,
            causes: Vec::new(),
        }
    }

    #[must_use]
    pub fn caused_by(mut self, cause: Cause) -> Self {
        self.causes.push(cause);
        self
    }

    #[must_use]
    pub fn started_at(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    #[must_use]
    pub fn took(mut self, duration_millis: u64) -> Self {
        self.duration_millis = Some(duration_millis);
        self
    }

    #[must_use]
    pub fn estimated(mut self, estimated_duration_millis: u64) -> Self {
        self.estimated_duration_millis = Some(estimated_duration_millis);
        self
    }

    pub fn reference(&self) -> Option<BuildRef> {
        self.number.map(|number| BuildRef::new(self.job.as_str(), number))
    }

    pub fn is_queued(&self) -> bool {
        matches!(self.state, BuildState::Queued { .. })
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == BuildState::InProgress
    }

    pub fn terminal_result(&self) -> Option<BuildResult> {
        match self.state {
            BuildState::Completed { result } => Some(result),
            _ => None,
        }
    }

    pub fn console_link(&self) -> Option<String> {
        self.number.map(|number| links::console_url(&self.job, number))
    }
}

/// Read-only capabilities the status engine needs from the CI server.
pub trait Host {
    fn job(&self, name: &str) -> Option<&Job>;

    /// Every job the server knows about, in registration order.
    fn jobs(&self) -> Vec<&Job>;

    /// Builds of `job`, most recent first. Queued items count as more recent than started builds.
    fn builds_of(&self, job: &str) -> Vec<&Build>;

    /// Most recent build of `job` whose trigger lineage traces back to `cause`.
    fn find_build_triggered_by(&self, job: &str, cause: &BuildRef) -> Option<&Build>;

    fn environment(&self, build: &Build) -> Result<Environment, HostError>;

    fn most_recent_build_of(&self, job: &str) -> Option<&Build> {
        self.builds_of(job).into_iter().next()
    }

    /// Non-configuration jobs triggered by `job`, automatically or by hand.
    fn downstream_of(&self, job: &str) -> Vec<&Job> {
        self.jobs()
            .into_iter()
            .filter(|candidate| !candidate.is_configuration() && candidate.is_triggered_by(job))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_job(axes: Vec<Axis>) -> Job {
        Job {
            kind: JobKind::Matrix,
            task_name: Some("task".to_string()),
            axes,
            ..Job::new("Multi")
        }
    }

    fn axis(name: &str, values: &[&str]) -> Axis {
        Axis {
            name: name.to_string(),
            values: values.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_combinations_single_axis() {
        let job = matrix_job(vec![axis("axis", &["foo", "bar"])]);
        assert_eq!(job.combinations(), vec!["axis=foo", "axis=bar"]);
    }

    #[test]
    fn test_combinations_cartesian_product_in_declaration_order() {
        let job = matrix_job(vec![axis("os", &["linux", "mac"]), axis("jdk", &["8", "11"])]);
        assert_eq!(
            job.combinations(),
            vec![
                "os=linux,jdk=8",
                "os=linux,jdk=11",
                "os=mac,jdk=8",
                "os=mac,jdk=11"
            ]
        );
    }

    #[test]
    fn test_combinations_without_axes() {
        assert!(Job::new("plain").combinations().is_empty());
    }

    #[test]
    fn test_configurations_inherit_parent_naming() {
        let job = matrix_job(vec![axis("axis", &["foo"])]);
        let configurations = job.configurations();

        assert_eq!(configurations.len(), 1);
        assert_eq!(configurations[0].name, "Multi/axis=foo");
        assert_eq!(configurations[0].kind, JobKind::MatrixConfiguration);
        assert_eq!(configurations[0].task_name(), "task");
        assert_eq!(configurations[0].combination.as_deref(), Some("axis=foo"));
    }

    #[test]
    fn test_configurations_of_free_style_job() {
        assert!(Job::new("plain").configurations().is_empty());
    }

    #[test]
    fn test_build_links_and_state() {
        let running = Build::in_progress("test", 1);
        assert!(running.is_in_progress());
        assert_eq!(running.console_link().as_deref(), Some("job/test/1/console"));

        let queued = Build::queued("test", 9);
        assert!(queued.is_queued());
        assert!(queued.reference().is_none());
        assert!(queued.console_link().is_none());

        let failed = Build::completed("test", 2, BuildResult::Failure);
        assert_eq!(failed.terminal_result(), Some(BuildResult::Failure));
        assert_eq!(Status::from(BuildResult::Failure), Status::Failed);
    }

    #[test]
    fn test_build_deserializes_from_kebab_case() {
        let json = r#"{
            "job": "deploy",
            "number": 4,
            "state": "completed",
            "result": "UNSTABLE",
            "start-time": "2024-05-01T10:00:00Z",
            "duration-millis": 1500,
            "causes": [
                {"type": "manual", "job": "build", "number": 3},
                {"type": "user"}
            ]
        }"#;

        let build: Build = serde_json::from_str(json).unwrap();

        assert_eq!(build.terminal_result(), Some(BuildResult::Unstable));
        assert_eq!(build.duration_millis, Some(1500));
        assert_eq!(
            build.causes,
            vec![
                Cause::Manual {
                    job: "build".to_string(),
                    number: 3
                },
                Cause::Other
            ]
        );
    }

    #[test]
    fn test_queued_build_deserializes_queue_id() {
        let json = r#"{"job": "deploy", "state": "queued", "queue-id": 17}"#;
        let build: Build = serde_json::from_str(json).unwrap();
        assert_eq!(build.state, BuildState::Queued { queue_id: 17 });
        assert_eq!(build.number, None);
    }
}
