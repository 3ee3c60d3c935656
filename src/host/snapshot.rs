use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{Build, BuildRef, BuildState, Environment, Host, HostError, Job};

/// Exported state of a CI server: job configuration, build history and queue.
///
/// Queued items are listed among `builds` with `state = "queued"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostSnapshot {
    #[serde(default)]
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub builds: Vec<Build>,
    /// Build environments keyed by `<job>#<number>`
    #[serde(default)]
    pub environments: HashMap<String, Environment>,
    /// Builds (`<job>#<number>`) whose environment cannot be read
    #[serde(default)]
    pub unreadable_environments: Vec<String>,
}

/// In-memory host backed by a [`HostSnapshot`].
///
/// Matrix jobs are expanded into their configuration jobs when the snapshot is indexed, so
/// configurations can be looked up by their full name (e.g., "Multi/axis=foo").
pub struct SnapshotHost {
    jobs: IndexMap<String, Job>,
    builds: HashMap<String, Vec<Build>>,
    environments: HashMap<String, Environment>,
    unreadable_environments: HashSet<String>,
}

impl SnapshotHost {
    pub fn new(snapshot: HostSnapshot) -> Self {
        let mut jobs = IndexMap::new();
        for job in snapshot.jobs {
            for configuration in job.configurations() {
                jobs.insert(configuration.name.clone(), configuration);
            }
            jobs.insert(job.name.clone(), job);
        }

        let mut builds: HashMap<String, Vec<Build>> = HashMap::new();
        for build in snapshot.builds {
            builds.entry(build.job.clone()).or_default().push(build);
        }
        for history in builds.values_mut() {
            history.sort_by_key(|build| std::cmp::Reverse(recency(build)));
        }

        debug!(
            "Indexed host snapshot with {} jobs and {} build histories",
            jobs.len(),
            builds.len()
        );

        Self {
            jobs,
            builds,
            environments: snapshot.environments,
            unreadable_environments: snapshot.unreadable_environments.into_iter().collect(),
        }
    }

    fn build(&self, reference: &BuildRef) -> Option<&Build> {
        self.builds
            .get(&reference.job)?
            .iter()
            .find(|build| build.number == Some(reference.number))
    }

    /// Returns true if `build` is `target` or was caused, directly or through any number of
    /// upstream and manual hops, by `target`.
    fn traces_back_to(
        &self,
        build: &Build,
        target: &BuildRef,
        visited: &mut HashSet<BuildRef>,
    ) -> bool {
        if build.reference().as_ref() == Some(target) {
            return true;
        }

        build
            .causes
            .iter()
            .filter_map(super::Cause::upstream_build)
            .any(|cause| {
                if cause == *target {
                    return true;
                }
                if !visited.insert(cause.clone()) {
                    return false;
                }
                self.build(&cause)
                    .is_some_and(|upstream| self.traces_back_to(upstream, target, visited))
            })
    }
}

/// Sort key placing queued items ahead of started builds, newest first within each group.
fn recency(build: &Build) -> (bool, u64) {
    match build.state {
        BuildState::Queued { queue_id } => (true, queue_id),
        _ => (false, build.number.unwrap_or(0)),
    }
}

fn environment_key(build: &Build) -> Option<String> {
    build.reference().map(|reference| reference.to_string())
}

impl Host for SnapshotHost {
    fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.get(name)
    }

    fn jobs(&self) -> Vec<&Job> {
        self.jobs.values().collect()
    }

    fn builds_of(&self, job: &str) -> Vec<&Build> {
        self.builds
            .get(job)
            .map(|history| history.iter().collect())
            .unwrap_or_default()
    }

    fn find_build_triggered_by(&self, job: &str, cause: &BuildRef) -> Option<&Build> {
        self.builds.get(job)?.iter().find(|build| {
            let mut visited = HashSet::new();
            self.traces_back_to(build, cause, &mut visited)
        })
    }

    fn environment(&self, build: &Build) -> Result<Environment, HostError> {
        let Some(key) = environment_key(build) else {
            return Ok(Environment::new());
        };

        if self.unreadable_environments.contains(&key) {
            return Err(HostError::EnvironmentUnavailable {
                build: key,
                reason: "environment could not be read".to_string(),
            });
        }

        Ok(self.environments.get(&key).cloned().unwrap_or_default())
    }
}
