use super::prototype::TaskPrototype;
use super::resolver::Resolver;
use super::task::Task;
use crate::error::{PipelensError, Result};
use crate::host::BuildRef;

impl Resolver<'_> {
    /// Folds the branches of a fan-out job into one task reported under `base`.
    ///
    /// The merged status is the highest-precedence branch status, and the link, build number
    /// and progress come from the first branch (in declaration order) holding that status. The
    /// duration is the slowest branch's, and only once every branch has completed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelensError::EmptyFanOut`] if `branches` is empty.
    pub fn aggregate(
        &self,
        base: &TaskPrototype,
        branches: &[TaskPrototype],
        upstream: Option<&BuildRef>,
    ) -> Result<Task> {
        let tasks: Vec<Task> = branches
            .iter()
            .map(|branch| self.resolve_latest(branch, upstream))
            .collect();

        // earliest branch among those with the highest merge precedence
        let lead = tasks
            .iter()
            .reduce(|lead, task| {
                if task.status.precedence() > lead.status.precedence() {
                    task
                } else {
                    lead
                }
            })
            .ok_or_else(|| PipelensError::EmptyFanOut(base.id.clone()))?;
        let status = lead.status;

        let duration_millis = if tasks.iter().all(|task| task.status.is_terminal()) {
            tasks.iter().filter_map(|task| task.duration_millis).max()
        } else {
            None
        };

        let base_build = upstream.and_then(|run| self.find_build(base, run));

        Ok(Task {
            id: base.id.clone(),
            name: self.resolve_name(base, base_build),
            status,
            start_time: tasks.iter().filter_map(|task| task.start_time).min(),
            duration_millis,
            link: lead.link.clone(),
            rebuildable: status.is_rebuildable(),
            manual: base.manual,
            build_number: lead.build_number,
            progress: lead.progress,
        })
    }
}
