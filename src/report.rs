use chrono::{DateTime, Utc};
use serde::Serialize;

use pipelens::host::BuildRef;
use pipelens::links;
use pipelens::pipeline::{PipelineView, Stage};

/// A rendered pipeline together with its comparison against the previous run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub collected_at: DateTime<Utc>,
    pub view: PipelineView,
    pub previous_run: Option<BuildRef>,
    pub previous_total_duration_millis: Option<u64>,
    pub comparisons: Vec<StageComparison>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageComparison {
    pub name: String,
    pub duration_millis: Option<u64>,
    /// Duration in the previous run, or -1 when unknown
    pub previous_duration_millis: i64,
}

impl StatusReport {
    pub fn new(view: PipelineView, previous: Option<PipelineView>) -> Self {
        let comparisons = view
            .run
            .stages
            .iter()
            .map(|stage| StageComparison {
                name: stage.name.clone(),
                duration_millis: stage.duration_millis,
                previous_duration_millis: previous.as_ref().map_or(
                    pipelens::pipeline::UNKNOWN_DURATION,
                    |prev| Stage::get_duration_of_stage_from_run(&prev.run, stage),
                ),
            })
            .collect();

        Self {
            collected_at: Utc::now(),
            previous_run: previous.as_ref().and_then(|prev| prev.run.upstream.clone()),
            previous_total_duration_millis: previous.as_ref().map(|prev| prev.total_duration_millis),
            view,
            comparisons,
        }
    }

    pub fn comparison(&self, name: &str) -> Option<&StageComparison> {
        self.comparisons.iter().find(|comparison| comparison.name == name)
    }

    /// Rewrites every task link as an absolute URL under `base_url`.
    pub fn absolutize_links(&mut self, base_url: &str) -> pipelens::Result<()> {
        for task in self.view.stages.iter_mut().flat_map(|stage| stage.tasks.iter_mut()) {
            task.link = links::absolutize(base_url, &task.link)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipelens::pipeline::{PipelineRun, StageView, Task};
    use pipelens::Status;

    fn task(name: &str, status: Status, duration_millis: Option<u64>) -> Task {
        Task {
            id: name.to_string(),
            name: name.to_string(),
            status,
            start_time: None,
            duration_millis,
            link: format!("job/{name}/"),
            rebuildable: status.is_rebuildable(),
            manual: false,
            build_number: None,
            progress: None,
        }
    }

    fn view(number: u64, tasks: Vec<Task>) -> PipelineView {
        let stages: Vec<Stage> = tasks.iter().map(Stage::from).collect();
        let run = PipelineRun {
            upstream: Some(BuildRef::new("build", number)),
            stages,
        };
        PipelineView {
            pipeline: "Delivery".to_string(),
            total_duration_millis: run.total_duration_millis(),
            stages: vec![StageView {
                name: "All".to_string(),
                status: Status::merge(tasks.iter().map(|t| t.status)).unwrap_or_default(),
                tasks,
            }],
            run,
        }
    }

    #[test]
    fn test_compares_against_previous_run() {
        let current = view(
            2,
            vec![
                task("build", Status::Success, Some(120)),
                task("deploy", Status::Idle, None),
            ],
        );
        let previous = view(1, vec![task("build", Status::Success, Some(100))]);

        let report = StatusReport::new(current, Some(previous));

        assert_eq!(report.previous_run, Some(BuildRef::new("build", 1)));
        assert_eq!(report.previous_total_duration_millis, Some(100));
        assert_eq!(report.comparison("build").unwrap().previous_duration_millis, 100);
        assert_eq!(report.comparison("deploy").unwrap().previous_duration_millis, -1);
    }

    #[test]
    fn test_without_previous_run_everything_is_unknown() {
        let report = StatusReport::new(view(1, vec![task("build", Status::Running, None)]), None);

        assert_eq!(report.previous_run, None);
        assert!(report
            .comparisons
            .iter()
            .all(|c| c.previous_duration_millis == -1));
    }

    #[test]
    fn test_absolutize_links() {
        let mut report = StatusReport::new(view(1, vec![task("build", Status::Idle, None)]), None);

        report.absolutize_links("https://ci.example.com").unwrap();

        assert_eq!(
            report.view.stages[0].tasks[0].link,
            "https://ci.example.com/job/build/"
        );
    }
}
