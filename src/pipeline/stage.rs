use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Task;
use crate::host::BuildRef;
use crate::status::Status;

/// Sentinel returned by [`Stage::get_duration_of_stage_from_run`] when no duration is known.
pub const UNKNOWN_DURATION: i64 = -1;

/// Externally reported shape of a resolved task.
///
/// Equality and hashing are structural over all five fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub status: Status,
    #[serde(
        rename = "startTimeMillis",
        default,
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_millis: Option<u64>,
}

/// One pipeline execution whose stages can be looked up by name.
pub trait Run {
    fn stage_by_name(&self, name: &str) -> Option<&Stage>;
}

impl Stage {
    /// Duration of the stage named like `current_stage` in `previous_run`.
    ///
    /// Returns [`UNKNOWN_DURATION`] if the previous run has no such stage or its duration is unset.
    pub fn get_duration_of_stage_from_run(previous_run: &impl Run, current_stage: &Stage) -> i64 {
        previous_run
            .stage_by_name(&current_stage.name)
            .and_then(|stage| stage.duration_millis)
            .and_then(|millis| i64::try_from(millis).ok())
            .unwrap_or(UNKNOWN_DURATION)
    }

    /// Total duration of `stages`. Stages without a duration contribute nothing.
    pub fn get_duration_of(stages: Option<&[Stage]>) -> u64 {
        stages
            .unwrap_or_default()
            .iter()
            .filter_map(|stage| stage.duration_millis)
            .sum()
    }
}

impl From<&Task> for Stage {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            status: task.status,
            start_time: task.start_time,
            duration_millis: task.duration_millis,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stage{{id='{}', name='{}', status='{}'}}",
            self.id, self.name, self.status
        )
    }
}

/// Stages of one rendered pipeline run, in pipeline order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub upstream: Option<BuildRef>,
    pub stages: Vec<Stage>,
}

impl PipelineRun {
    pub fn total_duration_millis(&self) -> u64 {
        Stage::get_duration_of(Some(self.stages.as_slice()))
    }
}

impl Run for PipelineRun {
    fn stage_by_name(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn stage(name: &str, duration_millis: Option<u64>) -> Stage {
        Stage {
            id: name.to_lowercase(),
            name: name.to_string(),
            status: Status::Success,
            start_time: None,
            duration_millis,
        }
    }

    fn run(stages: Vec<Stage>) -> PipelineRun {
        PipelineRun {
            upstream: None,
            stages,
        }
    }

    mod duration_from_run_tests {
        use super::*;

        #[test]
        fn test_returns_previous_duration() {
            let previous = run(vec![stage("Build", Some(1500)), stage("Test", Some(300))]);

            let duration = Stage::get_duration_of_stage_from_run(&previous, &stage("Test", Some(99)));

            assert_eq!(duration, 300);
        }

        #[test]
        fn test_missing_stage_is_unknown() {
            let previous = run(vec![stage("Build", Some(1500))]);

            let duration = Stage::get_duration_of_stage_from_run(&previous, &stage("Deploy", None));

            assert_eq!(duration, UNKNOWN_DURATION);
        }

        #[test]
        fn test_unset_duration_is_unknown() {
            let previous = run(vec![stage("Build", None)]);

            let duration = Stage::get_duration_of_stage_from_run(&previous, &stage("Build", Some(1)));

            assert_eq!(duration, -1);
        }

        #[test]
        fn test_lookup_is_by_name_not_identity() {
            let mut renamed = stage("Build", Some(700));
            renamed.id = "another-id".to_string();
            let previous = run(vec![renamed]);

            let duration = Stage::get_duration_of_stage_from_run(&previous, &stage("Build", None));

            assert_eq!(duration, 700);
        }
    }

    mod duration_of_tests {
        use super::*;

        #[test]
        fn test_sums_durations() {
            let stages = vec![stage("A", Some(10)), stage("B", Some(20)), stage("C", Some(5))];
            assert_eq!(Stage::get_duration_of(Some(stages.as_slice())), 35);
        }

        #[test]
        fn test_empty_and_absent_are_zero() {
            assert_eq!(Stage::get_duration_of(Some(&[][..])), 0);
            assert_eq!(Stage::get_duration_of(None), 0);
        }

        #[test]
        fn test_absent_durations_contribute_nothing() {
            let stages = vec![stage("A", Some(10)), stage("B", None)];
            assert_eq!(Stage::get_duration_of(Some(stages.as_slice())), 10);
            assert_eq!(run(stages).total_duration_millis(), 10);
        }
    }

    #[test]
    fn test_structural_equality_and_hash() {
        let a = stage("Build", Some(10));
        let b = stage("Build", Some(10));
        let c = stage("Build", Some(11));

        assert_eq!(a, b);
        assert_ne!(a, c);
        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            stage("Build", None).to_string(),
            "Stage{id='build', name='Build', status='SUCCESS'}"
        );
    }

    #[test]
    fn test_serializes_millis_fields() {
        let mut built = stage("Build", Some(10));
        built.start_time = DateTime::from_timestamp_millis(1_700_000_000_000);

        let json = serde_json::to_value(&built).unwrap();

        assert_eq!(json["startTimeMillis"], 1_700_000_000_000_i64);
        assert_eq!(json["durationMillis"], 10);
        assert_eq!(json["status"], "SUCCESS");
    }
}
