use chrono::{DateTime, Utc};
use serde::Serialize;

use super::prototype::TaskPrototype;
use crate::status::Status;

/// Snapshot of one task for one upstream run, recomputed on every render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub status: Status,
    pub start_time: Option<DateTime<Utc>>,
    /// Present only once the build has completed
    pub duration_millis: Option<u64>,
    pub link: String,
    pub rebuildable: bool,
    pub manual: bool,
    pub build_number: Option<u64>,
    /// Estimated completion percentage of a running build
    pub progress: Option<u8>,
}

impl Task {
    /// Task for a job that has not run for the rendered upstream run.
    pub fn idle(prototype: &TaskPrototype, name: String) -> Self {
        Self {
            id: prototype.id.clone(),
            name,
            status: Status::Idle,
            start_time: None,
            duration_millis: None,
            link: prototype.link(),
            rebuildable: false,
            manual: prototype.manual,
            build_number: None,
            progress: None,
        }
    }
}
