use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution state of a pipeline task.
///
/// Variants are declared in their natural order, which is what `Ord` compares by:
/// `Idle < Queued < Running < Success < Unstable < Failed`. Merging sibling statuses uses
/// [`Status::precedence`] instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Never run for the upstream run being rendered.
    #[default]
    Idle,
    /// Waiting in the build queue.
    Queued,
    /// Currently executing.
    Running,
    Success,
    Unstable,
    Failed,
}

impl Status {
    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }

    pub fn is_queued(self) -> bool {
        self == Self::Queued
    }

    pub fn is_running(self) -> bool {
        self == Self::Running
    }

    pub fn is_failed(self) -> bool {
        self == Self::Failed
    }

    pub fn is_unstable(self) -> bool {
        self == Self::Unstable
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Returns true for results of a finished build.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Unstable | Self::Failed)
    }

    /// Returns true for finished builds that did not succeed.
    pub fn is_rebuildable(self) -> bool {
        matches!(self, Self::Unstable | Self::Failed)
    }

    /// Rank used when merging sibling statuses: higher wins.
    ///
    /// `Running > Queued > Failed > Unstable > Success > Idle`.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Success => 1,
            Self::Unstable => 2,
            Self::Failed => 3,
            Self::Queued => 4,
            Self::Running => 5,
        }
    }

    /// Merges the statuses of sibling runs into one aggregate status.
    ///
    /// Returns `None` when `statuses` is empty: there is no meaningful aggregate of zero runs.
    pub fn merge<I>(statuses: I) -> Option<Status>
    where
        I: IntoIterator<Item = Status>,
    {
        statuses.into_iter().max_by_key(|status| status.precedence())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
