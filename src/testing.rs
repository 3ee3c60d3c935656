//! Fixtures shared by unit tests.

use crate::host::{Cause, Environment, Job};
use crate::token::{MacroError, MacroExpander};

/// Macro expander whose behaviour is fixed up front.
pub enum ScriptedMacro {
    Returns(String),
    ReturnsNothing,
    FailsIo,
    FailsEvaluation,
    Cancelled,
    /// Fails the test if the expander is ever consulted.
    Panics,
}

impl MacroExpander for ScriptedMacro {
    fn expand(&self, template: &str, _environment: &Environment) -> Result<Option<String>, MacroError> {
        match self {
            Self::Returns(value) => Ok(Some(value.clone())),
            Self::ReturnsNothing => Ok(None),
            Self::FailsIo => Err(MacroError::Io("Could not process macro!".to_string())),
            Self::FailsEvaluation => Err(MacroError::Evaluation("Could not evaluate macro!".to_string())),
            Self::Cancelled => Err(MacroError::Cancelled),
            Self::Panics => panic!("expander consulted for '{template}'"),
        }
    }
}

pub fn job_triggered_by(name: &str, upstream: &str) -> Job {
    Job {
        upstream: vec![upstream.to_string()],
        ..Job::new(name)
    }
}

pub fn job_promoted_from(name: &str, upstream: &str) -> Job {
    Job {
        manual_upstream: vec![upstream.to_string()],
        ..Job::new(name)
    }
}

pub fn upstream_cause(job: &str, number: u64) -> Cause {
    Cause::Upstream {
        job: job.to_string(),
        number,
    }
}

pub fn manual_cause(job: &str, number: u64) -> Cause {
    Cause::Manual {
        job: job.to_string(),
        number,
    }
}
