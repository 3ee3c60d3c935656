//! Stage and task status resolution for delivery pipelines.
//!
//! Prototypes are built once per pipeline definition; every render resolves them against the
//! current host state, aggregating fan-out branches, and decorates names through the token
//! evaluator.

mod aggregate;
mod definition;
mod prototype;
mod resolver;
mod stage;
mod task;

pub use definition::{PipelineDefinition, PipelineView, StageGroup, StageView};
pub use prototype::{PipelineTask, TaskPrototype};
pub use resolver::Resolver;
pub use stage::{PipelineRun, Run, Stage, UNKNOWN_DURATION};
pub use task::Task;
