//! Status aggregation for CI delivery pipelines.
//!
//! Given a chain of jobs linked by trigger relationships and the CI server's build history,
//! resolves the current or most recent status, duration and link of every stage relative to an
//! upstream run.

pub mod error;
pub mod host;
pub mod links;
pub mod pipeline;
pub mod status;
pub mod token;

#[cfg(test)]
mod testing;

pub use error::{PipelensError, Result};
pub use status::Status;
