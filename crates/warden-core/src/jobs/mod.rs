//! Job supervision: one job per supervised OS subprocess
//!
//! A job is created in the registry before its process exists, driven through
//! its lifecycle by the runner, and observed by arbitrarily many readers via
//! immutable snapshots.

mod buffer;
mod job;
mod registry;
mod runner;

pub use buffer::LogBuffer;
pub use job::{JobRecord, JobSnapshot, JobStatus};
pub use registry::JobRegistry;
pub use runner::{JobHandle, JobRunner, JobSpec};
