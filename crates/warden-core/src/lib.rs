//! Warden core library
//!
//! This crate provides the process supervision engine for Warden: launching
//! coding-agent subprocesses as tracked jobs, draining their output without
//! blocking callers, serving consistent point-in-time snapshots to concurrent
//! readers, and driving bounded-time shutdown of the whole hosting runtime.

pub mod config;
pub mod error;
pub mod jobs;
pub mod supervisor;

// Re-export commonly used types
pub use config::{RunnerConfig, SupervisorConfig};
pub use error::{HostError, HostResult};
pub use jobs::{JobHandle, JobRegistry, JobRunner, JobSnapshot, JobSpec, JobStatus};
pub use supervisor::{ShutdownHook, Supervisor};
