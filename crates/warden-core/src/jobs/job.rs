//! Job records and status tracking
//!
//! A `JobRecord` is the single mutable home of everything known about one
//! subprocess invocation. The runner driving the process is its only status
//! writer; everyone else reads through immutable `JobSnapshot` copies.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::buffer::LogBuffer;

/// Lifecycle status of a job.
///
/// Transitions only move forward: Pending -> Running -> Succeeded | Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Registered, process not launched yet
    Pending,
    /// Process launched (or launch in progress)
    Running,
    /// Process exited with code 0
    Succeeded,
    /// Process exited non-zero, died on a signal, or failed to launch
    Failed,
}

impl JobStatus {
    /// True for Succeeded and Failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Succeeded | JobStatus::Failed => 2,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    exit_code: Option<i32>,
    pid: Option<u32>,
}

/// Immutable point-in-time copy of a job, safe to hand to any reader.
///
/// The log is a defensive copy; concurrent appends by the runner cannot
/// change a snapshot after it is taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: String,
    pub kind: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Most recent output lines, oldest first
    pub log: Vec<String>,
}

/// One supervised subprocess invocation.
pub struct JobRecord {
    id: String,
    kind: String,
    created_at: DateTime<Utc>,
    state: RwLock<JobState>,
    log: LogBuffer,
    status_tx: watch::Sender<JobStatus>,
    cancel: CancellationToken,
}

impl JobRecord {
    pub(crate) fn new(id: String, kind: String, log_capacity: usize) -> Self {
        let (status_tx, _) = watch::channel(JobStatus::Pending);
        Self {
            id,
            kind,
            created_at: Utc::now(),
            state: RwLock::new(JobState {
                status: JobStatus::Pending,
                started_at: None,
                finished_at: None,
                exit_code: None,
                pid: None,
            }),
            log: LogBuffer::new(log_capacity),
            status_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Unique job id, assigned at creation.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Caller-supplied display tag. Supervision never branches on it.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Current status.
    pub fn status(&self) -> JobStatus {
        self.state.read().status
    }

    /// OS process id, once the process has been spawned.
    pub fn pid(&self) -> Option<u32> {
        self.state.read().pid
    }

    /// When the job reached a terminal status, if it has.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().finished_at
    }

    /// Request cooperative termination of this job's process.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Append an output line. Whitespace-only lines are dropped to keep the
    /// bounded buffer for lines that carry information.
    pub fn append_line(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.log.append(line);
    }

    /// Transition Pending -> Running and stamp `started_at`.
    pub(crate) fn mark_running(&self) {
        let mut state = self.state.write();
        if state.status.rank() >= JobStatus::Running.rank() {
            warn!(job = %self.id, status = %state.status, "ignoring backward transition to running");
            return;
        }
        state.status = JobStatus::Running;
        state.started_at = Some(Utc::now());
        drop(state);
        // send_replace: the new value must land even while nobody subscribes
        self.status_tx.send_replace(JobStatus::Running);
    }

    pub(crate) fn set_pid(&self, pid: Option<u32>) {
        self.state.write().pid = pid;
    }

    /// Transition to a terminal status.
    ///
    /// `exit_code` must be the real code the process exited with; launch
    /// failures and signal deaths pass `None`.
    pub(crate) fn complete(&self, exit_code: Option<i32>, success: bool) {
        let status = if success {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed
        };
        let mut state = self.state.write();
        if state.status.is_terminal() {
            warn!(job = %self.id, status = %state.status, "ignoring duplicate terminal transition");
            return;
        }
        if state.started_at.is_none() {
            // Keeps the started-iff-not-pending invariant even on paths that
            // never observed a running process.
            state.started_at = Some(Utc::now());
        }
        state.status = status;
        state.finished_at = Some(Utc::now());
        state.exit_code = exit_code;
        drop(state);
        self.status_tx.send_replace(status);
    }

    /// Immutable copy of the job for a reader, log included.
    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.state.read();
        JobSnapshot {
            id: self.id.clone(),
            kind: self.kind.clone(),
            status: state.status,
            created_at: self.created_at,
            started_at: state.started_at,
            finished_at: state.finished_at,
            exit_code: state.exit_code,
            pid: state.pid,
            log: self.log.snapshot(),
        }
    }

    /// Wait until the job reaches a terminal status and return it.
    pub async fn wait(&self) -> JobStatus {
        let mut rx = self.status_tx.subscribe();
        loop {
            let status = *rx.borrow_and_update();
            if status.is_terminal() {
                return status;
            }
            if rx.changed().await.is_err() {
                return *rx.borrow();
            }
        }
    }
}

impl std::fmt::Debug for JobRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("JobRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("status", &state.status)
            .field("pid", &state.pid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> JobRecord {
        JobRecord::new("job-1".to_string(), "test".to_string(), 16)
    }

    #[test]
    fn test_initial_state() {
        let job = record();
        let snapshot = job.snapshot();
        assert_eq!(snapshot.status, JobStatus::Pending);
        assert!(snapshot.started_at.is_none());
        assert!(snapshot.finished_at.is_none());
        assert!(snapshot.exit_code.is_none());
        assert!(snapshot.log.is_empty());
    }

    #[test]
    fn test_forward_transitions() {
        let job = record();
        job.mark_running();
        assert_eq!(job.status(), JobStatus::Running);
        assert!(job.snapshot().started_at.is_some());

        job.complete(Some(0), true);
        assert_eq!(job.status(), JobStatus::Succeeded);
        assert_eq!(job.snapshot().exit_code, Some(0));
    }

    #[test]
    fn test_terminal_status_is_sticky() {
        let job = record();
        job.mark_running();
        job.complete(Some(2), false);
        assert_eq!(job.status(), JobStatus::Failed);

        // Late writers cannot move a finished job
        job.complete(Some(0), true);
        job.mark_running();
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.snapshot().exit_code, Some(2));
    }

    #[test]
    fn test_whitespace_lines_dropped() {
        let job = record();
        job.append_line("real output");
        job.append_line("");
        job.append_line("   \t");
        job.append_line("more output");

        assert_eq!(job.snapshot().log, vec!["real output", "more output"]);
    }

    #[test]
    fn test_snapshot_is_decoupled_from_record() {
        let job = record();
        job.append_line("before");
        let snapshot = job.snapshot();

        job.append_line("after");
        job.mark_running();

        assert_eq!(snapshot.status, JobStatus::Pending);
        assert_eq!(snapshot.log, vec!["before"]);
    }

    #[tokio::test]
    async fn test_wait_returns_terminal_status() {
        let job = std::sync::Arc::new(record());
        let waiter = {
            let job = job.clone();
            tokio::spawn(async move { job.wait().await })
        };

        job.mark_running();
        job.complete(Some(0), true);

        assert_eq!(waiter.await.unwrap(), JobStatus::Succeeded);
    }
}
