//! Process runner: spawns and drives one subprocess per job
//!
//! `start` returns immediately; a spawned driver task owns the child process
//! for its whole life. Stdout and stderr are drained by two independently
//! progressing tasks so a stalled stream cannot block the other, and a job
//! only reaches a terminal status after both drains finished and the process
//! exited. Lines from one stream keep program order; interleaving across the
//! two streams is best-effort.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::job::{JobRecord, JobSnapshot, JobStatus};
use super::registry::JobRegistry;
use crate::config::RunnerConfig;

/// What to launch for a job.
///
/// `envs` is an overlay on the inherited environment. Credentials for the
/// child must travel through it, never through `args` — argv is visible to
/// every process on the machine.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Display tag for callers (e.g. "codex-start"). Supervision never
    /// branches on it.
    pub kind: String,
    /// Executable path or name resolved via PATH
    pub program: String,
    /// Arguments, passed verbatim
    pub args: Vec<String>,
    /// Working directory; inherited when `None`
    pub current_dir: Option<PathBuf>,
    /// Environment overlay applied on top of the inherited environment
    pub envs: HashMap<String, String>,
}

impl JobSpec {
    pub fn new(kind: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            envs: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }
}

/// Caller-side handle to a started job.
#[derive(Clone)]
pub struct JobHandle {
    record: Arc<JobRecord>,
}

impl JobHandle {
    /// Job id for later registry lookups.
    pub fn id(&self) -> &str {
        self.record.id()
    }

    /// Current status.
    pub fn status(&self) -> JobStatus {
        self.record.status()
    }

    /// Immutable snapshot including the buffered log.
    pub fn snapshot(&self) -> JobSnapshot {
        self.record.snapshot()
    }

    /// Request termination of this job's process.
    pub fn cancel(&self) {
        self.record.cancel();
    }

    /// Wait for the job to reach a terminal status.
    pub async fn wait(&self) -> JobStatus {
        self.record.wait().await
    }
}

/// Spawns subprocesses for jobs and supervises them to completion.
pub struct JobRunner {
    registry: Arc<JobRegistry>,
    config: RunnerConfig,
    shutdown_token: CancellationToken,
    drivers: Mutex<Vec<JoinHandle<()>>>,
    aborts: Mutex<Vec<AbortHandle>>,
}

impl JobRunner {
    pub fn new(registry: Arc<JobRegistry>, config: RunnerConfig) -> Self {
        Self {
            registry,
            config,
            shutdown_token: CancellationToken::new(),
            drivers: Mutex::new(Vec::new()),
            aborts: Mutex::new(Vec::new()),
        }
    }

    /// The registry this runner reports into.
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Register a job and launch its process asynchronously.
    ///
    /// Returns as soon as the job exists in the registry; launch outcome is
    /// observable through the returned handle and the registry. A runner
    /// that has been shut down fails jobs instead of spawning processes.
    pub fn start(&self, spec: JobSpec) -> JobHandle {
        let record = self.registry.create(&spec.kind, self.config.log_capacity);

        if self.shutdown_token.is_cancelled() {
            record.append_line("runner is shut down; job was not started");
            record.complete(None, false);
            return JobHandle { record };
        }

        let shutdown = self.shutdown_token.clone();
        let driver_record = record.clone();
        let driver = tokio::spawn(async move {
            Self::drive(driver_record, spec, shutdown).await;
        });

        {
            let mut aborts = self.aborts.lock();
            aborts.retain(|handle| !handle.is_finished());
            aborts.push(driver.abort_handle());
        }
        let mut drivers = self.drivers.lock();
        drivers.retain(|handle| !handle.is_finished());
        drivers.push(driver);

        JobHandle { record }
    }

    /// Orderly shutdown: request every live job to stop and wait for all
    /// driver tasks to finish. Idempotent; callers bound the wait externally
    /// (see the supervisor's deadline race).
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();
        let drivers: Vec<JoinHandle<()>> = self.drivers.lock().drain(..).collect();
        if drivers.is_empty() {
            return;
        }
        debug!(count = drivers.len(), "waiting for job drivers to finish");
        futures::future::join_all(drivers).await;
        debug!("all job drivers finished");
    }

    /// Forced disposal: abort driver tasks, kill any process still alive and
    /// fail the jobs that were not terminal yet. Never blocks, never fails;
    /// safe to call after (or instead of) `shutdown`.
    pub fn dispose(&self) {
        self.shutdown_token.cancel();
        for handle in self.aborts.lock().drain(..) {
            handle.abort();
        }
        for record in self.registry.records() {
            if record.status().is_terminal() {
                continue;
            }
            if let Some(pid) = record.pid() {
                force_kill(pid);
            }
            record.append_line("terminated: forced shutdown");
            record.complete(None, false);
        }
        self.drivers.lock().clear();
    }

    async fn drive(record: Arc<JobRecord>, spec: JobSpec, shutdown: CancellationToken) {
        record.mark_running();

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(&spec.envs);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(job = %record.id(), program = %spec.program, "failed to launch: {}", e);
                record.append_line(&format!("failed to launch {}: {}", spec.program, e));
                record.complete(None, false);
                return;
            }
        };

        record.set_pid(child.id());
        info!(job = %record.id(), kind = %record.kind(), pid = ?child.id(), "job started");

        let stdout_drain = child
            .stdout
            .take()
            .map(|pipe| Self::drain(pipe, record.clone(), "stdout"));
        let stderr_drain = child
            .stderr
            .take()
            .map(|pipe| Self::drain(pipe, record.clone(), "stderr"));

        let cancel = record.cancel_token();
        let exit = tokio::select! {
            _ = cancel.cancelled() => Self::kill_child(&record, &mut child, "job cancelled").await,
            _ = shutdown.cancelled() => Self::kill_child(&record, &mut child, "host shutting down").await,
            result = child.wait() => match result {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!(job = %record.id(), "waiting on process failed: {}", e);
                    record.append_line(&format!("waiting on process failed: {}", e));
                    None
                }
            },
        };

        // Terminal status is only recorded after both streams are fully
        // drained AND the process has exited.
        if let Some(task) = stdout_drain {
            let _ = task.await;
        }
        if let Some(task) = stderr_drain {
            let _ = task.await;
        }

        match exit {
            Some(status) => {
                let code = status.code();
                if code.is_none() {
                    record.append_line("process terminated by signal");
                }
                record.complete(code, status.success());
                debug!(job = %record.id(), code = ?code, "job finished");
            }
            None => record.complete(None, false),
        }
    }

    fn drain<R>(stream: R, record: Arc<JobRecord>, label: &'static str) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => record.append_line(&line),
                    Ok(None) => break,
                    Err(e) => {
                        warn!(job = %record.id(), stream = label, "output read error: {}", e);
                        record.append_line(&format!("[{}] read error: {}", label, e));
                        break;
                    }
                }
            }
        })
    }

    async fn kill_child(
        record: &Arc<JobRecord>,
        child: &mut Child,
        reason: &str,
    ) -> Option<std::process::ExitStatus> {
        record.append_line(&format!("terminated: {}", reason));
        if let Err(e) = child.kill().await {
            warn!(job = %record.id(), "failed to kill process: {}", e);
            if let Some(pid) = child.id() {
                force_kill(pid);
            }
        }
        child.wait().await.ok()
    }
}

#[cfg(unix)]
fn force_kill(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        warn!(pid, "failed to SIGKILL process: {}", e);
    }
}

#[cfg(not(unix))]
fn force_kill(_pid: u32) {}
