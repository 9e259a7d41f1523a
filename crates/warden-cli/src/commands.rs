//! Command implementations

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::stream::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tracing::info;

use warden_core::config::{RunnerConfig, SupervisorConfig};
use warden_core::jobs::{JobRegistry, JobRunner, JobSpec, JobStatus};
use warden_core::supervisor::Supervisor;
use warden_session::storage::{LocalStorage, SessionStorage, StorageConfig};
use warden_session::store::SessionStore;

/// Run one job to completion, print its buffered output, and map the job
/// status onto the process exit.
pub async fn run(
    kind: String,
    cwd: Option<PathBuf>,
    env: Vec<String>,
    command: Vec<String>,
) -> anyhow::Result<()> {
    let (program, args) = command.split_first().context("empty command")?;

    let mut spec = JobSpec::new(&kind, program).args(args.iter().cloned());
    if let Some(dir) = cwd {
        spec = spec.current_dir(dir);
    }
    for pair in env {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("malformed --env entry '{}', expected KEY=VALUE", pair))?;
        spec = spec.env(key, value);
    }

    let registry = Arc::new(JobRegistry::new());
    let runner = JobRunner::new(registry, RunnerConfig::default());

    let handle = runner.start(spec);
    let status = handle.wait().await;

    let snapshot = handle.snapshot();
    for line in &snapshot.log {
        println!("{}", line);
    }

    match status {
        JobStatus::Succeeded => Ok(()),
        _ => anyhow::bail!(
            "job {} failed (exit code {:?})",
            snapshot.id,
            snapshot.exit_code
        ),
    }
}

/// Bring the host up and keep it running until SIGINT/SIGTERM, then stop it
/// within the configured deadline.
pub async fn serve(
    shutdown_deadline: u64,
    log_capacity: usize,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let storage_config = match data_dir {
        Some(root) => StorageConfig { root },
        None => StorageConfig::default_root().context("resolving session data directory")?,
    };
    let storage: Arc<dyn SessionStorage> = Arc::new(LocalStorage::with_config(storage_config));
    let sessions = Arc::new(SessionStore::with_storage(storage));
    sessions
        .hydrate()
        .await
        .context("loading persisted sessions")?;

    let supervisor = Supervisor::new(SupervisorConfig {
        shutdown_deadline: Duration::from_secs(shutdown_deadline),
        runner: RunnerConfig { log_capacity },
    });
    supervisor.start().await?;
    info!(
        projects = sessions.list_projects().len(),
        "host running; send SIGINT or SIGTERM to stop"
    );

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handler")?;
    signals.next().await;
    info!("interrupt received; stopping host");

    supervisor.stop_default().await;
    Ok(())
}
