//! Lifecycle supervisor for the hosting runtime
//!
//! The supervisor owns the job runner/registry pair and whatever the
//! embedding layer hangs off the host (listening endpoints register shutdown
//! hooks). Stopping races an orderly stop against a deadline; whichever wins,
//! forced disposal runs afterwards so shutdown always converges.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SupervisorConfig;
use crate::error::{HostError, HostResult};
use crate::jobs::{JobRegistry, JobRunner};

/// Hook run during orderly shutdown, before the job runner is stopped.
///
/// The embedding layer uses these to close listening endpoints and flush
/// state. Hooks must be tolerant of running more than once across host
/// restarts.
pub type ShutdownHook = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct Host {
    registry: Arc<JobRegistry>,
    runner: Arc<JobRunner>,
    cancel: CancellationToken,
}

/// Starts and stops the hosting runtime.
///
/// `start` and `stop` serialize on one async mutex, so a `stop` racing a
/// `start` observes either the fully running or the fully stopped host,
/// never a half-built one.
pub struct Supervisor {
    config: SupervisorConfig,
    state: Mutex<Option<Host>>,
    hooks: parking_lot::Mutex<Vec<ShutdownHook>>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(None),
            hooks: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Register a hook to run during orderly shutdown. Hooks run in
    /// registration order, before the job runner is stopped.
    pub fn add_shutdown_hook(&self, hook: ShutdownHook) {
        self.hooks.lock().push(hook);
    }

    /// Bring the host up. No-op when already running.
    pub async fn start(&self) -> HostResult<()> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            debug!("start requested but host is already running");
            return Ok(());
        }
        if self.config.runner.log_capacity == 0 {
            return Err(HostError::Config(
                "runner.log_capacity must be non-zero".to_string(),
            ));
        }

        let registry = Arc::new(JobRegistry::new());
        let runner = Arc::new(JobRunner::new(registry.clone(), self.config.runner.clone()));
        *state = Some(Host {
            registry,
            runner,
            cancel: CancellationToken::new(),
        });
        info!("host started");
        Ok(())
    }

    /// True while the host is up.
    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// The running host's job runner, for inbound callers.
    pub async fn runner(&self) -> Option<Arc<JobRunner>> {
        self.state.lock().await.as_ref().map(|h| h.runner.clone())
    }

    /// The running host's job registry, for inbound readers.
    pub async fn registry(&self) -> Option<Arc<JobRegistry>> {
        self.state.lock().await.as_ref().map(|h| h.registry.clone())
    }

    /// Token cancelled when the host begins shutting down. Endpoint loops
    /// owned by the embedding layer select on it.
    pub async fn cancel_token(&self) -> Option<CancellationToken> {
        self.state.lock().await.as_ref().map(|h| h.cancel.clone())
    }

    /// Stop the host using the configured deadline.
    pub async fn stop_default(&self) {
        self.stop(self.config.shutdown_deadline).await;
    }

    /// Stop the host: attempt an orderly stop, and past `deadline` abandon
    /// the wait. Forced disposal runs unconditionally on both paths; errors
    /// there are logged, never propagated. No-op when not running.
    pub async fn stop(&self, deadline: Duration) {
        let mut state = self.state.lock().await;
        let Some(host) = state.take() else {
            debug!("stop requested but host is not running");
            return;
        };

        info!(deadline = ?deadline, "stopping host");
        host.cancel.cancel();

        let runner = host.runner.clone();
        let orderly = async {
            let pending: Vec<BoxFuture<'static, ()>> =
                self.hooks.lock().iter().map(|hook| hook()).collect();
            for hook in pending {
                hook.await;
            }
            runner.shutdown().await;
        };

        tokio::select! {
            _ = orderly => {
                info!("orderly stop complete");
            }
            _ = tokio::time::sleep(deadline) => {
                warn!(deadline = ?deadline, "orderly stop exceeded deadline; proceeding to forced disposal");
            }
        }

        // Safety net on both paths; idempotent and infallible.
        host.runner.dispose();
        info!("host stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunnerConfig;
    use crate::jobs::{JobSpec, JobStatus};
    use std::time::Instant;

    fn supervisor() -> Supervisor {
        Supervisor::new(SupervisorConfig::default())
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let supervisor = supervisor();
        supervisor.start().await.unwrap();
        supervisor.start().await.unwrap();
        assert!(supervisor.is_running().await);
    }

    #[tokio::test]
    async fn test_stop_when_not_running_is_noop() {
        let supervisor = supervisor();
        supervisor.stop(Duration::from_millis(50)).await;
        assert!(!supervisor.is_running().await);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let supervisor = Supervisor::new(SupervisorConfig {
            runner: RunnerConfig { log_capacity: 0 },
            ..SupervisorConfig::default()
        });
        assert!(matches!(
            supervisor.start().await,
            Err(HostError::Config(_))
        ));
        assert!(!supervisor.is_running().await);
    }

    #[tokio::test]
    async fn test_stop_honors_deadline_with_slow_hook() {
        let supervisor = supervisor();
        supervisor.add_shutdown_hook(Box::new(|| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
            })
        }));
        supervisor.start().await.unwrap();

        let started = Instant::now();
        supervisor.stop(Duration::from_millis(200)).await;
        let elapsed = started.elapsed();

        assert!(
            elapsed < Duration::from_secs(2),
            "stop took {:?}, deadline was 200ms",
            elapsed
        );
        assert!(!supervisor.is_running().await);

        // Resources were disposed; a fresh start works
        supervisor.start().await.unwrap();
        assert!(supervisor.is_running().await);
    }

    #[tokio::test]
    async fn test_stop_disposes_running_jobs() {
        let supervisor = supervisor();
        supervisor.start().await.unwrap();

        let runner = supervisor.runner().await.unwrap();
        let handle = runner.start(JobSpec::new("sleeper", "sh").args(["-c", "sleep 30"]));

        for _ in 0..200 {
            if handle.snapshot().pid.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        supervisor.stop(Duration::from_secs(2)).await;
        assert_eq!(handle.status(), JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_restart_yields_usable_runner() {
        let supervisor = supervisor();
        supervisor.start().await.unwrap();
        supervisor.stop(Duration::from_secs(1)).await;
        supervisor.start().await.unwrap();

        let runner = supervisor.runner().await.unwrap();
        let handle = runner.start(JobSpec::new("echo", "echo").arg("back"));
        assert_eq!(handle.wait().await, JobStatus::Succeeded);
        assert_eq!(handle.snapshot().log, vec!["back"]);
    }
}
