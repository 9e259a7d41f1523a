//! Configuration for the job runner and lifecycle supervisor

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of log lines retained per job
pub const DEFAULT_LOG_CAPACITY: usize = 2000;

/// Default deadline for orderly shutdown before forced disposal
pub const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

/// Tunables for the job runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Maximum number of output lines retained per job. Once full, the
    /// oldest lines are dropped first; callers should treat the log as a
    /// recent-history window, not a full transcript.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

/// Tunables for the lifecycle supervisor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Budget for orderly shutdown; past this the supervisor stops waiting
    /// and proceeds to forced disposal.
    #[serde(default = "default_shutdown_deadline")]
    pub shutdown_deadline: Duration,

    /// Runner configuration for the hosted job runner
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            shutdown_deadline: DEFAULT_SHUTDOWN_DEADLINE,
            runner: RunnerConfig::default(),
        }
    }
}

fn default_shutdown_deadline() -> Duration {
    DEFAULT_SHUTDOWN_DEADLINE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SupervisorConfig::default();
        assert_eq!(config.shutdown_deadline, DEFAULT_SHUTDOWN_DEADLINE);
        assert_eq!(config.runner.log_capacity, DEFAULT_LOG_CAPACITY);
    }

    #[test]
    fn test_runner_config_roundtrip() {
        let config = RunnerConfig { log_capacity: 64 };
        let json = serde_json::to_string(&config).unwrap();
        let back: RunnerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.log_capacity, 64);
    }
}
