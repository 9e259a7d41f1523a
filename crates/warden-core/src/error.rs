//! Error types for the supervision core
//!
//! Job-level failures (launch errors, stream read errors, non-zero exits) are
//! recorded on the job itself and never surface here; the job record is the
//! error report. This module only covers failures of the hosting runtime.

use thiserror::Error;

/// Result type alias for host lifecycle operations
pub type HostResult<T> = Result<T, HostError>;

/// Errors from starting or operating the hosting runtime
#[derive(Error, Debug)]
pub enum HostError {
    /// The host could not be brought up with the given configuration
    #[error("invalid host configuration: {0}")]
    Config(String),

    /// The host is not running and the operation requires it
    #[error("host is not running")]
    NotRunning,

    /// IO errors during host bring-up
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
