//! Error types for the session domain

use thiserror::Error;

use crate::model::SessionState;
use crate::storage::StorageError;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by the session store
#[derive(Debug, Error)]
pub enum SessionError {
    /// The referenced session does not exist
    #[error("session not found: {0}")]
    NotFound(String),

    /// The requested state change leaves a terminal state
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },

    /// A persistence operation failed on an explicit call (hydrate)
    #[error(transparent)]
    Storage(#[from] StorageError),
}
