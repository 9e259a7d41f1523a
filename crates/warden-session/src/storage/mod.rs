//! Durable storage for sessions, message logs and projects
//!
//! Trait-based so the embedder can substitute a backend; the shipped
//! implementation writes JSON files under a local root.

mod local;

pub use local::LocalStorage;

use crate::model::{Project, Session, SessionMessage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage path not available")]
    PathUnavailable,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Where the local backend keeps its files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root: PathBuf,
}

impl StorageConfig {
    /// Default root under the user data directory.
    pub fn default_root() -> StorageResult<Self> {
        let root = dirs::data_dir()
            .ok_or(StorageError::PathUnavailable)?
            .join("warden");
        Ok(Self { root })
    }
}

/// Storage backend for the session domain.
///
/// Message logs are saved whole per session; they are small relative to
/// process output and rewriting keeps the backend format trivial.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Save (create or overwrite) a session record
    async fn save_session(&self, session: &Session) -> StorageResult<()>;

    /// Delete a session record; `NotFound` when absent
    async fn delete_session(&self, id: &str) -> StorageResult<()>;

    /// Load every persisted session
    async fn load_sessions(&self) -> StorageResult<Vec<Session>>;

    /// Save (overwrite) a session's message log
    async fn save_messages(
        &self,
        session_id: &str,
        messages: &[SessionMessage],
    ) -> StorageResult<()>;

    /// Load a session's message log; empty when none was saved
    async fn load_messages(&self, session_id: &str) -> StorageResult<Vec<SessionMessage>>;

    /// Delete a session's message log; absent logs are not an error
    async fn delete_messages(&self, session_id: &str) -> StorageResult<()>;

    /// Save (overwrite) the full project index
    async fn save_projects(&self, projects: &[Project]) -> StorageResult<()>;

    /// Load the project index; empty when none was saved
    async fn load_projects(&self) -> StorageResult<Vec<Project>>;
}
