//! Local filesystem storage
//!
//! Layout under the configured root:
//! - `sessions/<id>.json` — one file per session
//! - `messages/<id>.json` — one file per session's message log
//! - `projects.json` — the project index

use super::{SessionStorage, StorageConfig, StorageError, StorageResult};
use crate::model::{Project, Session, SessionMessage};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// JSON-file storage backend.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create storage under the default user data directory.
    pub fn new() -> StorageResult<Self> {
        Ok(Self::with_config(StorageConfig::default_root()?))
    }

    /// Create storage under an explicit root.
    pub fn with_config(config: StorageConfig) -> Self {
        Self { root: config.root }
    }

    fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    fn messages_dir(&self) -> PathBuf {
        self.root.join("messages")
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.sessions_dir().join(format!("{}.json", id))
    }

    fn messages_path(&self, session_id: &str) -> PathBuf {
        self.messages_dir().join(format!("{}.json", session_id))
    }

    fn projects_path(&self) -> PathBuf {
        self.root.join("projects.json")
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(value)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for LocalStorage {
    async fn save_session(&self, session: &Session) -> StorageResult<()> {
        let path = self.session_path(&session.id);
        self.write_json(&path, session).await?;
        debug!(session = %session.id, "saved session to {:?}", path);
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> StorageResult<()> {
        let path = self.session_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        fs::remove_file(&path).await?;
        debug!(session = %id, "deleted session file");
        Ok(())
    }

    async fn load_sessions(&self) -> StorageResult<Vec<Session>> {
        let dir = self.sessions_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&dir).await?;
        let mut sessions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<Session>(&content) {
                    Ok(session) => sessions.push(session),
                    Err(e) => warn!("skipping unreadable session file {:?}: {}", path, e),
                },
                Err(e) => warn!("skipping unreadable session file {:?}: {}", path, e),
            }
        }

        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(sessions)
    }

    async fn save_messages(
        &self,
        session_id: &str,
        messages: &[SessionMessage],
    ) -> StorageResult<()> {
        self.write_json(&self.messages_path(session_id), &messages)
            .await
    }

    async fn load_messages(&self, session_id: &str) -> StorageResult<Vec<SessionMessage>> {
        let path = self.messages_path(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn delete_messages(&self, session_id: &str) -> StorageResult<()> {
        let path = self.messages_path(session_id);
        if path.exists() {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn save_projects(&self, projects: &[Project]) -> StorageResult<()> {
        self.write_json(&self.projects_path(), &projects).await
    }

    async fn load_projects(&self) -> StorageResult<Vec<Project>> {
        let path = self.projects_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}
