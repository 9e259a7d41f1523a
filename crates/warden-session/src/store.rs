//! Session store: lifecycle state machine, project pointers, cascade rules
//!
//! The in-memory indexes are authoritative at runtime. When a storage
//! backend is attached, mutations are persisted write-behind: a persistence
//! failure is logged and the in-memory result stands. `hydrate` loads the
//! persisted state back at startup.
//!
//! The store is a plain value the embedder constructs and shares behind an
//! `Arc`; tests build isolated instances.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::messages::MessageLog;
use crate::model::{MessageRole, MessageType, Project, Session, SessionMessage, SessionState};
use crate::storage::SessionStorage;

/// Concurrency-safe store of sessions, their messages, and projects.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    projects: DashMap<String, Project>,
    messages: MessageLog,
    storage: Option<Arc<dyn SessionStorage>>,
}

impl SessionStore {
    /// In-memory store with no durability.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            projects: DashMap::new(),
            messages: MessageLog::new(),
            storage: None,
        }
    }

    /// Store that persists mutations through `storage`.
    pub fn with_storage(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            sessions: DashMap::new(),
            projects: DashMap::new(),
            messages: MessageLog::new(),
            storage: Some(storage),
        }
    }

    /// Load persisted sessions, message logs and projects into memory.
    /// No-op without a storage backend.
    pub async fn hydrate(&self) -> SessionResult<()> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };

        let sessions = storage.load_sessions().await?;
        for session in sessions {
            match storage.load_messages(&session.id).await {
                Ok(messages) => self.messages.install(&session.id, messages),
                Err(e) => {
                    warn!(session = %session.id, "failed to load message log: {}", e);
                }
            }
            self.sessions.insert(session.id.clone(), session);
        }
        for project in storage.load_projects().await? {
            self.projects.insert(project.id.clone(), project);
        }
        info!(
            sessions = self.sessions.len(),
            projects = self.projects.len(),
            "hydrated session store"
        );
        Ok(())
    }

    // ---- sessions ----

    /// Create a new Idle session for a project. A missing title gets a
    /// generated default.
    pub async fn create_session(&self, project_id: &str, title: Option<String>) -> Session {
        let session = Session::new(project_id, title);
        self.sessions.insert(session.id.clone(), session.clone());
        debug!(session = %session.id, project = %project_id, "created session");
        self.persist_session(&session).await;
        session
    }

    /// Look up a session. `message_count` is filled from the message log.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions
            .get(id)
            .map(|entry| self.with_count(entry.clone()))
    }

    /// Move a session to a new lifecycle state.
    ///
    /// Completed stamps `completed_at`. Unknown ids fail with `NotFound`;
    /// transitions out of a terminal state fail with `InvalidTransition`
    /// and leave the session untouched.
    pub async fn update_state(&self, id: &str, next: SessionState) -> SessionResult<Session> {
        let updated = {
            let mut entry = self
                .sessions
                .get_mut(id)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            if !entry.can_transition_to(next) {
                return Err(SessionError::InvalidTransition {
                    from: entry.state,
                    to: next,
                });
            }
            entry.state = next;
            entry.touch();
            if next == SessionState::Completed {
                entry.completed_at = Some(Utc::now());
            }
            entry.clone()
        };
        debug!(session = %id, state = %next, "session state changed");
        self.persist_session(&updated).await;
        Ok(self.with_count(updated))
    }

    /// Delete a session and its message log. Clears the owning project's
    /// current-session pointer when it referenced this session. Returns
    /// false (not an error) when the session did not exist.
    pub async fn delete_session(&self, id: &str) -> bool {
        let Some((_, session)) = self.sessions.remove(id) else {
            return false;
        };
        let dropped = self.messages.delete_all(id);

        let cleared_project = {
            match self.projects.get_mut(&session.project_id) {
                Some(mut project)
                    if project.current_session_id.as_deref() == Some(id) =>
                {
                    project.current_session_id = None;
                    true
                }
                _ => false,
            }
        };

        info!(session = %id, messages = dropped, "deleted session");
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.delete_session(id).await {
                warn!(session = %id, "failed to delete persisted session: {}", e);
            }
            if let Err(e) = storage.delete_messages(id).await {
                warn!(session = %id, "failed to delete persisted messages: {}", e);
            }
        }
        if cleared_project {
            self.persist_projects().await;
        }
        true
    }

    /// All sessions of a project, creation order.
    pub fn list_by_project(&self, project_id: &str) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| entry.project_id == project_id)
            .map(|entry| self.with_count(entry.clone()))
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }

    /// Every session currently Running, across all projects.
    pub fn list_running(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| entry.state == SessionState::Running)
            .map(|entry| self.with_count(entry.clone()))
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }

    // ---- messages ----

    /// Append a message to a session's log. Fails with `NotFound` for an
    /// unknown session; touches the session's modified timestamp.
    pub async fn append_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: impl Into<String>,
        message_type: MessageType,
    ) -> SessionResult<SessionMessage> {
        if !self.sessions.contains_key(session_id) {
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        let message = self
            .messages
            .append(session_id, role, content, message_type);
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.touch();
        }
        self.persist_messages(session_id).await;
        Ok(message)
    }

    /// One page of a session's messages plus the total count at the moment
    /// of the call.
    pub fn get_messages(
        &self,
        session_id: &str,
        skip: usize,
        take: usize,
    ) -> (Vec<SessionMessage>, usize) {
        self.messages.page(session_id, skip, take)
    }

    /// Number of messages recorded for a session.
    pub fn count_messages(&self, session_id: &str) -> usize {
        self.messages.count(session_id)
    }

    /// Direct access to the message log.
    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    // ---- projects ----

    /// Create a project.
    pub async fn create_project(&self, name: &str) -> Project {
        let project = Project::new(name);
        self.projects.insert(project.id.clone(), project.clone());
        debug!(project = %project.id, name, "created project");
        self.persist_projects().await;
        project
    }

    /// Look up a project.
    pub fn get_project(&self, id: &str) -> Option<Project> {
        self.projects.get(id).map(|entry| entry.clone())
    }

    /// All projects, creation order.
    pub fn list_projects(&self) -> Vec<Project> {
        let mut projects: Vec<Project> =
            self.projects.iter().map(|entry| entry.clone()).collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        projects
    }

    /// Point a project at the session to resume.
    ///
    /// Succeeds only when the session exists AND belongs to that project;
    /// returns false without mutating anything otherwise.
    pub async fn switch_current_session(&self, project_id: &str, session_id: &str) -> bool {
        let belongs = self
            .sessions
            .get(session_id)
            .map(|session| session.project_id == project_id)
            .unwrap_or(false);
        if !belongs {
            debug!(project = %project_id, session = %session_id, "rejected current-session switch");
            return false;
        }

        let switched = {
            match self.projects.get_mut(project_id) {
                Some(mut project) => {
                    project.current_session_id = Some(session_id.to_string());
                    true
                }
                None => false,
            }
        };
        if switched {
            debug!(project = %project_id, session = %session_id, "switched current session");
            self.persist_projects().await;
        }
        switched
    }

    // ---- persistence plumbing ----

    fn with_count(&self, mut session: Session) -> Session {
        session.message_count = self.messages.count(&session.id);
        session
    }

    async fn persist_session(&self, session: &Session) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.save_session(session).await {
                warn!(session = %session.id, "failed to persist session: {}", e);
            }
        }
    }

    async fn persist_messages(&self, session_id: &str) {
        if let Some(storage) = &self.storage {
            let messages = self.messages.all(session_id);
            if let Err(e) = storage.save_messages(session_id, &messages).await {
                warn!(session = %session_id, "failed to persist messages: {}", e);
            }
        }
    }

    async fn persist_projects(&self) {
        if let Some(storage) = &self.storage {
            let projects = self.list_projects();
            if let Err(e) = storage.save_projects(&projects).await {
                warn!("failed to persist projects: {}", e);
            }
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
