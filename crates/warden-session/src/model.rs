//! Session domain types
//!
//! Defines the records this crate owns:
//! - Session: a logical unit of agent work tied to a project
//! - SessionMessage: one immutable entry in a session's conversation record
//! - Project: owner of the at-most-one "current session" pointer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a session.
///
/// Idle and Running may alternate as work starts and pauses; Completed and
/// Failed are terminal. Further work happens in a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Created, no agent work in flight
    Idle,
    /// Agent work in flight
    Running,
    /// Finished successfully; terminal
    Completed,
    /// Finished unsuccessfully; terminal
    Failed,
}

impl SessionState {
    /// True for Completed and Failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running => write!(f, "running"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// A logical unit of agent work, independent of any single process's life.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,

    /// The owning project; referenced, not owned
    pub project_id: String,

    /// Human-readable title (auto-generated when not supplied)
    pub title: String,

    /// Current lifecycle state
    pub state: SessionState,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,

    /// Set exactly when the session reaches Completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Number of messages in the session. Derived from the message log when
    /// read through the store; not authoritative in serialized form.
    #[serde(default)]
    pub message_count: usize,
}

impl Session {
    /// Create a new Idle session. A missing or blank title gets a default
    /// derived from the id.
    pub fn new(project_id: impl Into<String>, title: Option<String>) -> Self {
        let id = Uuid::new_v4().to_string();
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Session {}", &id[..8]));
        let now = Utc::now();
        Self {
            id,
            project_id: project_id.into(),
            title,
            state: SessionState::Idle,
            created_at: now,
            updated_at: now,
            completed_at: None,
            message_count: 0,
        }
    }

    /// Whether the state machine admits moving to `next`.
    ///
    /// Any move out of a non-terminal state is allowed (including re-entering
    /// Running after Idle and vice versa); nothing leaves a terminal state.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        let _ = next;
        !self.state.is_terminal()
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Agent => write!(f, "agent"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Kind of message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Plain conversation text
    Text,
    /// Tool invocation or tool result
    Tool,
    /// Progress/status notification
    Status,
}

/// One immutable entry in a session's conversation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    /// Unique message identifier (UUID format)
    pub id: String,

    /// Owning session, referenced by id
    pub session_id: String,

    /// Message author role
    pub role: MessageRole,

    /// Payload kind
    pub message_type: MessageType,

    /// Message content
    pub content: String,

    /// Creation timestamp; ordering key, with insertion order as tiebreak
    pub created_at: DateTime<Utc>,
}

impl SessionMessage {
    pub fn new(
        session_id: impl Into<String>,
        role: MessageRole,
        content: impl Into<String>,
        message_type: MessageType,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role,
            message_type,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A project groups sessions and remembers which one to resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier (UUID format)
    pub id: String,

    /// Display name
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// The session to resume, when set. Always a session that belongs to
    /// this project; switching is validated by the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_session_id: Option<String>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            current_session_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new("project-1", None);
        assert_eq!(session.state, SessionState::Idle);
        assert!(!session.title.is_empty());
        assert!(session.title.starts_with("Session "));
        assert!(session.completed_at.is_none());
    }

    #[test]
    fn test_explicit_title_kept() {
        let session = Session::new("project-1", Some("Fix login bug".to_string()));
        assert_eq!(session.title, "Fix login bug");
    }

    #[test]
    fn test_blank_title_replaced() {
        let session = Session::new("project-1", Some("   ".to_string()));
        assert!(session.title.starts_with("Session "));
    }

    #[test]
    fn test_transition_rules() {
        let mut session = Session::new("p", None);
        assert!(session.can_transition_to(SessionState::Running));

        session.state = SessionState::Running;
        assert!(session.can_transition_to(SessionState::Idle));
        assert!(session.can_transition_to(SessionState::Completed));

        session.state = SessionState::Completed;
        assert!(!session.can_transition_to(SessionState::Running));
        assert!(!session.can_transition_to(SessionState::Failed));
    }
}
