//! Warden session library
//!
//! The durable session domain of Warden: sessions as logical units of agent
//! work tied to projects, their append-only message logs, and the project
//! current-session pointer. Runs above the process layer and has no
//! subprocess dependency; a coordinator maps job outcomes onto session state.

pub mod error;
pub mod messages;
pub mod model;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use error::{SessionError, SessionResult};
pub use messages::MessageLog;
pub use model::{MessageRole, MessageType, Project, Session, SessionMessage, SessionState};
pub use storage::{LocalStorage, SessionStorage, StorageConfig, StorageError, StorageResult};
pub use store::SessionStore;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // End-to-end: mutate through a store with a local backend, then hydrate
    // a fresh store from the same root.
    #[tokio::test]
    async fn test_persistence_survives_restart() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = StorageConfig {
            root: temp.path().to_path_buf(),
        };

        let session_id = {
            let storage: Arc<dyn SessionStorage> =
                Arc::new(LocalStorage::with_config(config.clone()));
            let store = SessionStore::with_storage(storage);

            let project = store.create_project("demo").await;
            let session = store
                .create_session(&project.id, Some("persisted".to_string()))
                .await;
            store
                .update_state(&session.id, SessionState::Running)
                .await
                .unwrap();
            store
                .append_message(&session.id, MessageRole::User, "hello", MessageType::Text)
                .await
                .unwrap();
            assert!(
                store
                    .switch_current_session(&project.id, &session.id)
                    .await
            );
            session.id
        };

        let storage: Arc<dyn SessionStorage> = Arc::new(LocalStorage::with_config(config));
        let store = SessionStore::with_storage(storage);
        store.hydrate().await.unwrap();

        let session = store.get(&session_id).unwrap();
        assert_eq!(session.title, "persisted");
        assert_eq!(session.state, SessionState::Running);
        assert_eq!(session.message_count, 1);

        let projects = store.list_projects();
        assert_eq!(projects.len(), 1);
        assert_eq!(
            projects[0].current_session_id.as_deref(),
            Some(session_id.as_str())
        );
    }
}
