//! Append-only, time-ordered message log
//!
//! Messages are keyed by session id. Appends and paged reads are safe to run
//! concurrently; a page is a consistent slice taken under the per-session
//! lock, and the returned total reflects the log at the moment of the call.
//! Concurrent appends may shift later pages; callers tolerate that.

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::model::{MessageRole, MessageType, SessionMessage};

/// Per-session append-only message store.
#[derive(Default)]
pub struct MessageLog {
    messages: DashMap<String, Mutex<Vec<SessionMessage>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to a session's log and return it.
    ///
    /// The creation timestamp is stamped under the per-session lock, so the
    /// stored order is also timestamp order; ties keep insertion order.
    pub fn append(
        &self,
        session_id: &str,
        role: MessageRole,
        content: impl Into<String>,
        message_type: MessageType,
    ) -> SessionMessage {
        let entry = self
            .messages
            .entry(session_id.to_string())
            .or_insert_with(|| Mutex::new(Vec::new()));
        let mut list = entry.lock();
        let message = SessionMessage::new(session_id, role, content, message_type);
        list.push(message.clone());
        message
    }

    /// One page of a session's messages in creation order, plus the total
    /// count at the moment of the call. Unknown sessions page as empty.
    pub fn page(&self, session_id: &str, skip: usize, take: usize) -> (Vec<SessionMessage>, usize) {
        match self.messages.get(session_id) {
            Some(entry) => {
                let list = entry.lock();
                let total = list.len();
                let page = list.iter().skip(skip).take(take).cloned().collect();
                (page, total)
            }
            None => (Vec::new(), 0),
        }
    }

    /// Number of messages recorded for a session.
    pub fn count(&self, session_id: &str) -> usize {
        self.messages
            .get(session_id)
            .map(|entry| entry.lock().len())
            .unwrap_or(0)
    }

    /// Every message of a session, creation order. Used by persistence.
    pub fn all(&self, session_id: &str) -> Vec<SessionMessage> {
        self.messages
            .get(session_id)
            .map(|entry| entry.lock().clone())
            .unwrap_or_default()
    }

    /// Remove a session's entire log; returns how many messages were dropped.
    pub fn delete_all(&self, session_id: &str) -> usize {
        self.messages
            .remove(session_id)
            .map(|(_, list)| list.into_inner().len())
            .unwrap_or(0)
    }

    /// Install a previously persisted log, replacing anything in memory.
    pub(crate) fn install(&self, session_id: &str, messages: Vec<SessionMessage>) {
        self.messages
            .insert(session_id.to_string(), Mutex::new(messages));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_with(messages: &[&str]) -> MessageLog {
        let log = MessageLog::new();
        for content in messages {
            log.append("s1", MessageRole::User, *content, MessageType::Text);
        }
        log
    }

    #[test]
    fn test_append_returns_message() {
        let log = MessageLog::new();
        let message = log.append("s1", MessageRole::Agent, "hi", MessageType::Text);
        assert_eq!(message.session_id, "s1");
        assert_eq!(message.content, "hi");
        assert_eq!(log.count("s1"), 1);
    }

    #[test]
    fn test_page_returns_ordered_slice_and_total() {
        let log = log_with(&["a", "b", "c"]);

        let (page, total) = log.page("s1", 0, 2);
        assert_eq!(total, 3);
        let contents: Vec<&str> = page.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b"]);
    }

    #[test]
    fn test_page_prefix_consistency() {
        let log = log_with(&["a", "b", "c", "d", "e"]);

        let (tail, _) = log.page("s1", 2, 3);
        let (full, _) = log.page("s1", 0, 5);
        assert_eq!(
            tail.iter().map(|m| &m.content).collect::<Vec<_>>(),
            full[2..].iter().map(|m| &m.content).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let log = log_with(&["a"]);
        let (page, total) = log.page("s1", 5, 10);
        assert!(page.is_empty());
        assert_eq!(total, 1);
    }

    #[test]
    fn test_unknown_session_pages_empty() {
        let log = MessageLog::new();
        let (page, total) = log.page("missing", 0, 10);
        assert!(page.is_empty());
        assert_eq!(total, 0);
        assert_eq!(log.count("missing"), 0);
    }

    #[test]
    fn test_delete_all() {
        let log = log_with(&["a", "b"]);
        assert_eq!(log.delete_all("s1"), 2);
        assert_eq!(log.count("s1"), 0);
        assert_eq!(log.delete_all("s1"), 0);
    }

    #[test]
    fn test_logs_are_isolated_per_session() {
        let log = MessageLog::new();
        log.append("s1", MessageRole::User, "one", MessageType::Text);
        log.append("s2", MessageRole::User, "two", MessageType::Text);

        assert_eq!(log.count("s1"), 1);
        assert_eq!(log.count("s2"), 1);
        log.delete_all("s1");
        assert_eq!(log.count("s2"), 1);
    }

    #[test]
    fn test_timestamps_nondecreasing() {
        let log = log_with(&["a", "b", "c"]);
        let (all, _) = log.page("s1", 0, 3);
        for pair in all.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }
}
