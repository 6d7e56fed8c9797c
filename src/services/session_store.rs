use chrono::Utc;
use tracing::warn;

use super::storage::HistoryStorage;
use crate::models::{ChatSession, ChatSessionListItem, Message, Role};

const TITLE_MAX_CHARS: usize = 30;

/// Derives a session title from its first user message. Computed once
/// at session creation and never recomputed.
pub fn derive_title(content: &str) -> String {
    let title: String = content.chars().take(TITLE_MAX_CHARS).collect();
    if content.chars().count() > TITLE_MAX_CHARS {
        format!("{}...", title)
    } else {
        title
    }
}

/// Owns the session list and the active timeline, and keeps persisted
/// storage consistent with in-memory state.
///
/// Persistence failures are logged and ignored; in-memory state stays
/// authoritative for the rest of the process.
pub struct SessionStore {
    sessions: Vec<ChatSession>,
    messages: Vec<Message>,
    current_chat_id: Option<String>,
    storage: Box<dyn HistoryStorage>,
}

impl SessionStore {
    pub fn new(storage: Box<dyn HistoryStorage>) -> Self {
        let sessions = storage.load();
        Self {
            sessions,
            messages: Vec::new(),
            current_chat_id: None,
            storage,
        }
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn session_list(&self) -> Vec<ChatSessionListItem> {
        self.sessions.iter().map(Into::into).collect()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }

    pub fn current_chat_id(&self) -> Option<&str> {
        self.current_chat_id.as_deref()
    }

    pub(crate) fn activate(&mut self, id: &str) {
        self.current_chat_id = Some(id.to_string());
    }

    /// Clears the active timeline without touching persisted sessions.
    pub fn new_chat(&mut self) {
        self.messages.clear();
        self.current_chat_id = None;
    }

    /// Makes the session with `id` active. Unknown ids leave the store
    /// unchanged.
    pub fn load_chat(&mut self, id: &str) {
        if let Some(session) = self.sessions.iter().find(|s| s.id == id) {
            self.messages = session.messages.clone();
            self.current_chat_id = Some(id.to_string());
        }
    }

    /// Removes one session from memory and storage. Deleting the active
    /// session leaves the store in the fresh-chat state.
    pub fn delete_chat(&mut self, id: &str) {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() != before {
            self.persist();
        }

        if self.current_chat_id.as_deref() == Some(id) {
            self.new_chat();
        }
    }

    /// Removes every session from memory and storage.
    pub fn clear_all_chats(&mut self) {
        self.sessions.clear();
        self.new_chat();
        if let Err(e) = self.storage.clear() {
            warn!("Failed to clear chat history: {}", e);
        }
    }

    /// Upserts a session's message list. A new id gets its title and
    /// creation date here, once, and lands at the front of the list.
    /// Thinking placeholders never reach storage.
    pub fn commit(&mut self, session_id: &str, messages: Vec<Message>) {
        let messages: Vec<Message> = messages
            .into_iter()
            .filter(|message| !message.is_thinking())
            .collect();

        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) {
            session.messages = messages;
        } else {
            let title = messages
                .iter()
                .find(|message| message.role == Role::User)
                .map(|message| derive_title(&message.content))
                .unwrap_or_default();

            self.sessions.insert(
                0,
                ChatSession {
                    id: session_id.to_string(),
                    title,
                    date: Utc::now(),
                    messages,
                },
            );
        }

        self.persist();
    }

    fn persist(&mut self) {
        if let Err(e) = self.storage.save(&self.sessions) {
            warn!("Failed to save chat history: {}", e);
        }
    }
}
