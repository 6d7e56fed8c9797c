use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::error;
use uuid::Uuid;

use super::config_service::{self, Config};
use super::gemini::{CompletionGateway, GeminiClient};
use super::prompt;
use super::session_store::SessionStore;
use super::storage::{FileStorage, HistoryStorage};
use crate::error::ChatError;
use crate::models::{image, Attachment, ChatSession, ChatSessionListItem, Message};

/// Reply shown in place of a completion when the request fails.
pub const ERROR_RESPONSE: &str = "Sorry, I encountered an error. Please try again.";

/// The conversation front door: owns session state and selection state,
/// and drives the send lifecycle against the completion gateway.
///
/// Methods take `&self` so a front end can hold one instance behind an
/// `Arc` and keep reading history while a send is in flight. Sends
/// themselves are single-flight: a second `send_message` while one is
/// pending is a no-op.
pub struct ChatManager {
    store: Mutex<SessionStore>,
    gateway: Box<dyn CompletionGateway>,
    selected_model: Mutex<String>,
    selected_role: Mutex<String>,
    loading: AtomicBool,
}

impl ChatManager {
    pub fn new(storage: Box<dyn HistoryStorage>, gateway: Box<dyn CompletionGateway>) -> Self {
        Self {
            store: Mutex::new(SessionStore::new(storage)),
            gateway,
            selected_model: Mutex::new(config_service::DEFAULT_MODEL.to_string()),
            selected_role: Mutex::new(config_service::DEFAULT_ROLE.to_string()),
            loading: AtomicBool::new(false),
        }
    }

    /// Wires file-backed history and the Gemini client from the app's
    /// configuration.
    pub fn from_config() -> Result<Self, ChatError> {
        let config = config_service::load_config().unwrap_or_else(|_| Config::default());
        let storage = FileStorage::new()?;
        let manager = Self::new(Box::new(storage), Box::new(GeminiClient::from_config()));

        if let Some(model) = config.model.filter(|m| !m.is_empty()) {
            manager.set_selected_model(&model);
        }
        if let Some(role) = config.role.filter(|r| !r.is_empty()) {
            manager.set_selected_role(&role);
        }

        Ok(manager)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.store.lock().unwrap().messages().to_vec()
    }

    pub fn history(&self) -> Vec<ChatSession> {
        self.store.lock().unwrap().sessions().to_vec()
    }

    pub fn session_list(&self) -> Vec<ChatSessionListItem> {
        self.store.lock().unwrap().session_list()
    }

    pub fn current_chat_id(&self) -> Option<String> {
        self.store.lock().unwrap().current_chat_id().map(String::from)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn selected_model(&self) -> String {
        self.selected_model.lock().unwrap().clone()
    }

    pub fn set_selected_model(&self, model: &str) {
        *self.selected_model.lock().unwrap() = model.to_string();
    }

    pub fn selected_role(&self) -> String {
        self.selected_role.lock().unwrap().clone()
    }

    pub fn set_selected_role(&self, role: &str) {
        *self.selected_role.lock().unwrap() = role.to_string();
    }

    pub fn new_chat(&self) {
        self.store.lock().unwrap().new_chat();
    }

    pub fn load_chat(&self, id: &str) {
        self.store.lock().unwrap().load_chat(id);
    }

    pub fn delete_chat(&self, id: &str) {
        self.store.lock().unwrap().delete_chat(id);
    }

    pub fn clear_all_chats(&self) {
        self.store.lock().unwrap().clear_all_chats();
    }

    /// Sends one user turn and settles the result into the timeline.
    ///
    /// The user message appears immediately, followed by a transient
    /// thinking placeholder that is replaced by the reply or by a fixed
    /// apology on failure. No error escapes to the caller.
    ///
    /// Empty input with no attachment is a no-op, as is a call while a
    /// previous send is still in flight.
    pub async fn send_message(&self, text: &str, attachment: Option<Attachment>) {
        if text.trim().is_empty() && attachment.is_none() {
            return;
        }
        if self.loading.swap(true, Ordering::SeqCst) {
            return;
        }

        // Encode up front so the stored message is display-ready even if
        // the request fails.
        let image_url = attachment.as_ref().map(image::to_data_url);
        let inline = attachment.as_ref().map(image::to_inline);

        let (prior, session_id) = {
            let mut store = self.store.lock().unwrap();
            let prior = store.messages().to_vec();

            store.messages_mut().push(Message::user(text, image_url));

            // Bind the turn to a session before the network call so it
            // survives a mid-flight failure.
            let session_id = match store.current_chat_id() {
                Some(id) => id.to_string(),
                None => {
                    let id = Uuid::new_v4().to_string();
                    store.activate(&id);
                    id
                }
            };
            let timeline = store.messages().to_vec();
            store.commit(&session_id, timeline);

            store.messages_mut().push(Message::thinking());

            (prior, session_id)
        };

        let role = self.selected_role();
        let model = self.selected_model();
        let contents = prompt::build_contents(&prior, &role, text, inline);

        let result = self.gateway.complete(&contents, &model).await;

        let mut store = self.store.lock().unwrap();
        let still_active = store.current_chat_id() == Some(session_id.as_str());

        match result {
            Ok(reply_text) => {
                let reply = Message::model(&reply_text);
                if still_active {
                    store.messages_mut().retain(|m| !m.is_thinking());
                    store.messages_mut().push(reply);
                    let timeline = store.messages().to_vec();
                    store.commit(&session_id, timeline);
                } else if let Some(session) =
                    store.sessions().iter().find(|s| s.id == session_id)
                {
                    // The user moved on mid-flight; settle into the
                    // originating session without touching the visible
                    // timeline.
                    let mut timeline = session.messages.clone();
                    timeline.push(reply);
                    store.commit(&session_id, timeline);
                }
                // Originating session deleted mid-flight: nothing to
                // settle into.
            }
            Err(e) => {
                error!("Failed to get completion: {}", e);
                if still_active {
                    store.messages_mut().retain(|m| !m.is_thinking());
                    store.messages_mut().push(Message::model(ERROR_RESPONSE));
                }
                // Storage stays at the last successful commit; the
                // apology is display-only.
            }
        }
        drop(store);

        self.loading.store(false, Ordering::SeqCst);
    }
}
