//! Conversation session manager for Gemini-backed chat front ends:
//! persisted multi-session history, prompt reconstruction for a
//! stateless completion API, and the optimistic send lifecycle.

mod error;
pub mod models;
pub mod services;

pub use error::ChatError;
pub use models::{
    Attachment, ChatSession, ChatSessionListItem, InlineImage, Message, Role, THINKING_TEXT,
};
pub use services::chat_manager::{ChatManager, ERROR_RESPONSE};
pub use services::config_service::Config;
pub use services::gemini::{
    normalize_model_id, CompletionGateway, GeminiClient, ModelInfo, MOCK_RESPONSE,
};
pub use services::prompt::{build_contents, Content, Part};
pub use services::session_store::SessionStore;
pub use services::storage::{FileStorage, HistoryStorage, MemoryStorage};
